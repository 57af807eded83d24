use serde::{Deserialize, Serialize};

use crate::display::Labels;
use crate::entity::ForeignKeyField;
use crate::filter::SearchField;
use crate::source::Collection;

pub const DEFAULT_PAGE_SIZE: usize = 10;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub title: String,
    pub field: String,
}

impl Column {
    pub fn new(title: &str, field: &str) -> Self {
        Self {
            title: title.to_string(),
            field: field.to_string(),
        }
    }
}

/// Everything that distinguishes one list page from another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListScreen {
    pub name: String,
    pub title: String,
    pub collection: Collection,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyField>,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Fields offered in the search-field selector besides "all".
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl ListScreen {
    pub fn check_search_field(&self, field: &SearchField) -> Result<(), String> {
        match field {
            SearchField::All => Ok(()),
            SearchField::Field(name) => {
                if self.search_fields.is_empty() || self.search_fields.iter().any(|f| f == name) {
                    Ok(())
                } else {
                    Err(format!(
                        "'{}' cannot be searched on {}, expected one of: all, {}",
                        name,
                        self.name,
                        self.search_fields.join(", ")
                    ))
                }
            }
        }
    }
}

fn customer() -> ForeignKeyField {
    ForeignKeyField::new("customer_id", "users", &["first_name", "last_name"])
        .with_response_key("user")
}

fn warehouse() -> ForeignKeyField {
    ForeignKeyField::new("warehouse_id", "warehouses", &["name"]).with_response_key("warehouse")
}

fn lot() -> ForeignKeyField {
    ForeignKeyField::new("lot_id", "lots", &["name"]).with_response_key("lot")
}

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn builtin_screens() -> Vec<ListScreen> {
    vec![
        ListScreen {
            name: "warehouses".to_string(),
            title: "Warehouses".to_string(),
            collection: Collection::new("warehouses", "warehouses"),
            foreign_keys: vec![],
            columns: vec![
                Column::new("Name", "name"),
                Column::new("Address", "address"),
                Column::new("Area", "total_area"),
                Column::new("Status", "status"),
            ],
            search_fields: fields(&["name", "address", "status"]),
            labels: Labels::new()
                .with("status", "available", "Available")
                .with("status", "full", "Full")
                .with("status", "maintenance", "Under maintenance"),
            page_size: DEFAULT_PAGE_SIZE,
        },
        ListScreen {
            name: "lots".to_string(),
            title: "Lots".to_string(),
            collection: Collection::new("lots", "lots"),
            foreign_keys: vec![warehouse()],
            columns: vec![
                Column::new("Name", "name"),
                Column::new("Warehouse", "warehouse_id"),
                Column::new("Area", "area"),
                Column::new("Price", "price"),
                Column::new("Status", "status"),
            ],
            search_fields: fields(&["name", "warehouse_id", "price", "status"]),
            labels: Labels::new()
                .with("status", "free", "Free")
                .with("status", "rented", "Rented")
                .with("status", "reserved", "Reserved"),
            page_size: DEFAULT_PAGE_SIZE,
        },
        ListScreen {
            name: "rentals".to_string(),
            title: "Rentals".to_string(),
            collection: Collection::new("rentals", "rentals").server_paginated(),
            foreign_keys: vec![customer(), lot()],
            columns: vec![
                Column::new("Customer", "customer_id"),
                Column::new("Lot", "lot_id"),
                Column::new("Start", "start_date"),
                Column::new("End", "end_date"),
                Column::new("Status", "status"),
            ],
            search_fields: fields(&["customer_id", "lot_id", "start_date", "status"]),
            labels: Labels::new()
                .with("status", "active", "Active")
                .with("status", "ended", "Ended")
                .with("status", "cancelled", "Cancelled"),
            page_size: DEFAULT_PAGE_SIZE,
        },
        ListScreen {
            name: "appointments".to_string(),
            title: "Appointments".to_string(),
            collection: Collection::new("appointments", "appointments"),
            foreign_keys: vec![customer(), warehouse()],
            columns: vec![
                Column::new("Date", "date"),
                Column::new("Customer", "customer_id"),
                Column::new("Warehouse", "warehouse_id"),
                Column::new("Status", "status"),
            ],
            search_fields: fields(&["date", "customer_id", "warehouse_id", "status"]),
            labels: Labels::new()
                .with("status", "pending", "Pending")
                .with("status", "confirmed", "Confirmed")
                .with("status", "cancelled", "Cancelled"),
            page_size: DEFAULT_PAGE_SIZE,
        },
        ListScreen {
            name: "requests".to_string(),
            title: "Requests".to_string(),
            collection: Collection::new("requests", "requests").server_paginated(),
            foreign_keys: vec![customer(), lot()],
            columns: vec![
                Column::new("Customer", "customer_id"),
                Column::new("Lot", "lot_id"),
                Column::new("Message", "message"),
                Column::new("Reply", "admin_reply"),
                Column::new("Status", "status"),
            ],
            search_fields: fields(&["customer_id", "lot_id", "message", "status"]),
            labels: Labels::new()
                .with("status", "pending", "New")
                .with("status", "approved", "Approved")
                .with("status", "rejected", "Rejected"),
            page_size: DEFAULT_PAGE_SIZE,
        },
        ListScreen {
            name: "feedback".to_string(),
            title: "Feedback".to_string(),
            collection: Collection::new("feedback", "feedback"),
            foreign_keys: vec![customer()],
            columns: vec![
                Column::new("Customer", "customer_id"),
                Column::new("Rating", "rating"),
                Column::new("Comment", "comment"),
                Column::new("Created", "created_at"),
            ],
            search_fields: fields(&["customer_id", "rating", "comment"]),
            labels: Labels::new(),
            page_size: DEFAULT_PAGE_SIZE,
        },
        ListScreen {
            name: "contracts".to_string(),
            title: "Contracts".to_string(),
            collection: Collection::new("contracts", "contracts"),
            foreign_keys: vec![
                customer(),
                ForeignKeyField::new("rental_id", "rentals", &["start_date", "end_date"])
                    .with_response_key("rental"),
            ],
            columns: vec![
                Column::new("Number", "number"),
                Column::new("Customer", "customer_id"),
                Column::new("Rental", "rental_id"),
                Column::new("Signed", "signed_at"),
                Column::new("Status", "status"),
            ],
            search_fields: fields(&["number", "customer_id", "status"]),
            labels: Labels::new()
                .with("status", "draft", "Draft")
                .with("status", "signed", "Signed")
                .with("status", "terminated", "Terminated"),
            page_size: DEFAULT_PAGE_SIZE,
        },
    ]
}

/// Built-in screens with `extra` layered on top; same name replaces.
pub fn merge_screens(mut screens: Vec<ListScreen>, extra: Vec<ListScreen>) -> Vec<ListScreen> {
    for screen in extra {
        match screens.iter_mut().find(|s| s.name == screen.name) {
            Some(existing) => *existing = screen,
            None => screens.push(screen),
        }
    }
    screens
}

pub fn find_screen<'a>(screens: &'a [ListScreen], name: &str) -> Option<&'a ListScreen> {
    let name = name.trim();
    screens.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}
