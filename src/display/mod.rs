use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, ForeignKeyField};
use crate::resolver::RelatedEntityCache;

/// Shown in place of a related entity that could not be resolved.
pub const NO_DATA: &str = "no data";

/// Human labels for raw field values, e.g. `status: pending -> "Awaiting review"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels {
    by_field: BTreeMap<String, BTreeMap<String, String>>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, raw: &str, label: &str) -> Self {
        self.by_field
            .entry(field.to_string())
            .or_default()
            .insert(raw.to_string(), label.to_string());
        self
    }

    pub fn label(&self, field: &str, raw: &str) -> Option<&str> {
        self.by_field
            .get(field)
            .and_then(|m| m.get(raw))
            .map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    /// Entries of `other` win.
    pub fn merge(&mut self, other: &Labels) {
        for (field, map) in other.by_field.iter() {
            let target = self.by_field.entry(field.clone()).or_default();
            for (raw, label) in map.iter() {
                target.insert(raw.clone(), label.clone());
            }
        }
    }
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    Some(f) => format!("{f:.2}"),
                    None => n.to_string(),
                }
            }
        }
        Value::String(s) => format_datetime(s).unwrap_or_else(|| s.clone()),
        Value::Array(items) => items.iter().map(format_value).filter(|s| !s.is_empty()).join(", "),
        Value::Object(obj) => ["name", "title", "id"]
            .iter()
            .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
            .map(format_value)
            .unwrap_or_default(),
    }
}

const DISPLAY_DATETIME: &str = "%Y-%m-%d %H:%M";

// RFC 3339 timestamps are shown in UTC; naive ones as given
fn format_datetime(s: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).format(DISPLAY_DATETIME).to_string());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.format(DISPLAY_DATETIME).to_string())
}

/// Everything needed to turn an entity into what a user sees.
#[derive(Clone, Copy, Debug)]
pub struct DisplayContext<'a> {
    pub foreign_keys: &'a [ForeignKeyField],
    pub related: &'a RelatedEntityCache,
    pub labels: &'a Labels,
}

impl<'a> DisplayContext<'a> {
    pub fn foreign_key(&self, field: &str) -> Option<&'a ForeignKeyField> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }

    pub fn related_entity(&self, entity: &Entity, fk: &ForeignKeyField) -> Option<&'a Entity> {
        let id = entity.foreign_id(&fk.field)?;
        self.related.get(&fk.field, &id)
    }

    pub fn related_text(&self, entity: &Entity, fk: &ForeignKeyField) -> Option<String> {
        let related = self.related_entity(entity, fk)?;
        let text = display_fields(fk)
            .filter_map(|f| related.get(f))
            .map(format_value)
            .filter(|s| !s.is_empty())
            .join(" ");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Text for one column of a row. Foreign keys show the related entity.
    pub fn cell_text(&self, entity: &Entity, field: &str) -> String {
        if let Some(fk) = self.foreign_key(field) {
            return self
                .related_text(entity, fk)
                .unwrap_or_else(|| NO_DATA.to_string());
        }
        match entity.get(field) {
            Some(value) => self.own_text(field, value),
            None => String::new(),
        }
    }

    /// The strings a search restricted to `field` is matched against.
    pub fn field_texts(&self, entity: &Entity, field: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(value) = entity.get(field) {
            out.push(format_value(value));
            if let Some(label) = self.value_label(field, value) {
                out.push(label.to_string());
            }
        }
        if let Some(fk) = self.foreign_key(field) {
            if let Some(text) = self.related_text(entity, fk) {
                out.push(text);
            }
        }
        out
    }

    /// The strings a search across all fields is matched against: own scalar
    /// fields plus the display fields of every resolved related entity.
    pub fn all_texts(&self, entity: &Entity) -> Vec<String> {
        let mut out = Vec::new();
        for (field, value) in entity.fields() {
            if value.is_object() || value.is_array() || value.is_null() {
                continue;
            }
            out.push(format_value(value));
            if let Some(label) = self.value_label(field, value) {
                out.push(label.to_string());
            }
        }
        for fk in self.foreign_keys.iter() {
            if let Some(related) = self.related_entity(entity, fk) {
                out.extend(
                    display_fields(fk)
                        .filter_map(|f| related.get(f))
                        .map(format_value),
                );
            }
        }
        out
    }

    fn own_text(&self, field: &str, value: &Value) -> String {
        match self.value_label(field, value) {
            Some(label) => label.to_string(),
            None => format_value(value),
        }
    }

    fn value_label(&self, field: &str, value: &Value) -> Option<&'a str> {
        if self.labels.is_empty() {
            return None;
        }
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        self.labels.label(field, &raw)
    }
}

fn display_fields(fk: &ForeignKeyField) -> impl Iterator<Item = &str> {
    let fallback: &[&str] = if fk.display_fields.is_empty() {
        &["name"]
    } else {
        &[]
    };
    fk.display_fields
        .iter()
        .map(|s| s.as_str())
        .chain(fallback.iter().copied())
}
