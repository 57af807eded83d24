use serde::{Deserialize, Serialize};

use crate::display::DisplayContext;
use crate::entity::Entity;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchField {
    #[default]
    All,
    Field(String),
}

impl SearchField {
    /// `all` (or empty) searches every field, anything else names one.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            SearchField::All
        } else {
            SearchField::Field(value.to_string())
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub field: SearchField,
    pub term: String,
}

impl SearchSpec {
    pub fn new(field: SearchField, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.term.trim().is_empty()
    }
}

pub fn matches(entity: &Entity, spec: &SearchSpec, ctx: &DisplayContext<'_>) -> bool {
    let needle = spec.term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let texts = match &spec.field {
        SearchField::All => ctx.all_texts(entity),
        SearchField::Field(name) => ctx.field_texts(entity, name),
    };
    texts.iter().any(|t| t.to_lowercase().contains(&needle))
}

/// Entities that pass `spec`, in their original order. Inputs are untouched.
pub fn filter(entities: &[Entity], spec: &SearchSpec, ctx: &DisplayContext<'_>) -> Vec<Entity> {
    if spec.is_empty() {
        return entities.to_vec();
    }
    entities
        .iter()
        .filter(|e| matches(e, spec, ctx))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Labels;
    use crate::entity::ForeignKeyField;
    use crate::resolver::RelatedEntityCache;
    use serde_json::{json, Value};

    fn rows() -> Vec<Entity> {
        vec![
            json!({"id": 1, "name": "North Depot", "area": 1200, "status": "active", "customer_id": 5}),
            json!({"id": 2, "name": "South Yard", "area": 80.5, "status": "closed", "customer_id": 6}),
            json!({"id": 3, "name": "Harbour", "area": null, "status": "active", "customer_id": 9}),
        ]
        .into_iter()
        .filter_map(Entity::from_value)
        .collect()
    }

    fn fixture() -> (Vec<ForeignKeyField>, RelatedEntityCache, Labels) {
        let mut related = RelatedEntityCache::default();
        for (id, name) in [("5", "Acme Storage"), ("6", "Blue Freight")] {
            related.insert(
                "customer_id",
                id.to_string(),
                Entity::from_value(json!({"id": id, "name": name})).unwrap(),
            );
        }
        let fks = vec![ForeignKeyField::new("customer_id", "users", &["name"])];
        let labels = Labels::new()
            .with("status", "active", "Leased")
            .with("status", "closed", "Vacant");
        (fks, related, labels)
    }

    fn ids(rows: &[Entity]) -> Vec<String> {
        rows.iter().filter_map(|e| e.id()).collect()
    }

    #[test]
    fn empty_term_is_identity() {
        let (fks, related, labels) = fixture();
        let ctx = DisplayContext {
            foreign_keys: &fks,
            related: &related,
            labels: &labels,
        };
        let all = rows();
        let spec = SearchSpec::new(SearchField::Field("name".into()), "   ");
        assert_eq!(filter(&all, &spec, &ctx), all);
    }

    #[test]
    fn all_fields_match_case_insensitively_including_related() {
        let (fks, related, labels) = fixture();
        let ctx = DisplayContext {
            foreign_keys: &fks,
            related: &related,
            labels: &labels,
        };
        let all = rows();
        assert_eq!(
            ids(&filter(&all, &SearchSpec::new(SearchField::All, "DEPOT"), &ctx)),
            vec!["1"]
        );
        assert_eq!(
            ids(&filter(&all, &SearchSpec::new(SearchField::All, "freight"), &ctx)),
            vec!["2"]
        );
        assert_eq!(
            ids(&filter(&all, &SearchSpec::new(SearchField::All, "80.50"), &ctx)),
            vec!["2"]
        );
    }

    #[test]
    fn specific_field_checks_value_and_label_only() {
        let (fks, related, labels) = fixture();
        let ctx = DisplayContext {
            foreign_keys: &fks,
            related: &related,
            labels: &labels,
        };
        let all = rows();
        let by_status = SearchSpec::new(SearchField::Field("status".into()), "leased");
        assert_eq!(ids(&filter(&all, &by_status, &ctx)), vec!["1", "3"]);

        let by_name = SearchSpec::new(SearchField::Field("name".into()), "leased");
        assert!(filter(&all, &by_name, &ctx).is_empty());

        let by_customer = SearchSpec::new(SearchField::Field("customer_id".into()), "acme");
        assert_eq!(ids(&filter(&all, &by_customer, &ctx)), vec!["1"]);
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let (fks, related, labels) = fixture();
        let ctx = DisplayContext {
            foreign_keys: &fks,
            related: &related,
            labels: &labels,
        };
        let all = rows();
        for term in ["a", "active", "yard", "zzz", ""] {
            let spec = SearchSpec::new(SearchField::All, term);
            let once = filter(&all, &spec, &ctx);
            let twice = filter(&once, &spec, &ctx);
            assert_eq!(once, twice, "term {term:?}");
        }
        let untouched: Vec<Value> = rows().into_iter().map(Entity::into_value).collect();
        let after: Vec<Value> = all.into_iter().map(Entity::into_value).collect();
        assert_eq!(untouched, after);
    }

    #[test]
    fn search_field_parse() {
        assert_eq!(SearchField::parse(""), SearchField::All);
        assert_eq!(SearchField::parse("ALL"), SearchField::All);
        assert_eq!(
            SearchField::parse(" status "),
            SearchField::Field("status".to_string())
        );
    }
}
