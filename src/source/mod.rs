use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::entity::{Entity, EntityId};

/// Where a list screen reads its primary entities from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub endpoint: String,
    /// Key the backend puts the array under (`warehouses`, `lots`, ...).
    pub response_key: String,
    /// Whether `page`/`limit` are honoured by the backend. When false the
    /// whole collection arrives at once and paging happens client-side.
    #[serde(default)]
    pub server_paginated: bool,
}

impl Collection {
    pub fn new(endpoint: &str, response_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            response_key: response_key.to_string(),
            server_paginated: false,
        }
    }

    pub fn server_paginated(mut self) -> Self {
        self.server_paginated = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageParams {
    pub page: usize,
    pub limit: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListPage {
    pub items: Vec<Entity>,
    pub total_pages: Option<usize>,
}

pub struct ListDataSource<'a, C: ApiClient + ?Sized> {
    api: &'a C,
    collection: &'a Collection,
}

impl<'a, C: ApiClient + ?Sized> ListDataSource<'a, C> {
    pub fn new(api: &'a C, collection: &'a Collection) -> Self {
        Self { api, collection }
    }

    /// Without `params` the whole collection is requested.
    pub async fn fetch(&self, params: Option<PageParams>) -> Result<ListPage, ApiError> {
        let mut request = ApiRequest::get(self.collection.endpoint.as_str());
        if let Some(params) = params {
            request = request
                .with_query("page", params.page)
                .with_query("limit", params.limit);
        }
        let value = self.api.send(request).await?;
        normalize_list_response(value, &self.collection.response_key).map_err(|message| {
            ApiError::Decode {
                url: self.collection.endpoint.clone(),
                message,
            }
        })
    }

    pub async fn create(&self, body: Value) -> Result<Value, ApiError> {
        let path = format!("{}/create", self.collection.endpoint.trim_end_matches('/'));
        self.api
            .send(ApiRequest::new(Method::POST, path).with_body(body))
            .await
    }

    pub async fn update(&self, id: &str, body: Value) -> Result<Value, ApiError> {
        let path = format!(
            "{}/update/{id}",
            self.collection.endpoint.trim_end_matches('/')
        );
        self.api
            .send(ApiRequest::new(Method::PUT, path).with_body(body))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<Value, ApiError> {
        let path = format!(
            "{}/delete/{id}",
            self.collection.endpoint.trim_end_matches('/')
        );
        self.api.send(ApiRequest::new(Method::DELETE, path)).await
    }
}

/// `GET /{collection}/{id}`, unwrapping whatever envelope the backend uses.
pub async fn fetch_entity<C: ApiClient + ?Sized>(
    api: &C,
    collection: &str,
    id: &EntityId,
    response_key: Option<&str>,
) -> Result<Entity, ApiError> {
    let path = format!("{}/{id}", collection.trim_end_matches('/'));
    let value = api.send(ApiRequest::get(path)).await?;
    normalize_entity_response(value, response_key).ok_or_else(|| ApiError::NotFoundRelated {
        collection: collection.to_string(),
        id: id.clone(),
    })
}

pub fn normalize_list_response(value: Value, key: &str) -> Result<ListPage, String> {
    let mut obj = match value {
        Value::Array(items) => {
            return Ok(ListPage {
                items: collect_entities(items),
                total_pages: None,
            })
        }
        Value::Object(obj) => obj,
        Value::Null => return Ok(ListPage::default()),
        other => return Err(format!("expected a list, got {}", json_kind(&other))),
    };

    let total_pages = obj
        .get("totalPages")
        .or_else(|| obj.get("total_pages"))
        .and_then(Value::as_u64)
        .map(|n| n as usize);

    let array_key = [key, "items", "data"]
        .into_iter()
        .find(|k| obj.get(*k).map(Value::is_array).unwrap_or(false))
        .map(|k| k.to_string())
        .or_else(|| {
            let mut arrays = obj.iter().filter(|(_, v)| v.is_array()).map(|(k, _)| k);
            match (arrays.next(), arrays.next()) {
                (Some(only), None) => Some(only.clone()),
                _ => None,
            }
        });

    match array_key.and_then(|k| obj.remove(&k)) {
        Some(Value::Array(items)) => Ok(ListPage {
            items: collect_entities(items),
            total_pages,
        }),
        _ => Err(format!("no '{key}' array in response")),
    }
}

pub fn normalize_entity_response(value: Value, response_key: Option<&str>) -> Option<Entity> {
    let mut obj = match value {
        Value::Object(obj) => obj,
        _ => return None,
    };
    if obj.contains_key("id") || obj.contains_key("_id") {
        return Entity::from_value(Value::Object(obj));
    }
    if let Some(key) = response_key {
        if let Some(inner) = obj.remove(key) {
            return Entity::from_value(inner);
        }
    }
    let mut objects = obj.into_iter().filter(|(_, v)| v.is_object());
    match (objects.next(), objects.next()) {
        (Some((_, only)), None) => Entity::from_value(only),
        _ => None,
    }
}

fn collect_entities(items: Vec<Value>) -> Vec<Entity> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match Entity::from_value(item) {
            Some(entity) if entity.id().is_some() => out.push(entity),
            Some(_) => tracing::warn!("dropping record without id"),
            None => tracing::warn!("dropping non-object list element"),
        }
    }
    out
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryApi;
    use serde_json::json;

    fn ids(page: &ListPage) -> Vec<String> {
        page.items.iter().filter_map(|e| e.id()).collect()
    }

    #[test]
    fn list_under_collection_key_with_total_pages() {
        let page = normalize_list_response(
            json!({"lots": [{"id": 1}, {"id": 2}], "totalPages": 4}),
            "lots",
        )
        .unwrap();
        assert_eq!(ids(&page), vec!["1", "2"]);
        assert_eq!(page.total_pages, Some(4));
    }

    #[test]
    fn list_shapes_fall_back_in_order() {
        let bare = normalize_list_response(json!([{"id": "a"}]), "lots").unwrap();
        assert_eq!(ids(&bare), vec!["a"]);

        let data = normalize_list_response(json!({"data": [{"id": 3}]}), "lots").unwrap();
        assert_eq!(ids(&data), vec!["3"]);

        let lone = normalize_list_response(
            json!({"result": [{"id": 9}], "total_pages": 1, "ok": true}),
            "lots",
        )
        .unwrap();
        assert_eq!(ids(&lone), vec!["9"]);
        assert_eq!(lone.total_pages, Some(1));

        assert!(normalize_list_response(json!({"a": [], "b": []}), "lots").is_err());
        assert!(normalize_list_response(json!("nope"), "lots").is_err());
    }

    #[test]
    fn records_without_id_are_dropped() {
        let page =
            normalize_list_response(json!({"rentals": [{"id": 1}, {"name": "x"}, 5]}), "rentals")
                .unwrap();
        assert_eq!(ids(&page), vec!["1"]);
    }

    #[test]
    fn entity_envelopes_are_unwrapped() {
        let direct = normalize_entity_response(json!({"id": 1, "name": "A"}), None).unwrap();
        assert_eq!(direct.id().as_deref(), Some("1"));

        let keyed = normalize_entity_response(
            json!({"user": {"id": 2}, "meta": {"v": 1}}),
            Some("user"),
        )
        .unwrap();
        assert_eq!(keyed.id().as_deref(), Some("2"));

        let lone = normalize_entity_response(json!({"warehouse": {"id": 3}}), None).unwrap();
        assert_eq!(lone.id().as_deref(), Some("3"));

        assert!(normalize_entity_response(json!({"a": {}, "b": {}}), None).is_none());
        assert!(normalize_entity_response(Value::Null, None).is_none());
    }

    #[tokio::test]
    async fn fetch_sends_page_and_limit() {
        let api = MemoryApi::new().with_json(
            Method::GET,
            "warehouses",
            json!({"warehouses": [{"id": 1, "name": "Dock A"}]}),
        );
        let collection = Collection::new("warehouses", "warehouses");
        let page = ListDataSource::new(&api, &collection)
            .fetch(Some(PageParams { page: 2, limit: 25 }))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);

        let calls = api.calls();
        assert_eq!(
            calls[0].query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "25".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn mutations_hit_conventional_paths() {
        let api = MemoryApi::new()
            .with_json(Method::POST, "lots/create", json!({"id": 5}))
            .with_json(Method::PUT, "lots/update/5", json!({"id": 5}))
            .with_status(Method::DELETE, "lots/delete/5", 204, "");
        let collection = Collection::new("lots", "lots");
        let source = ListDataSource::new(&api, &collection);

        source.create(json!({"name": "L1"})).await.unwrap();
        source.update("5", json!({"name": "L2"})).await.unwrap();
        source.delete("5").await.unwrap();

        assert_eq!(api.count(Method::POST, "lots/create"), 1);
        assert_eq!(api.count(Method::PUT, "lots/update/5"), 1);
        assert_eq!(api.count(Method::DELETE, "lots/delete/5"), 1);
    }
}
