use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::{check_status, ApiClient, ApiError, ApiRequest};

#[derive(Clone, Debug)]
enum Reply {
    Json(Value),
    Status(u16, String),
    Network,
}

#[derive(Clone, Debug)]
struct Route {
    reply: Reply,
    delay: Option<Duration>,
}

/// Canned backend keyed by method and path. Unknown routes answer 404.
/// Every request is recorded so callers can count round trips.
#[derive(Debug, Default)]
pub struct MemoryApi {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<ApiRequest>>,
}

fn route_key(method: &Method, path: &str) -> String {
    format!("{} {}", method, path.trim_matches('/'))
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, method: Method, path: &str, value: Value) -> Self {
        self.set(method, path, Reply::Json(value), None);
        self
    }

    pub fn with_status(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.set(method, path, Reply::Status(status, body.to_string()), None);
        self
    }

    pub fn with_network_error(self, method: Method, path: &str) -> Self {
        self.set(method, path, Reply::Network, None);
        self
    }

    pub fn with_delayed_json(self, method: Method, path: &str, value: Value, delay: Duration) -> Self {
        self.set(method, path, Reply::Json(value), Some(delay));
        self
    }

    /// Replaces a route after construction, e.g. to change what a refetch sees.
    pub fn set_json(&self, method: Method, path: &str, value: Value) {
        self.set(method, path, Reply::Json(value), None);
    }

    fn set(&self, method: Method, path: &str, reply: Reply, delay: Option<Duration>) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(route_key(&method, path), Route { reply, delay });
        }
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        let key = route_key(&method, path);
        self.calls()
            .iter()
            .filter(|c| route_key(&c.method, &c.path) == key)
            .count()
    }

    /// Number of requests whose path starts with `prefix`, any method.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        let prefix = prefix.trim_matches('/');
        self.calls()
            .iter()
            .filter(|c| c.path.trim_matches('/').starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl ApiClient for MemoryApi {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let route = self
            .routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(&route_key(&request.method, &request.path)).cloned());
        let route = match route {
            Some(route) => route,
            None => {
                return Err(ApiError::Server {
                    status: 404,
                    body: "not found".to_string(),
                })
            }
        };
        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }
        match route.reply {
            Reply::Json(value) => Ok(value),
            Reply::Status(status, body) => {
                check_status(status, &body)?;
                Ok(Value::Null)
            }
            Reply::Network => Err(ApiError::Network {
                message: "connection refused".to_string(),
            }),
        }
    }
}
