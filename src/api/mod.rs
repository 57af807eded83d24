pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::auth::{self, CredentialProvider};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("session expired (401 unauthorized)")]
    Auth,

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("{collection}/{id} could not be resolved")]
    NotFoundRelated { collection: String, id: String },

    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("credential store: {message}")]
    Credentials { message: String },
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth)
    }

    /// Worth one more attempt: the request never got an answer.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The REST backend as seen by the list machinery.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

#[derive(Clone, Debug)]
pub struct HttpOptions {
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
    pub follow_redirects: bool,
    pub retry_transient: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            proxy: None,
            follow_redirects: true,
            retry_transient: true,
        }
    }
}

#[derive(Clone)]
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    retry_transient: bool,
}

impl HttpApi {
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        options: &HttpOptions,
    ) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        reqwest::Url::parse(trimmed).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            base_url: trimmed.to_string(),
            client: build_client(options)?,
            credentials,
            retry_transient: options.retry_transient,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        reqwest::Url::parse(&joined).map_err(|e| ApiError::InvalidBaseUrl {
            url: joined.clone(),
            message: e.to_string(),
        })
    }

    async fn execute_once(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = self.endpoint_url(&request.path)?;
        let mut builder = self.client.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(header) = auth::authorization_header(self.credentials.as_ref())? {
            builder = builder.header(reqwest::header::AUTHORIZATION, header);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %url, "sending request");
        let resp = builder.send().await.map_err(|e| ApiError::Network {
            message: e.to_string(),
        })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| ApiError::Network {
            message: e.to_string(),
        })?;
        check_status(status, &body)?;
        decode_body(url.as_str(), &body)
    }
}

#[async_trait]
impl ApiClient for HttpApi {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        match self.execute_once(&request).await {
            Err(e) if self.retry_transient && e.is_transient() => {
                tracing::warn!(path = %request.path, error = %e, "retrying after network error");
                self.execute_once(&request).await
            }
            other => other,
        }
    }
}

fn build_client(options: &HttpOptions) -> Result<reqwest::Client, ApiError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!("leasedesk/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let redirect_policy = if options.follow_redirects {
        reqwest::redirect::Policy::limited(10)
    } else {
        reqwest::redirect::Policy::none()
    };

    let timeout = Duration::from_secs(options.timeout_seconds.try_into().unwrap_or(10));
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .redirect(redirect_policy)
        .timeout(timeout);

    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| ApiError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ApiError::HttpClientBuild { source: e })
}

pub(crate) fn check_status(status: u16, body: &str) -> Result<(), ApiError> {
    if status == 401 {
        return Err(ApiError::Auth);
    }
    if !(200..300).contains(&status) {
        return Err(ApiError::Server {
            status,
            body: body.chars().take(512).collect(),
        });
    }
    Ok(())
}

fn decode_body(url: &str, body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
