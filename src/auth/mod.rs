use std::path::PathBuf;

use reqwest::header::HeaderValue;

use crate::api::ApiError;

/// Supplies the bearer token attached to outgoing requests.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Result<Option<String>, ApiError>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.token.clone())
    }
}

// persisted token store; re-read on every request so a fresh login is picked up
#[derive(Clone, Debug)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn store(&self, token: &str) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::Credentials {
                message: format!("failed to create '{}': {e}", parent.display()),
            })?;
        }
        std::fs::write(&self.path, format!("{}\n", token.trim())).map_err(|e| {
            ApiError::Credentials {
                message: format!("failed to write '{}': {e}", self.path.display()),
            }
        })
    }

    pub fn clear(&self) -> Result<(), ApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Credentials {
                message: format!("failed to remove '{}': {e}", self.path.display()),
            }),
        }
    }
}

impl CredentialProvider for TokenFile {
    fn bearer_token(&self) -> Result<Option<String>, ApiError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApiError::Credentials {
                message: format!("failed to read '{}': {e}", self.path.display()),
            }),
        }
    }
}

pub fn authorization_header(
    provider: &dyn CredentialProvider,
) -> Result<Option<HeaderValue>, ApiError> {
    let token = match provider.bearer_token()? {
        Some(token) => token,
        None => return Ok(None),
    };
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map(Some)
        .map_err(|_| ApiError::Credentials {
            message: "token contains characters not allowed in a header".to_string(),
        })
}
