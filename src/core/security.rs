use std::env;
use std::fs;
use std::path::PathBuf;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::core::errors::ApiError;

const API_KEY_HEADER: &str = "x-api-key";
const OWNER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct SessionToken {
    value: String,
}

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Identity of the user a request acts for. Issued and verified by the
/// surrounding auth layer; this service only carries it through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner {
    id: String,
}

impl Owner {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

pub fn init_session_token() -> SessionToken {
    if let Ok(token) = env::var("LECCION_SESSION_TOKEN") {
        if !token.trim().is_empty() {
            return SessionToken { value: token };
        }
    }

    let token = format!("{}{}", Uuid::new_v4(), Uuid::new_v4());
    let token_path = session_token_path();
    if let Some(parent) = token_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(err) = fs::write(&token_path, &token) {
        tracing::warn!("Failed to write session token: {}", err);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(&token_path) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            let _ = fs::set_permissions(&token_path, perms);
        }
    }

    SessionToken { value: token }
}

fn session_token_path() -> PathBuf {
    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".leccion").join(".session_token")
}

pub fn require_api_key(headers: &HeaderMap, expected: &SessionToken) -> Result<(), ApiError> {
    let header_value = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if header_value.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    if header_value != expected.value() {
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}

/// Owner identity forwarded by the auth layer, if any.
pub fn owner_from_headers(headers: &HeaderMap) -> Option<Owner> {
    headers
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(Owner::new)
}

pub fn require_owner(headers: &HeaderMap) -> Result<Owner, ApiError> {
    owner_from_headers(headers).ok_or(ApiError::Unauthorized)
}
