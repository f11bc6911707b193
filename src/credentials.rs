use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::UserRole;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Where the bearer token and cached user names live between invocations.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> ApiResult<Credentials>;
    fn save(&self, credentials: &Credentials) -> ApiResult<()>;
    fn clear(&self) -> ApiResult<()>;

    fn token(&self) -> Option<String> {
        match self.load() {
            Ok(credentials) => credentials.token,
            Err(err) => {
                warn!("Could not read stored credentials: {}", err);
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Credentials>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        MemoryCredentialStore {
            inner: Mutex::new(Credentials {
                token: Some(token.to_string()),
                ..Default::default()
            }),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> ApiResult<Credentials> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ApiError::Credentials("store lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, credentials: &Credentials) -> ApiResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ApiError::Credentials("store lock poisoned".into()))?;
        *guard = credentials.clone();
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        self.save(&Credentials::default())
    }
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentialStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> ApiResult<Credentials> {
        match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).map_err(|err| {
                ApiError::Credentials(format!("{} is not valid: {}", self.path.display(), err))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Credentials::default()),
            Err(err) => Err(ApiError::Credentials(err.to_string())),
        }
    }

    fn save(&self, credentials: &Credentials) -> ApiResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| ApiError::Credentials(err.to_string()))?;
        }
        let text = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, text).map_err(|err| ApiError::Credentials(err.to_string()))?;
        debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ApiError::Credentials(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    pub sub: serde_json::Value,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// `sub` is a number in some tokens and a numeric string in others.
    pub fn user_id(&self) -> Option<i64> {
        match &self.sub {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.exp.map(|exp| exp <= now_unix).unwrap_or(false)
    }
}

/// Reads the payload segment of a JWT. The signature is not verified; the
/// backend does that on every request.
pub fn decode_token_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
