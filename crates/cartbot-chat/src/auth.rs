//! Authentication collaborator.
//!
//! Holds the bearer credential, reports the signed-in user, attaches the
//! `Authorization` header to outgoing requests, and persists the login
//! token between runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cartbot_core::config::BackendConfig;
use cartbot_core::error::CartbotError;
use cartbot_core::types::User;

use crate::backend::http::{build_client, join_url, read_json};
use crate::error::{BackendError, ChatError};

/// Source of identity and credentials for backend calls.
pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn current_user(&self) -> Option<User>;

    /// Attach credentials to an outgoing request.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder;
}

/// A bearer token together with the user it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub user: User,
}

/// Bearer-token auth provider.
#[derive(Debug, Clone, Default)]
pub struct TokenAuth {
    credentials: Option<Credentials>,
}

impl TokenAuth {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }

    /// A provider with no credentials; every request goes out unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl AuthProvider for TokenAuth {
    fn is_authenticated(&self) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(|c| !c.access_token.is_empty())
    }

    fn current_user(&self) -> Option<User> {
        self.credentials.as_ref().map(|c| c.user.clone())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials {
            Some(ref c) if !c.access_token.is_empty() => request.bearer_auth(&c.access_token),
            _ => request,
        }
    }
}

// =============================================================================
// Token persistence
// =============================================================================

/// Login token saved as JSON on disk.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/token.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("token.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved credentials, or `None` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Credentials>, ChatError> {
        Ok(self.read()?)
    }

    /// Write credentials, readable only by the owner on unix.
    pub fn save(&self, credentials: &Credentials) -> Result<(), ChatError> {
        Ok(self.write(credentials)?)
    }

    /// Remove the saved token. Missing file is not an error.
    pub fn clear(&self) -> Result<(), ChatError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(CartbotError::from(e).into()),
            _ => Ok(()),
        }
    }

    fn read(&self) -> cartbot_core::Result<Option<Credentials>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let credentials: Credentials = serde_json::from_str(&contents)?;
        tracing::info!("Login token loaded from {}", self.path.display());
        Ok(Some(credentials))
    }

    fn write(&self, credentials: &Credentials) -> cartbot_core::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(credentials)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        tracing::info!("Login token saved to {}", self.path.display());
        Ok(())
    }
}

// =============================================================================
// Account endpoints
// =============================================================================

#[derive(Serialize)]
struct AccountRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    user_id: i64,
    username: String,
}

#[derive(Deserialize)]
struct RegisterResponse {
    message: String,
}

/// Client for the unauthenticated register and login endpoints.
pub struct AccountClient {
    base_url: String,
    http: reqwest::Client,
}

impl AccountClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self {
            base_url: config.base_url.clone(),
            http: build_client(config)?,
        })
    }

    /// Create an account. Returns the server's confirmation message.
    pub async fn register(&self, username: &str, password: &str) -> Result<String, BackendError> {
        let resp = self
            .http
            .post(join_url(&self.base_url, "register"))
            .json(&AccountRequest { username, password })
            .send()
            .await?;
        let body: RegisterResponse = read_json("register", resp).await?;
        Ok(body.message)
    }

    /// Exchange a username and password for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials, BackendError> {
        let resp = self
            .http
            .post(join_url(&self.base_url, "login"))
            .json(&AccountRequest { username, password })
            .send()
            .await?;
        let body: LoginResponse = read_json("login", resp).await?;
        tracing::info!(user_id = body.user_id, username = %body.username, "Signed in");
        Ok(Credentials {
            access_token: body.access_token,
            user: User {
                id: body.user_id,
                username: body.username,
            },
        })
    }
}
