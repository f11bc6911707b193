use tracing::{error, info};

use crate::api::ApiClient;
use crate::credentials::Credentials;
use crate::error::ApiResult;
use crate::models::{RegisterRequest, User};

/// Snapshot of who is logged in, as seen by route guards.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

pub struct AuthSession {
    client: ApiClient,
    state: SessionState,
}

impl AuthSession {
    pub fn new(client: ApiClient) -> Self {
        AuthSession {
            client,
            state: SessionState {
                user: None,
                loading: true,
            },
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Restores the session from a stored token. A token the backend no
    /// longer accepts is dropped and the session ends up logged out.
    pub async fn initialize(&mut self) {
        if self.client.credentials().token().is_some() {
            match self.client.auth().me().await {
                Ok(user) => {
                    self.remember(&user);
                    self.state.user = Some(user);
                }
                Err(err) => {
                    error!("Failed to fetch current user: {}", err);
                    if let Err(err) = self.client.auth().logout() {
                        error!("Failed to clear credentials: {}", err);
                    }
                    self.state.user = None;
                }
            }
        }
        self.state.loading = false;
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ApiResult<&User> {
        let auth = self.client.auth().login(email, password).await?;
        self.state.loading = false;
        Ok(self.state.user.insert(auth.user))
    }

    pub async fn register(&mut self, request: &RegisterRequest) -> ApiResult<&User> {
        let auth = self.client.auth().register(request).await?;
        self.state.loading = false;
        Ok(self.state.user.insert(auth.user))
    }

    pub fn logout(&mut self) -> ApiResult<()> {
        self.client.auth().logout()?;
        if let Some(user) = self.state.user.take() {
            info!("Logged out {}", user.email);
        }
        Ok(())
    }

    fn remember(&self, user: &User) {
        let store = self.client.credentials();
        let result = store.load().and_then(|stored| {
            store.save(&Credentials {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                ..stored
            })
        });
        if let Err(err) = result {
            error!("Failed to cache user names: {}", err);
        }
    }
}
