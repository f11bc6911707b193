use reqwest::Method;
use serde::Deserialize;
use tracing::{error, info};

use super::ApiClient;
use crate::credentials::Credentials;
use crate::error::{ApiError, ApiResult};
use crate::models::{RegisterRequest, User};

pub struct AuthService<'a> {
    pub(super) client: &'a ApiClient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// login and register disagree on where the token goes; accept every shape seen.
#[derive(Deserialize)]
#[serde(untagged)]
enum TokenField {
    Plain(String),
    Wrapped { access_token: String },
}

#[derive(Deserialize)]
struct RawAuthResponse {
    #[serde(default)]
    token: Option<TokenField>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

impl RawAuthResponse {
    fn into_auth(self) -> ApiResult<AuthResponse> {
        let token = match (self.token, self.access_token) {
            (Some(TokenField::Plain(t)), _) | (Some(TokenField::Wrapped { access_token: t }), _) => t,
            (None, Some(t)) => t,
            (None, None) => String::new(),
        };
        match self.user {
            Some(user) if !token.is_empty() => Ok(AuthResponse { token, user }),
            _ => Err(ApiError::InvalidAuthResponse(
                "server accepted the request but sent no token or user".into(),
            )),
        }
    }
}

#[derive(Deserialize)]
struct EmailCheck {
    exists: bool,
}

impl<'a> AuthService<'a> {
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let form = [("username", email), ("password", password)];
        let builder = self.client.request(Method::POST, "/auth/login").form(&form);
        let res = self.client.execute(builder, "Failed to login").await.map_err(|err| {
            error!("Login failed for {}: {}", email, err);
            err
        })?;
        let auth = ApiClient::decode::<RawAuthResponse>(res).await?.into_auth()?;
        self.store(&auth)?;
        info!("Logged in as {} ({})", auth.user.email, auth.user.role);
        Ok(auth)
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        let raw: RawAuthResponse = self
            .client
            .send_json(Method::POST, "/auth/register", request, "Failed to register")
            .await?;
        let auth = raw.into_auth()?;
        self.store(&auth)?;
        info!("Registered {} as {}", auth.user.email, auth.user.role);
        Ok(auth)
    }

    pub async fn me(&self) -> ApiResult<User> {
        if self.client.credentials().token().is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        self.client.get_json("/auth/me", "Failed to get user info").await
    }

    pub async fn check_email(&self, email: &str) -> ApiResult<bool> {
        let builder = self
            .client
            .request(Method::GET, "/auth/check-email")
            .query(&[("email", email)]);
        let res = self.client.execute(builder, "Failed to check email").await?;
        let check: EmailCheck = ApiClient::decode(res).await?;
        Ok(check.exists)
    }

    pub fn logout(&self) -> ApiResult<()> {
        self.client.credentials().clear()
    }

    fn store(&self, auth: &AuthResponse) -> ApiResult<()> {
        self.client.credentials().save(&Credentials {
            token: Some(auth.token.clone()),
            first_name: auth.user.first_name.clone(),
            last_name: auth.user.last_name.clone(),
        })
    }
}
