//! Typed access to the `/api/v1` REST backend.
//!
//! Every call maps one method to one HTTP request. The stored bearer token is
//! attached when present, non-2xx responses become [`ApiError`]s, and a 401
//! clears the stored token so the next invocation starts logged out.

mod alerts;
mod auth;
mod locations;
mod messaging;
mod notes;
mod patients;
mod thresholds;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::credentials::CredentialStore;
use crate::error::{ApiError, ApiResult};

pub use alerts::Alerts;
pub use auth::{AuthResponse, AuthService};
pub use locations::Locations;
pub use messaging::Messaging;
pub use notes::Notes;
pub use patients::Patients;
pub use thresholds::Thresholds;

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialStore>,
        timeout: Duration,
    ) -> ApiResult<ApiClient> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService { client: self }
    }

    pub fn patients(&self) -> Patients<'_> {
        Patients { client: self }
    }

    pub fn alerts(&self) -> Alerts<'_> {
        Alerts { client: self }
    }

    pub fn messaging(&self) -> Messaging<'_> {
        Messaging { client: self }
    }

    pub fn notes(&self) -> Notes<'_> {
        Notes { client: self }
    }

    pub fn thresholds(&self) -> Thresholds<'_> {
        Thresholds { client: self }
    }

    pub fn locations(&self) -> Locations<'_> {
        Locations { client: self }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorize(self.http.request(method, self.url(path)))
    }

    /// Like [`request`](Self::request) for paths carrying free text. Each
    /// segment is percent-encoded, so `/`, `?` and `#` stay inside it.
    pub(crate) fn request_segments(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {}", self.base_url, err)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(self.authorize(self.http.request(method, url)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(reqwest::header::ACCEPT, "application/json");
        match self.credentials.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and turns any non-2xx status into an error.
    /// `failure` is the message used when the body carries no detail.
    pub(crate) async fn execute(&self, builder: RequestBuilder, failure: &str) -> ApiResult<Response> {
        let res = builder.send().await.map_err(|err| {
            error!("{}: {}", failure, err);
            ApiError::Transport(err)
        })?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        let message = error_detail(&body).unwrap_or_else(|| failure.to_string());
        debug!("{} {} -> {}", failure, status, body);

        match status {
            StatusCode::UNAUTHORIZED => {
                warn!("Token rejected by the backend, clearing stored credentials");
                if let Err(err) = self.credentials.clear() {
                    error!("Failed to clear credentials: {}", err);
                }
                Err(ApiError::Unauthorized)
            }
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden(message)),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            _ => Err(ApiError::Status { status, message }),
        }
    }

    pub(crate) async fn decode<T: DeserializeOwned>(res: Response) -> ApiResult<T> {
        let text = res.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str, failure: &str) -> ApiResult<T> {
        let res = self.execute(self.request(Method::GET, path), failure).await?;
        Self::decode(res).await
    }

    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        failure: &str,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self
            .execute(self.request(method, path).json(body), failure)
            .await?;
        Self::decode(res).await
    }

    pub(crate) async fn send_empty(&self, method: Method, path: &str, failure: &str) -> ApiResult<()> {
        self.execute(self.request(method, path), failure).await?;
        Ok(())
    }
}

/// FastAPI puts the human readable reason in `detail`; some handlers use `message`.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail").or_else(|| value.get("message"))? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
