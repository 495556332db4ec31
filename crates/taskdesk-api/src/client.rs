//! HTTP client for the task server.
//!
//! Every request picks up the stored credential (key `token`) and sends it as a bearer
//! header. A 401 on such a request is broadcast as [`TransportSignal::Unauthorized`],
//! tagged with the rejected credential, so the session store can end the session no
//! matter which caller issued the request.

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use taskdesk_core::{
    AccessToken, AuthError, Authenticator, Credential, DurableStore, Identity, IdentityResolver, Role,
    ShellConfig, TransportSignal, TransportSignalReceiver, TransportSignalSender, CREDENTIAL_KEY,
};

const TOKEN_PATH: &str = "/token";
const ME_PATH: &str = "/users/me";
const SIGNAL_CAPACITY: usize = 16;

/// Request payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Wire shape of `GET /users/me`.
#[derive(Debug, Deserialize)]
struct UserPayload {
    #[serde(default)]
    id: Option<i64>,
    username: String,
    #[serde(default)]
    display_name: Option<String>,
    role: String,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl From<UserPayload> for Identity {
    fn from(user: UserPayload) -> Self {
        let mut identity = Identity::new(
            user.username,
            Role::parse(&user.role),
            user.display_name.unwrap_or_default(),
        );
        identity.id = user.id;
        identity.is_active = user.is_active;
        identity
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn DurableStore>,
    signals: TransportSignalSender,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, storage: Arc<dyn DurableStore>) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::BaseUrl(base_url));
        }
        let http = reqwest::Client::builder()
            .user_agent("TaskDesk-Shell")
            .timeout(timeout)
            .build()?;
        let (signals, _) = tokio::sync::broadcast::channel(SIGNAL_CAPACITY);
        Ok(Self {
            http,
            base_url,
            storage,
            signals,
        })
    }

    pub fn from_config(config: &ShellConfig, storage: Arc<dyn DurableStore>) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout(), storage)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Receiver for unauthorized signals; hand it to
    /// `SessionStore::spawn_transport_listener`.
    pub fn subscribe(&self) -> TransportSignalReceiver {
        self.signals.subscribe()
    }

    /// Sends a request with the stored credential attached (if any). Non-2xx answers
    /// become errors; a 401 that carried a credential also raises the unauthorized signal.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<ApiResponse, ApiError> {
        let credential = self.stored_credential();
        self.send(method, path, body, credential.as_ref()).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        credential: Option<&Credential>,
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self.http.request(method.clone(), &url);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential.expose());
        }
        request = match body {
            Some(RequestBody::Json(value)) => request.json(&value),
            Some(RequestBody::Form(fields)) => request.form(&fields),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "request failed");
            e
        })?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(%method, path, status = status.as_u16(), "response");

        if status == StatusCode::UNAUTHORIZED {
            if let Some(credential) = credential {
                tracing::warn!(path, "credential rejected by server");
                // nobody listening is fine (e.g. before the shell wires the store)
                let _ = self.signals.send(TransportSignal::Unauthorized {
                    path: path.to_string(),
                    credential: credential.clone(),
                });
            }
            return Err(ApiError::Unauthorized(error_detail(&text)));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
                detail: error_detail(&text),
            });
        }
        Ok(ApiResponse { status, body: text })
    }

    fn stored_credential(&self) -> Option<Credential> {
        match self.storage.get(CREDENTIAL_KEY) {
            Ok(token) => token.and_then(|t| Credential::new(t)),
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored credential");
                None
            }
        }
    }
}

/// FastAPI-style `{"detail": "..."}` bodies yield the detail; anything else is passed through.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl Authenticator for ApiClient {
    async fn submit_credentials(&self, username: &str, secret: &str) -> Result<AccessToken, AuthError> {
        let form = vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), secret.to_string()),
        ];
        // the login request never carries the old credential
        match self
            .send(Method::POST, TOKEN_PATH, Some(RequestBody::Form(form)), None)
            .await
        {
            Ok(response) => Ok(response.json::<AccessToken>()?),
            Err(ApiError::Unauthorized(detail)) => Err(AuthError::Rejected(detail)),
            Err(ApiError::Status { code, detail }) if code == 400 || code == 422 => {
                Err(AuthError::Rejected(detail))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl IdentityResolver for ApiClient {
    async fn fetch_identity(&self, credential: &Credential) -> Result<Identity, AuthError> {
        let response = self.send(Method::GET, ME_PATH, None, Some(credential)).await?;
        let user: UserPayload = response.json()?;
        Ok(user.into())
    }
}
