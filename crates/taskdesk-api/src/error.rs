use taskdesk_core::AuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("http: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid base url {0}")]
    BaseUrl(String),

    /// 401 from the server. When the request carried a credential the unauthorized
    /// signal has already been published.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("server returned {code}: {detail}")]
    Status { code: u16, detail: String },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized(_) => AuthError::Unauthorized,
            ApiError::Json(e) => AuthError::Malformed(e.to_string()),
            ApiError::Transport(e) if e.is_decode() => AuthError::Malformed(e.to_string()),
            other => AuthError::Transport(other.to_string()),
        }
    }
}
