//! Error types for the session core.

use thiserror::Error;

/// Failure reported by the authentication or identity-resolution collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("credentials rejected: {0}")]
    Rejected(String),

    #[error("credential expired or invalid")]
    Unauthorized,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors surfaced by [`crate::SessionStore`].
///
/// Only `AuthenticationFailed` ever reaches a caller; identity-resolution failures are
/// absorbed by the corrective logout and only appear in logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("identity resolution failed: {0}")]
    IdentityResolutionFailed(#[source] AuthError),
}

/// Durable key-value store failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),

    #[error("stored value for {key} is not valid UTF-8")]
    Encoding { key: String },
}

/// Windowing capability failure. Logged by the presentation controller, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("windowing capability unavailable")]
    Unavailable,

    #[error("window command failed: {0}")]
    Command(String),
}

/// Invalid route table.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("route path must not be empty")]
    EmptyPath,

    #[error("duplicate route path: {0}")]
    DuplicatePath(String),

    #[error("route {from} redirects to undeclared path {to}")]
    UnknownRedirect { from: String, to: String },

    #[error("route file parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("route file read: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("redirect loop while navigating to {0}")]
    RedirectLoop(String),
}
