//! Collaborator contracts for authentication and identity resolution, and the
//! transport-level signal channel the session store listens on.

use crate::error::AuthError;
use crate::identity::{AccessToken, Credential, Identity};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Exchanges a username and secret for a bearer token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn submit_credentials(&self, username: &str, secret: &str) -> Result<AccessToken, AuthError>;
}

/// Resolves the identity behind a bearer token.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn fetch_identity(&self, credential: &Credential) -> Result<Identity, AuthError>;
}

/// Signals raised by the transport independently of which operation issued the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// The server answered 401 to a request that carried `credential`.
    Unauthorized { path: String, credential: Credential },
}

pub type TransportSignalSender = broadcast::Sender<TransportSignal>;
pub type TransportSignalReceiver = broadcast::Receiver<TransportSignal>;

/// Creates the transport signal channel. The transport keeps the sender; the session
/// store subscribes via [`crate::SessionStore::spawn_transport_listener`].
pub fn transport_signal_channel(capacity: usize) -> (TransportSignalSender, TransportSignalReceiver) {
    broadcast::channel(capacity)
}
