//! Session events published by the store and followed by the navigation layer.

use crate::identity::Identity;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    /// Corrective: the identity fetch failed for the stored credential.
    IdentityResolutionFailed,
    /// Corrective: the server rejected the credential on some request.
    Unauthorized,
    /// Corrective: the resolved role may not enter its own default destination, so no
    /// route can host the session.
    NoReachableRoute,
}

impl LogoutReason {
    pub fn is_corrective(self) -> bool {
        !matches!(self, Self::UserRequested)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login completed; the navigation layer should move to `destination`.
    LoggedIn { identity: Identity, destination: String },
    /// A rehydrated credential was resolved to an identity.
    IdentityRestored { identity: Identity },
    /// Session cleared; the navigation layer must return to `destination` (the login route).
    LoggedOut { reason: LogoutReason, destination: String },
}

impl SessionEvent {
    /// Where the navigation layer has to go in response, if anywhere.
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::LoggedIn { destination, .. } | Self::LoggedOut { destination, .. } => Some(destination),
            Self::IdentityRestored { .. } => None,
        }
    }
}
