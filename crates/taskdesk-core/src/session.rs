//! Session store: the single owner of the credential and the resolved identity.
//!
//! ```text
//!   anonymous ──login──▶ pending-identity ──resolve ok──▶ ready
//!       ▲                     │      ▲                      │
//!       └──── logout / resolve failure / 401 ◀──────────────┘
//!                             rehydrated credential at startup
//! ```
//!
//! Both fields sit behind one lock and are always cleared together, so
//! `identity.is_some() ⇒ credential.is_some()` holds for every snapshot. Every credential
//! mutation is mirrored to the durable store; login and logout also drive the
//! presentation mode and publish a [`SessionEvent`] for the navigation layer.

use crate::auth::{Authenticator, IdentityResolver, TransportSignal, TransportSignalReceiver};
use crate::error::SessionError;
use crate::events::{LogoutReason, SessionEvent};
use crate::identity::{Credential, Identity, Role};
use crate::presentation::{PresentationController, PresentationMode};
use crate::routes::{default_destination, LOGIN_PATH};
use crate::store::{DurableStore, CREDENTIAL_KEY};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{broadcast, Mutex as TokioMutex};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 32;

/// Observable phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    /// Credential present, identity not resolved yet.
    PendingIdentity,
    Ready,
}

/// Snapshot of `(credential, identity)`. All queries are computed, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<Credential>,
    identity: Option<Identity>,
}

impl Session {
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// True as soon as a credential exists, even while identity is pending.
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_admin)
    }

    pub fn role(&self) -> Option<&Role> {
        self.identity.as_ref().map(|i| &i.role)
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.credential, &self.identity) {
            (None, _) => SessionPhase::Anonymous,
            (Some(_), None) => SessionPhase::PendingIdentity,
            (Some(_), Some(_)) => SessionPhase::Ready,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.credential.is_none() && self.identity.is_none()
    }
}

/// Outcome of one identity resolution pass.
enum Resolution {
    /// Identity set where there was none before.
    Established(Identity),
    /// Existing identity replaced by a fresh fetch.
    Refreshed(Identity),
    /// Another caller resolved it while we waited; nothing fetched.
    Current(Identity),
    /// No credential, or the credential changed while the fetch was in flight.
    Skipped,
}

pub struct SessionStore {
    state: RwLock<Session>,
    /// Serializes identity resolution (single flight).
    resolution: TokioMutex<()>,
    authenticator: Arc<dyn Authenticator>,
    resolver: Arc<dyn IdentityResolver>,
    storage: Arc<dyn DurableStore>,
    presentation: Arc<PresentationController>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Creates the store, rehydrating the credential from `storage`. Identity stays
    /// absent until the first resolution.
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        resolver: Arc<dyn IdentityResolver>,
        storage: Arc<dyn DurableStore>,
        presentation: Arc<PresentationController>,
    ) -> Self {
        let credential = match storage.get(CREDENTIAL_KEY) {
            Ok(stored) => stored.and_then(|token| Credential::new(token)),
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored credential; starting anonymous");
                None
            }
        };
        if credential.is_some() {
            tracing::info!("rehydrated stored credential; identity pending");
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(Session {
                credential,
                identity: None,
            }),
            resolution: TokioMutex::new(()),
            authenticator,
            resolver,
            storage,
            presentation,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn presentation(&self) -> &Arc<PresentationController> {
        &self.presentation
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.read().is_admin()
    }

    pub fn role(&self) -> Option<Role> {
        self.read().role().cloned()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.read().phase()
    }

    /// Submits credentials, stores the issued token, resolves the identity, switches the
    /// presentation mode for the role and publishes [`SessionEvent::LoggedIn`].
    ///
    /// A rejected submission leaves the session untouched. If the token is issued but the
    /// identity cannot be resolved, the corrective logout runs and the login still fails.
    pub async fn login(&self, username: &str, secret: &str) -> Result<Identity, SessionError> {
        if username.trim().is_empty() || secret.is_empty() {
            return Err(SessionError::AuthenticationFailed(
                "username and password are required".to_string(),
            ));
        }

        let token = self
            .authenticator
            .submit_credentials(username, secret)
            .await
            .map_err(|e| {
                tracing::warn!(username, error = %e, "login rejected");
                SessionError::AuthenticationFailed(e.to_string())
            })?;
        let credential = Credential::new(token.access_token).ok_or_else(|| {
            SessionError::AuthenticationFailed("server issued an empty access token".to_string())
        })?;

        self.install_credential(credential);

        let identity = match self.resolve_identity(true).await {
            Ok(Resolution::Established(identity))
            | Ok(Resolution::Refreshed(identity))
            | Ok(Resolution::Current(identity)) => identity,
            Ok(Resolution::Skipped) => {
                return Err(SessionError::AuthenticationFailed(
                    "session ended before the identity was resolved".to_string(),
                ));
            }
            Err(e) => {
                tracing::warn!(username, error = %e, "token issued but identity unavailable");
                self.end_session(LogoutReason::IdentityResolutionFailed).await;
                return Err(SessionError::AuthenticationFailed(e.to_string()));
            }
        };

        self.presentation
            .apply_mode(PresentationMode::for_role(&identity.role))
            .await;
        let destination = default_destination(Some(&identity.role)).to_string();
        tracing::info!(username = %identity.username, role = %identity.role, %destination, "logged in");
        self.publish(SessionEvent::LoggedIn {
            identity: identity.clone(),
            destination,
        });
        Ok(identity)
    }

    /// Re-fetches the identity for the stored credential. No-op without a credential.
    /// Any failure ends the session (no retry). Returns the identity now in effect.
    pub async fn refresh_identity(&self) -> Option<Identity> {
        self.resolve_and_settle(true).await
    }

    /// Resolves the identity only if it is still pending; used by the navigation guard.
    /// Waits for an in-flight resolution started elsewhere instead of fetching twice.
    pub async fn ensure_identity(&self) -> Option<Identity> {
        if self.phase() != SessionPhase::PendingIdentity {
            return self.identity();
        }
        self.resolve_and_settle(false).await
    }

    /// Clears credential and identity, removes the persisted credential and returns the
    /// window to login mode. Calling it on an already-empty session does nothing.
    pub async fn logout(&self) {
        self.end_session(LogoutReason::UserRequested).await;
    }

    /// Reacts to transport signals. A 401 for the credential currently held ends the
    /// session and forces the navigation layer back to the login route; a 401 for a
    /// credential that has since been replaced or cleared is ignored.
    pub async fn handle_transport_signal(&self, signal: TransportSignal) {
        match signal {
            TransportSignal::Unauthorized { path, credential } => {
                if self.read().credential.as_ref() != Some(&credential) {
                    tracing::debug!(%path, "401 for a credential no longer in use; ignoring");
                    return;
                }
                tracing::warn!(%path, "server rejected the session credential");
                self.end_session(LogoutReason::Unauthorized).await;
            }
        }
    }

    /// Consumes transport signals until the channel closes or the handle is aborted.
    /// The transport usually lives as long as the store, so shells keep the handle and
    /// abort it on shutdown.
    pub fn spawn_transport_listener(self: Arc<Self>, mut receiver: TransportSignalReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(signal) => self.handle_transport_signal(signal).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "transport signal listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn resolve_and_settle(&self, force: bool) -> Option<Identity> {
        match self.resolve_identity(force).await {
            Ok(Resolution::Established(identity)) => {
                // rehydrated credential: the window still has the login shape
                self.presentation
                    .apply_mode(PresentationMode::for_role(&identity.role))
                    .await;
                tracing::info!(username = %identity.username, role = %identity.role, "identity restored");
                self.publish(SessionEvent::IdentityRestored {
                    identity: identity.clone(),
                });
                Some(identity)
            }
            Ok(Resolution::Refreshed(identity)) | Ok(Resolution::Current(identity)) => Some(identity),
            Ok(Resolution::Skipped) => self.identity(),
            Err(e) => {
                tracing::warn!(error = %e, "identity resolution failed; ending session");
                self.end_session(LogoutReason::IdentityResolutionFailed).await;
                None
            }
        }
    }

    async fn resolve_identity(&self, force: bool) -> Result<Resolution, SessionError> {
        let _gate = self.resolution.lock().await;

        let (credential, existing) = {
            let state = self.read();
            (state.credential.clone(), state.identity.clone())
        };
        let Some(credential) = credential else {
            return Ok(Resolution::Skipped);
        };
        if let (false, Some(identity)) = (force, existing.clone()) {
            return Ok(Resolution::Current(identity));
        }

        let fetched = self.resolver.fetch_identity(&credential).await;

        let mut state = self.write();
        if state.credential.as_ref() != Some(&credential) {
            tracing::debug!("credential changed during identity resolution; discarding result");
            return Ok(Resolution::Skipped);
        }
        match fetched {
            Ok(identity) => {
                state.identity = Some(identity.clone());
                if existing.is_some() {
                    Ok(Resolution::Refreshed(identity))
                } else {
                    Ok(Resolution::Established(identity))
                }
            }
            Err(e) => Err(SessionError::IdentityResolutionFailed(e)),
        }
    }

    /// Sets the credential and mirrors it to storage under the state lock, so a
    /// concurrent logout cannot interleave between the two.
    fn install_credential(&self, credential: Credential) {
        let mut state = self.write();
        if let Err(e) = self
            .storage
            .set(CREDENTIAL_KEY, credential.expose())
            .and_then(|_| self.storage.save())
        {
            tracing::warn!(error = %e, "failed to persist credential");
        }
        state.credential = Some(credential);
        state.identity = None;
    }

    /// Clears the session and the persisted credential, returns the window to login mode
    /// and publishes [`SessionEvent::LoggedOut`]. Nothing happens on an already-empty
    /// session that is already in login mode.
    pub(crate) async fn end_session(&self, reason: LogoutReason) {
        let had_session = {
            let mut state = self.write();
            let had = !state.is_empty();
            if had {
                if let Err(e) = self
                    .storage
                    .remove(CREDENTIAL_KEY)
                    .and_then(|_| self.storage.save())
                {
                    tracing::warn!(error = %e, "failed to remove persisted credential");
                }
            }
            *state = Session::default();
            had
        };
        if !had_session && self.presentation.current() == PresentationMode::Login {
            tracing::debug!(?reason, "logout on an empty session; nothing to do");
            return;
        }

        self.presentation.apply_mode(PresentationMode::Login).await;

        if reason.is_corrective() {
            tracing::warn!(?reason, "session ended by corrective logout");
        } else {
            tracing::info!("logged out");
        }
        self.publish(SessionEvent::LoggedOut {
            reason,
            destination: LOGIN_PATH.to_string(),
        });
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
