//! Navigation guard: allow or redirect every route transition.
//!
//! Rules, first match wins:
//! 1. credential present but identity unknown → resolve identity first (blocking);
//! 2. target requires auth, no session → `/login`;
//! 3. target is `/login`, session present → role default;
//! 4. target declares a role, known role differs → role default;
//! 5. allow.
//!
//! A redirect to the role default is only issued if the role may enter that route.
//! Otherwise (e.g. a role the route table does not know) the session is ended and
//! the decision becomes a redirect to `/login`.

use crate::events::LogoutReason;
use crate::identity::Role;
use crate::routes::{default_destination, Route, RouteTable, LOGIN_PATH};
use crate::session::{Session, SessionPhase, SessionStore};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    LoginRequired,
    AlreadyAuthenticated,
    RoleMismatch,
    /// The session was ended because its role has no route to land on.
    NoReachableRoute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect { to: String, reason: RedirectReason },
}

impl GuardDecision {
    fn redirect(to: &str, reason: RedirectReason) -> Self {
        Self::Redirect {
            to: to.to_string(),
            reason,
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Redirect { to, .. } => Some(to),
        }
    }
}

pub struct NavigationGuard {
    session: Arc<SessionStore>,
    routes: Arc<RouteTable>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionStore>, routes: Arc<RouteTable>) -> Self {
        Self { session, routes }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Evaluates a transition. Suspends on identity resolution when the session holds a
    /// credential whose identity is not known yet; a failed resolution has already logged
    /// the session out by the time the rules run.
    pub async fn evaluate(&self, from: &str, to: &str) -> GuardDecision {
        if self.session.phase() == SessionPhase::PendingIdentity {
            tracing::debug!(to, "identity pending; resolving before guard decision");
            self.session.ensure_identity().await;
        }
        let target = self.routes.resolve(to);
        let snapshot = self.session.snapshot();
        let mut decision = decide(&target, &snapshot);
        let landing = match &decision {
            GuardDecision::Redirect {
                to,
                reason: RedirectReason::AlreadyAuthenticated | RedirectReason::RoleMismatch,
            } => Some(self.routes.resolve(to)),
            _ => None,
        };
        if let Some(landing) = landing {
            if !decide(&landing, &snapshot).is_allow() {
                tracing::warn!(
                    role = ?snapshot.role(),
                    landing = %landing.path,
                    "role cannot enter its default destination; ending session"
                );
                self.session.end_session(LogoutReason::NoReachableRoute).await;
                decision = GuardDecision::redirect(LOGIN_PATH, RedirectReason::NoReachableRoute);
            }
        }
        tracing::debug!(from, to = %target.path, ?decision, "navigation guard");
        decision
    }
}

/// Rules 2–5 over a session snapshot.
pub fn decide(target: &Route, session: &Session) -> GuardDecision {
    let authenticated = session.is_authenticated();
    let role: Option<&Role> = session.role();

    if target.access.requires_auth && !authenticated {
        return GuardDecision::redirect(LOGIN_PATH, RedirectReason::LoginRequired);
    }
    if target.path == LOGIN_PATH && authenticated {
        return GuardDecision::redirect(default_destination(role), RedirectReason::AlreadyAuthenticated);
    }
    if let (Some(required), Some(actual)) = (&target.access.role, role) {
        if required != actual {
            return GuardDecision::redirect(default_destination(role), RedirectReason::RoleMismatch);
        }
    }
    GuardDecision::Allow
}
