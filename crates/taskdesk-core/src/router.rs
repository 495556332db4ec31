//! Navigation layer: current location, guarded `push`, and following session events.

use crate::error::NavigationError;
use crate::events::SessionEvent;
use crate::guard::{GuardDecision, NavigationGuard};
use crate::routes::{Route, RouteTable};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Guard redirects followed before a navigation is abandoned.
pub const MAX_REDIRECTS: usize = 8;

pub struct Router {
    guard: NavigationGuard,
    routes: Arc<RouteTable>,
    current: RwLock<Option<Route>>,
}

impl Router {
    pub fn new(guard: NavigationGuard, routes: Arc<RouteTable>) -> Self {
        Self {
            guard,
            routes,
            current: RwLock::new(None),
        }
    }

    /// Path of the current location; `None` before the first navigation completes.
    pub fn current(&self) -> Option<String> {
        self.current_route().map(|r| r.path)
    }

    pub fn current_route(&self) -> Option<Route> {
        match self.current.read() {
            Ok(route) => route.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Navigates to `to`, running the guard and following its redirects. Returns the path
    /// actually entered.
    pub async fn push(&self, to: &str) -> Result<String, NavigationError> {
        let from = self.current().unwrap_or_else(|| "/".to_string());
        let mut target = to.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let route = self.routes.resolve(&target);
            match self.guard.evaluate(&from, &route.path).await {
                GuardDecision::Allow => {
                    let path = route.path.clone();
                    match self.current.write() {
                        Ok(mut current) => *current = Some(route),
                        Err(poisoned) => *poisoned.into_inner() = Some(route),
                    }
                    tracing::debug!(%from, %path, "navigated");
                    return Ok(path);
                }
                GuardDecision::Redirect { to: next, reason } => {
                    tracing::debug!(from = %route.path, to = %next, ?reason, "guard redirect");
                    target = next;
                }
            }
        }
        tracing::warn!(to, "navigation abandoned after {} redirects", MAX_REDIRECTS);
        Err(NavigationError::RedirectLoop(to.to_string()))
    }

    /// Moves to the destination carried by a session event, if any.
    pub async fn follow(&self, event: &SessionEvent) {
        if let Some(destination) = event.destination() {
            if let Err(e) = self.push(destination).await {
                tracing::warn!(error = %e, "could not follow session event");
            }
        }
    }

    /// Follows session events until the channel closes or the handle is aborted. The
    /// router holds the store through its guard, so the channel stays open for as long as
    /// the router lives; owners keep the handle and abort it on shutdown.
    pub fn spawn_session_listener(
        self: Arc<Self>,
        mut receiver: broadcast::Receiver<SessionEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => self.follow(&event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
