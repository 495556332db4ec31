//! taskdesk-core: session-and-navigation gatekeeper of the TaskDesk desktop shell.
//!
//! Three pieces are kept in step:
//! - [`SessionStore`]: credential + resolved identity, login / refresh / logout;
//! - [`NavigationGuard`]: allow/redirect decision for every route transition;
//! - [`PresentationController`]: window geometry and stacking per [`PresentationMode`].
//!
//! Collaborators (HTTP transport, durable storage, windowing) are consumed through the
//! traits in [`auth`], [`store`] and [`presentation`].

pub mod auth;
mod config;
mod error;
mod events;
mod guard;
mod identity;
pub mod presentation;
mod router;
pub mod routes;
mod session;
pub mod store;

pub use auth::{
    transport_signal_channel, Authenticator, IdentityResolver, TransportSignal, TransportSignalReceiver,
    TransportSignalSender,
};
pub use self::config::ShellConfig;
pub use error::{AuthError, NavigationError, RouteError, SessionError, StoreError, WindowError};
pub use events::{LogoutReason, SessionEvent};
pub use guard::{decide, GuardDecision, NavigationGuard, RedirectReason};
pub use identity::{AccessToken, Credential, Identity, Role};
pub use presentation::{PresentationController, PresentationMode, WindowCapability, WindowGeometry};
pub use router::{Router, MAX_REDIRECTS};
pub use routes::{
    default_destination, AccessRequirement, Route, RouteDef, RouteTable, ADMIN_DASHBOARD_PATH, LOGIN_PATH,
    TASKS_PATH,
};
pub use session::{Session, SessionPhase, SessionStore};
pub use store::{DurableStore, MemoryStore, SledStore, CREDENTIAL_KEY};
