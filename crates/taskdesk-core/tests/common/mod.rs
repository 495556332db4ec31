//! Test doubles shared by the session, guard and router tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskdesk_core::{
    AccessToken, AuthError, Authenticator, Credential, DurableStore, Identity, IdentityResolver,
    MemoryStore, PresentationController, Role, SessionStore, WindowCapability, WindowError,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Accepts `alice/pw` (employee), `root/pw` (admin), `audit/pw` (a role the route table
/// does not know) and `ghost/pw` (token the resolver does not know).
pub struct FakeAuthenticator {
    pub calls: AtomicUsize,
}

impl FakeAuthenticator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn submit_credentials(&self, username: &str, secret: &str) -> Result<AccessToken, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (username, secret) {
            ("alice", "pw") => Ok(AccessToken::bearer("tok-alice")),
            ("root", "pw") => Ok(AccessToken::bearer("tok-root")),
            ("audit", "pw") => Ok(AccessToken::bearer("tok-audit")),
            ("ghost", "pw") => Ok(AccessToken::bearer("tok-ghost")),
            ("offline", _) => Err(AuthError::Transport("connection refused".into())),
            _ => Err(AuthError::Rejected("Incorrect username or password".into())),
        }
    }
}

pub fn alice() -> Identity {
    Identity::new("alice", Role::Employee, "Alice").with_id(1)
}

pub fn root() -> Identity {
    Identity::new("root", Role::Admin, "Root").with_id(2)
}

pub fn auditor() -> Identity {
    Identity::new("audit", Role::Other("auditor".into()), "Audit").with_id(3)
}

/// Maps tokens to identities; unknown tokens are unauthorized. Optional delay makes
/// concurrent resolution observable.
pub struct FakeResolver {
    identities: HashMap<String, Identity>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        let mut identities = HashMap::new();
        identities.insert("tok-alice".to_string(), alice());
        identities.insert("tok-root".to_string(), root());
        identities.insert("tok-audit".to_string(), auditor());
        Self {
            identities,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityResolver for FakeResolver {
    async fn fetch_identity(&self, credential: &Credential) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.identities
            .get(credential.expose())
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
    Size(u32, u32),
    OnTop(bool),
}

#[derive(Default)]
pub struct RecordingWindow {
    calls: Mutex<Vec<WindowCall>>,
    fail: bool,
}

impl RecordingWindow {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<WindowCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_on_top(&self) -> Option<bool> {
        self.calls().iter().rev().find_map(|c| match c {
            WindowCall::OnTop(v) => Some(*v),
            _ => None,
        })
    }

    pub fn last_size(&self) -> Option<(u32, u32)> {
        self.calls().iter().rev().find_map(|c| match c {
            WindowCall::Size(w, h) => Some((*w, *h)),
            _ => None,
        })
    }
}

#[async_trait]
impl WindowCapability for RecordingWindow {
    async fn set_size(&self, width: u32, height: u32) -> Result<(), WindowError> {
        if self.fail {
            return Err(WindowError::Unavailable);
        }
        self.calls.lock().unwrap().push(WindowCall::Size(width, height));
        Ok(())
    }

    async fn set_always_on_top(&self, on_top: bool) -> Result<(), WindowError> {
        if self.fail {
            return Err(WindowError::Unavailable);
        }
        self.calls.lock().unwrap().push(WindowCall::OnTop(on_top));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<SessionStore>,
    pub storage: Arc<MemoryStore>,
    pub window: Arc<RecordingWindow>,
    pub authenticator: Arc<FakeAuthenticator>,
    pub resolver: Arc<FakeResolver>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(MemoryStore::new(), FakeResolver::new(), RecordingWindow::default())
    }

    /// As if a previous run had stored `token`.
    pub fn rehydrated(token: &str) -> Self {
        Self::build(
            MemoryStore::with_credential(token),
            FakeResolver::new(),
            RecordingWindow::default(),
        )
    }

    pub fn build(storage: MemoryStore, resolver: FakeResolver, window: RecordingWindow) -> Self {
        init_tracing();
        let storage = Arc::new(storage);
        let resolver = Arc::new(resolver);
        let window = Arc::new(window);
        let authenticator = Arc::new(FakeAuthenticator::new());
        let presentation = Arc::new(PresentationController::new(window.clone()));
        let store = Arc::new(SessionStore::new(
            authenticator.clone(),
            resolver.clone(),
            storage.clone(),
            presentation,
        ));
        Self {
            store,
            storage,
            window,
            authenticator,
            resolver,
        }
    }

    pub fn credential(&self) -> Credential {
        self.store
            .snapshot()
            .credential()
            .cloned()
            .expect("session holds a credential")
    }

    pub fn stored_token(&self) -> Option<String> {
        self.storage.get(taskdesk_core::CREDENTIAL_KEY).unwrap()
    }

    /// `identity ⇒ credential`, checked on a fresh snapshot.
    pub fn assert_consistent(&self) {
        let snapshot = self.store.snapshot();
        if snapshot.identity().is_some() {
            assert!(snapshot.credential().is_some(), "identity without credential");
        }
    }
}
