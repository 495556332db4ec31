//! Navigation guard against a live session store.

mod common;

use common::{FakeResolver, Harness, RecordingWindow};
use std::sync::Arc;
use std::time::Duration;
use taskdesk_core::{
    AccessRequirement, GuardDecision, LogoutReason, MemoryStore, NavigationGuard, PresentationMode,
    RedirectReason, RouteDef, RouteTable, SessionEvent, SessionPhase, ADMIN_DASHBOARD_PATH, LOGIN_PATH,
    TASKS_PATH,
};

fn guard_for(h: &Harness) -> NavigationGuard {
    NavigationGuard::new(h.store.clone(), Arc::new(RouteTable::default()))
}

fn redirect(to: &str, reason: RedirectReason) -> GuardDecision {
    GuardDecision::Redirect {
        to: to.to_string(),
        reason,
    }
}

#[tokio::test]
async fn anonymous_is_sent_to_login() {
    let h = Harness::new();
    let guard = guard_for(&h);

    assert_eq!(
        guard.evaluate("/", TASKS_PATH).await,
        redirect(LOGIN_PATH, RedirectReason::LoginRequired)
    );
    assert_eq!(
        guard.evaluate("/", ADMIN_DASHBOARD_PATH).await,
        redirect(LOGIN_PATH, RedirectReason::LoginRequired)
    );
    assert_eq!(
        guard.evaluate("/", "/admin/users").await,
        redirect(LOGIN_PATH, RedirectReason::LoginRequired)
    );
    assert!(guard.evaluate("/", LOGIN_PATH).await.is_allow());
}

#[tokio::test]
async fn employee_is_kept_out_of_admin_routes() {
    let h = Harness::new();
    h.store.login("alice", "pw").await.unwrap();
    let guard = guard_for(&h);

    assert_eq!(
        guard.evaluate(TASKS_PATH, LOGIN_PATH).await,
        redirect(TASKS_PATH, RedirectReason::AlreadyAuthenticated)
    );
    assert_eq!(
        guard.evaluate(TASKS_PATH, "/admin/tasks-manage").await,
        redirect(TASKS_PATH, RedirectReason::RoleMismatch)
    );
    assert!(guard.evaluate(LOGIN_PATH, TASKS_PATH).await.is_allow());
}

#[tokio::test]
async fn admin_is_bounced_off_login_and_employee_routes() {
    let h = Harness::new();
    h.store.login("root", "pw").await.unwrap();
    let guard = guard_for(&h);

    assert_eq!(
        guard.evaluate(ADMIN_DASHBOARD_PATH, LOGIN_PATH).await,
        redirect(ADMIN_DASHBOARD_PATH, RedirectReason::AlreadyAuthenticated)
    );
    assert_eq!(
        guard.evaluate(ADMIN_DASHBOARD_PATH, TASKS_PATH).await,
        redirect(ADMIN_DASHBOARD_PATH, RedirectReason::RoleMismatch)
    );
    assert!(guard.evaluate(LOGIN_PATH, "/admin/users").await.is_allow());
}

#[tokio::test]
async fn pending_identity_is_resolved_before_deciding() {
    let h = Harness::rehydrated("tok-root");
    let guard = guard_for(&h);
    assert_eq!(h.store.phase(), SessionPhase::PendingIdentity);

    assert!(guard.evaluate("/", ADMIN_DASHBOARD_PATH).await.is_allow());

    assert_eq!(h.store.phase(), SessionPhase::Ready);
    assert!(h.store.is_admin());
    assert_eq!(h.store.presentation().current(), PresentationMode::AdminView);
    assert_eq!(h.resolver.calls(), 1);
}

#[tokio::test]
async fn failed_pending_resolution_lands_on_login() {
    let h = Harness::rehydrated("tok-revoked");
    let guard = guard_for(&h);

    assert_eq!(
        guard.evaluate("/", TASKS_PATH).await,
        redirect(LOGIN_PATH, RedirectReason::LoginRequired)
    );
    assert_eq!(h.store.phase(), SessionPhase::Anonymous);
    assert_eq!(h.stored_token(), None);
}

#[tokio::test]
async fn concurrent_evaluations_share_one_resolution() {
    let h = Harness::build(
        MemoryStore::with_credential("tok-alice"),
        FakeResolver::new().with_delay(Duration::from_millis(30)),
        RecordingWindow::default(),
    );
    let guard = guard_for(&h);

    let (a, b) = tokio::join!(
        guard.evaluate("/", TASKS_PATH),
        guard.evaluate("/", "/admin/dashboard")
    );

    assert!(a.is_allow());
    assert_eq!(b, redirect(TASKS_PATH, RedirectReason::RoleMismatch));
    assert_eq!(h.resolver.calls(), 1);
}

#[tokio::test]
async fn unknown_paths_are_public() {
    let h = Harness::new();
    let guard = guard_for(&h);
    assert!(guard.evaluate("/", "/nowhere").await.is_allow());
}

#[tokio::test]
async fn root_redirect_is_followed_before_rules() {
    let h = Harness::new();
    h.store.login("alice", "pw").await.unwrap();
    let guard = guard_for(&h);

    // "/" statically resolves to /login, which an authenticated session may not enter
    assert_eq!(
        guard.evaluate(TASKS_PATH, "/").await,
        redirect(TASKS_PATH, RedirectReason::AlreadyAuthenticated)
    );
}

#[tokio::test]
async fn role_without_landing_route_is_logged_out() {
    let h = Harness::new();
    h.store.login("audit", "pw").await.unwrap();
    let mut events = h.store.subscribe();
    let guard = guard_for(&h);

    assert_eq!(
        guard.evaluate(LOGIN_PATH, TASKS_PATH).await,
        redirect(LOGIN_PATH, RedirectReason::NoReachableRoute)
    );
    assert_eq!(h.store.phase(), SessionPhase::Anonymous);
    assert_eq!(h.store.presentation().current(), PresentationMode::Login);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::NoReachableRoute,
            destination: LOGIN_PATH.to_string(),
        }
    );

    // anonymous now: the ordinary rules apply again
    assert!(guard.evaluate("/", LOGIN_PATH).await.is_allow());
}

#[tokio::test]
async fn unknown_role_may_enter_routes_without_role_requirement() {
    let h = Harness::new();
    h.store.login("audit", "pw").await.unwrap();
    let table = RouteTable::new(vec![
        RouteDef::new(LOGIN_PATH),
        RouteDef::new(TASKS_PATH).access(AccessRequirement::authenticated(None)),
    ])
    .unwrap();
    let guard = NavigationGuard::new(h.store.clone(), Arc::new(table));

    assert!(guard.evaluate(LOGIN_PATH, TASKS_PATH).await.is_allow());
    assert_eq!(
        guard.evaluate(TASKS_PATH, LOGIN_PATH).await,
        redirect(TASKS_PATH, RedirectReason::AlreadyAuthenticated)
    );
    assert!(h.store.is_authenticated());
}
