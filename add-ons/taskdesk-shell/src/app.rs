//! Shell application: owns the wiring and renders a placeholder view per route.
//!
//! The UI thread never awaits. Session operations run on the tokio runtime and report
//! back through an mpsc channel drained once per frame; the current route is read from
//! the router, which follows session events on its own.

use crate::window::EguiWindow;
use eframe::egui;
use std::sync::Arc;
use std::time::Duration;
use taskdesk_api::ApiClient;
use taskdesk_core::{
    DurableStore, NavigationGuard, PresentationController, RouteTable, Router, SessionPhase, SessionStore,
    ShellConfig, LOGIN_PATH,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const REPAINT_INTERVAL: Duration = Duration::from_millis(250);

/// Results of background operations, delivered to the UI thread.
#[derive(Debug)]
enum UiOutcome {
    LoginFailed(String),
    LoginDone,
    NavigationFailed(String),
}

pub struct ShellApp {
    runtime: Handle,
    session: Arc<SessionStore>,
    router: Arc<Router>,
    username: String,
    password: String,
    busy: bool,
    error: Option<String>,
    outcomes_tx: mpsc::UnboundedSender<UiOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<UiOutcome>,
    listeners: Vec<JoinHandle<()>>,
}

impl ShellApp {
    /// Builds the transport, session store and router, spawns their listeners and
    /// starts the initial navigation to `/`. Must be called inside the runtime context.
    pub fn new(
        ctx: egui::Context,
        runtime: Handle,
        config: &ShellConfig,
        storage: Arc<dyn DurableStore>,
        routes: RouteTable,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let api = Arc::new(ApiClient::from_config(config, storage.clone())?);
        let presentation = Arc::new(PresentationController::new(Arc::new(EguiWindow::new(ctx))));
        let session = Arc::new(SessionStore::new(api.clone(), api.clone(), storage, presentation));
        let routes = Arc::new(routes);
        let router = Arc::new(Router::new(
            NavigationGuard::new(session.clone(), routes.clone()),
            routes,
        ));

        let listeners = vec![
            session.clone().spawn_transport_listener(api.subscribe()),
            router.clone().spawn_session_listener(session.subscribe()),
        ];

        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let app = Self {
            runtime,
            session,
            router,
            username: String::new(),
            password: String::new(),
            busy: false,
            error: None,
            outcomes_tx,
            outcomes_rx,
            listeners,
        };
        // a rehydrated credential is resolved by the guard on this first navigation
        app.navigate("/");
        Ok(app)
    }

    fn navigate(&self, to: &str) {
        let router = self.router.clone();
        let tx = self.outcomes_tx.clone();
        let to = to.to_string();
        self.runtime.spawn(async move {
            if let Err(e) = router.push(&to).await {
                let _ = tx.send(UiOutcome::NavigationFailed(e.to_string()));
            }
        });
    }

    fn submit_login(&mut self) {
        self.busy = true;
        self.error = None;
        let session = self.session.clone();
        let tx = self.outcomes_tx.clone();
        let username = self.username.trim().to_string();
        let password = std::mem::take(&mut self.password);
        self.runtime.spawn(async move {
            let outcome = match session.login(&username, &password).await {
                Ok(_) => UiOutcome::LoginDone,
                Err(e) => UiOutcome::LoginFailed(e.to_string()),
            };
            let _ = tx.send(outcome);
        });
    }

    fn logout(&self) {
        let session = self.session.clone();
        self.runtime.spawn(async move { session.logout().await });
    }

    fn refresh_profile(&self) {
        let session = self.session.clone();
        self.runtime.spawn(async move {
            session.refresh_identity().await;
        });
    }

    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            match outcome {
                UiOutcome::LoginDone => self.busy = false,
                UiOutcome::LoginFailed(message) => {
                    self.busy = false;
                    self.error = Some(message);
                }
                UiOutcome::NavigationFailed(message) => {
                    tracing::warn!(error = %message, "navigation failed");
                    self.error = Some(message);
                }
            }
        }
    }

    fn login_view(&mut self, ui: &mut egui::Ui) {
        ui.heading("TaskDesk");
        ui.separator();
        ui.label("Username");
        ui.text_edit_singleline(&mut self.username);
        ui.label("Password");
        let password = ui.add(egui::TextEdit::singleline(&mut self.password).password(true));
        let submitted = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        ui.add_space(8.0);
        let button = ui.add_enabled(!self.busy, egui::Button::new("Sign in"));
        if (button.clicked() || submitted) && !self.busy {
            self.submit_login();
        }
        if self.busy {
            ui.spinner();
        }

        // authenticated but shown the login view: always offer a way out
        if self.session.is_authenticated() {
            ui.add_space(8.0);
            if ui.button("Log out").clicked() {
                self.logout();
            }
        }
    }

    fn session_header(&self, ui: &mut egui::Ui) -> bool {
        let mut logout = false;
        ui.horizontal(|ui| {
            match self.session.identity() {
                Some(identity) => {
                    let name = if identity.display_name.is_empty() {
                        identity.username.clone()
                    } else {
                        identity.display_name.clone()
                    };
                    ui.label(format!("{} ({})", name, identity.role));
                }
                None => {
                    ui.label("Resolving profile…");
                }
            }
            if ui.button("Refresh").clicked() {
                self.refresh_profile();
            }
            if ui.button("Log out").clicked() {
                logout = true;
            }
        });
        ui.separator();
        logout
    }

    fn admin_nav(&self, ui: &mut egui::Ui, current: &str) {
        ui.horizontal(|ui| {
            for (path, label) in [
                ("/admin/dashboard", "Dashboard"),
                ("/admin/users", "Users"),
                ("/admin/tasks-manage", "Tasks"),
            ] {
                if ui.selectable_label(current == path, label).clicked() && current != path {
                    self.navigate(path);
                }
            }
        });
        ui.separator();
    }
}

impl eframe::App for ShellApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_outcomes();
        let current = self.router.current_route();

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(route) = current else {
                ui.centered_and_justified(|ui| ui.spinner());
                return;
            };

            if route.path == LOGIN_PATH || self.session.phase() == SessionPhase::Anonymous {
                self.login_view(ui);
            } else {
                if self.session_header(ui) {
                    self.logout();
                }
                if route.path.starts_with("/admin") {
                    self.admin_nav(ui, &route.path);
                }
                ui.heading(route.name.as_deref().unwrap_or(route.path.as_str()));
            }

            if let Some(error) = &self.error {
                ui.add_space(8.0);
                ui.colored_label(egui::Color32::from_rgb(220, 80, 80), error);
            }
        });

        // session events move the router from the runtime; poll for the result
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
        tracing::debug!("session listeners stopped");
    }
}
