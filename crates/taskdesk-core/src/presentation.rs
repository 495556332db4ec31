//! Presentation modes: the coarse window shape that follows the session.
//!
//! | Mode | Size | Always on top |
//! |------|------|---------------|
//! | `login` | 800 × 600 | no |
//! | `primary-role-view` | 350 × 600 | yes (compact task widget) |
//! | `admin-view` | 1024 × 768 | no |
//!
//! Applying a mode is best-effort: windowing failures are logged and swallowed so that
//! the auth and navigation flow never blocks on the window.

use crate::error::WindowError;
use crate::identity::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationMode {
    Login,
    PrimaryRoleView,
    AdminView,
}

/// Concrete window shape for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
    pub always_on_top: bool,
}

impl PresentationMode {
    pub fn geometry(self) -> WindowGeometry {
        match self {
            Self::Login => WindowGeometry {
                width: 800,
                height: 600,
                always_on_top: false,
            },
            Self::PrimaryRoleView => WindowGeometry {
                width: 350,
                height: 600,
                always_on_top: true,
            },
            Self::AdminView => WindowGeometry {
                width: 1024,
                height: 768,
                always_on_top: false,
            },
        }
    }

    /// Mode entered after a role becomes known. Admins get the full view; every other
    /// role (including unknown ones) gets the compact widget.
    pub fn for_role(role: &Role) -> Self {
        match role {
            Role::Admin => Self::AdminView,
            _ => Self::PrimaryRoleView,
        }
    }
}

/// Windowing capability of the host shell.
#[async_trait]
pub trait WindowCapability: Send + Sync {
    async fn set_size(&self, width: u32, height: u32) -> Result<(), WindowError>;
    async fn set_always_on_top(&self, on_top: bool) -> Result<(), WindowError>;
}

/// Tracks the active mode and pushes its geometry to the window.
pub struct PresentationController {
    window: Arc<dyn WindowCapability>,
    current: RwLock<PresentationMode>,
}

impl PresentationController {
    /// Starts in [`PresentationMode::Login`]; the shell opens its window at login size.
    pub fn new(window: Arc<dyn WindowCapability>) -> Self {
        Self {
            window,
            current: RwLock::new(PresentationMode::Login),
        }
    }

    pub fn current(&self) -> PresentationMode {
        match self.current.read() {
            Ok(mode) => *mode,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Records `mode` and applies its geometry. Never fails.
    pub async fn apply_mode(&self, mode: PresentationMode) {
        match self.current.write() {
            Ok(mut current) => *current = mode,
            Err(poisoned) => *poisoned.into_inner() = mode,
        }
        let geometry = mode.geometry();
        match self.apply_geometry(geometry).await {
            Ok(()) => tracing::info!(
                ?mode,
                width = geometry.width,
                height = geometry.height,
                always_on_top = geometry.always_on_top,
                "presentation mode applied"
            ),
            Err(e) => tracing::warn!(?mode, error = %e, "failed to apply window geometry"),
        }
    }

    async fn apply_geometry(&self, geometry: WindowGeometry) -> Result<(), WindowError> {
        self.window.set_size(geometry.width, geometry.height).await?;
        self.window.set_always_on_top(geometry.always_on_top).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl WindowCapability for Recorder {
        async fn set_size(&self, width: u32, height: u32) -> Result<(), WindowError> {
            if self.fail {
                return Err(WindowError::Unavailable);
            }
            self.calls.lock().unwrap().push(format!("size {}x{}", width, height));
            Ok(())
        }

        async fn set_always_on_top(&self, on_top: bool) -> Result<(), WindowError> {
            self.calls.lock().unwrap().push(format!("on_top {}", on_top));
            Ok(())
        }
    }

    #[test]
    fn only_compact_mode_is_always_on_top() {
        assert!(PresentationMode::PrimaryRoleView.geometry().always_on_top);
        assert!(!PresentationMode::AdminView.geometry().always_on_top);
        assert!(!PresentationMode::Login.geometry().always_on_top);
    }

    #[test]
    fn role_to_mode() {
        assert_eq!(PresentationMode::for_role(&Role::Admin), PresentationMode::AdminView);
        assert_eq!(PresentationMode::for_role(&Role::Employee), PresentationMode::PrimaryRoleView);
        assert_eq!(
            PresentationMode::for_role(&Role::Other("auditor".into())),
            PresentationMode::PrimaryRoleView
        );
    }

    #[tokio::test]
    async fn apply_mode_sets_size_then_stacking() {
        let window = Arc::new(Recorder::default());
        let controller = PresentationController::new(window.clone());
        controller.apply_mode(PresentationMode::PrimaryRoleView).await;
        assert_eq!(controller.current(), PresentationMode::PrimaryRoleView);
        assert_eq!(
            *window.calls.lock().unwrap(),
            vec!["size 350x600".to_string(), "on_top true".to_string()]
        );
    }

    #[tokio::test]
    async fn window_failure_is_swallowed() {
        let window = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let controller = PresentationController::new(window.clone());
        controller.apply_mode(PresentationMode::AdminView).await;
        assert_eq!(controller.current(), PresentationMode::AdminView);
        assert!(window.calls.lock().unwrap().is_empty());
    }
}
