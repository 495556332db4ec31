//! Static route table with per-route access requirements.
//!
//! Routes are declared as a tree (children inherit the parent's requirement) and
//! flattened once at startup. The table is read-only afterwards. A TOML file with the
//! same shape can replace the built-in table:
//!
//! ```toml
//! [[routes]]
//! path = "/tasks"
//! name = "Tasks"
//! access = { requires_auth = true, role = "employee" }
//! ```

use crate::error::RouteError;
use crate::identity::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const LOGIN_PATH: &str = "/login";
pub const TASKS_PATH: &str = "/tasks";
pub const ADMIN_DASHBOARD_PATH: &str = "/admin/dashboard";

const MAX_STATIC_REDIRECTS: usize = 8;

/// Default destination for an authenticated session: the admin dashboard for admins,
/// the task list for everyone else (including a role that is not resolved yet).
pub fn default_destination(role: Option<&Role>) -> &'static str {
    match role {
        Some(Role::Admin) => ADMIN_DASHBOARD_PATH,
        _ => TASKS_PATH,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl AccessRequirement {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated(role: Option<Role>) -> Self {
        Self {
            requires_auth: true,
            role,
        }
    }

    /// Child fields override the parent; a child cannot drop the parent's auth requirement.
    fn inherit(&self, child: &Self) -> Self {
        Self {
            requires_auth: self.requires_auth || child.requires_auth,
            role: child.role.clone().or_else(|| self.role.clone()),
        }
    }
}

/// Declared route, as written in code or in a route file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteDef {
    /// Absolute (`/admin`) or, for children, relative to the parent (`dashboard`).
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub access: AccessRequirement,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub children: Vec<RouteDef>,
}

impl RouteDef {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn access(mut self, access: AccessRequirement) -> Self {
        self.access = access;
        self
    }

    pub fn redirect(mut self, to: &str) -> Self {
        self.redirect = Some(to.to_string());
        self
    }

    pub fn children(mut self, children: Vec<RouteDef>) -> Self {
        self.children = children;
        self
    }
}

/// A flattened route with its effective access requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub name: Option<String>,
    pub access: AccessRequirement,
    pub redirect: Option<String>,
}

impl Route {
    fn unmatched(path: String) -> Self {
        Self {
            path,
            name: None,
            access: AccessRequirement::public(),
            redirect: None,
        }
    }

    pub fn is_login(&self) -> bool {
        self.path == LOGIN_PATH
    }
}

#[derive(Deserialize)]
struct RouteFile {
    #[serde(default)]
    routes: Vec<RouteDef>,
}

/// Ordered, flattened route table. First declared match wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Flattens and validates the declared routes.
    pub fn new(defs: Vec<RouteDef>) -> Result<Self, RouteError> {
        let mut routes = Vec::new();
        for def in &defs {
            flatten(def, "", &AccessRequirement::public(), &mut routes)?;
        }
        let table = Self { routes };
        table.validate()?;
        Ok(table)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, RouteError> {
        let file: RouteFile = toml::from_str(s)?;
        Self::new(file.routes)
    }

    pub fn load(path: &Path) -> Result<Self, RouteError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Matches `path` (query and fragment dropped, trailing slash ignored), following
    /// static redirects. Unknown paths resolve to a public, unnamed route.
    pub fn resolve(&self, path: &str) -> Route {
        let mut current = normalize(path);
        for _ in 0..MAX_STATIC_REDIRECTS {
            match self.find(&current) {
                Some(route) => match &route.redirect {
                    Some(to) => current = normalize(to),
                    None => return route.clone(),
                },
                None => return Route::unmatched(current),
            }
        }
        tracing::warn!(path, "static redirect chain too long; stopping at {}", current);
        self.find(&current)
            .cloned()
            .unwrap_or_else(|| Route::unmatched(current))
    }

    fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path == path)
    }

    fn validate(&self) -> Result<(), RouteError> {
        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(route.path.as_str()) {
                return Err(RouteError::DuplicatePath(route.path.clone()));
            }
        }
        for route in &self.routes {
            if let Some(to) = &route.redirect {
                let target = normalize(to);
                if !seen.contains(target.as_str()) {
                    return Err(RouteError::UnknownRedirect {
                        from: route.path.clone(),
                        to: target,
                    });
                }
            }
        }
        Ok(())
    }
}

impl RouteTable {
    /// Login, the employee task list and the admin branch; `/` goes to login.
    pub fn builtin() -> Result<Self, RouteError> {
        Self::new(vec![
            RouteDef::new(LOGIN_PATH).named("Login"),
            RouteDef::new(TASKS_PATH)
                .named("Tasks")
                .access(AccessRequirement::authenticated(Some(Role::Employee))),
            RouteDef::new("/admin")
                .named("Admin")
                .access(AccessRequirement::authenticated(Some(Role::Admin)))
                .children(vec![
                    RouteDef::new("dashboard").named("Dashboard"),
                    RouteDef::new("users").named("UserManagement"),
                    RouteDef::new("tasks-manage").named("TaskManagement"),
                ]),
            RouteDef::new("/").redirect(LOGIN_PATH),
        ])
    }
}

impl Default for RouteTable {
    /// The [`RouteTable::builtin`] table. Should it ever fail validation, only the login
    /// route is kept so the shell can still start.
    fn default() -> Self {
        Self::builtin().unwrap_or_else(|e| {
            tracing::error!(error = %e, "built-in route table is invalid; falling back to login only");
            Self {
                routes: vec![Route::unmatched(LOGIN_PATH.to_string())],
            }
        })
    }
}

fn flatten(
    def: &RouteDef,
    parent_path: &str,
    parent_access: &AccessRequirement,
    out: &mut Vec<Route>,
) -> Result<(), RouteError> {
    let raw = def.path.trim();
    if raw.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    let path = if raw.starts_with('/') || parent_path.is_empty() {
        normalize(raw)
    } else {
        normalize(&format!("{}/{}", parent_path.trim_end_matches('/'), raw))
    };
    let access = parent_access.inherit(&def.access);
    out.push(Route {
        path: path.clone(),
        name: def.name.clone(),
        access: access.clone(),
        redirect: def.redirect.clone(),
    });
    for child in &def.children {
        flatten(child, &path, &access, out)?;
    }
    Ok(())
}

/// `/admin/` → `/admin`, `tasks?x=1` → `/tasks`, `` → `/`.
pub fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("").trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
