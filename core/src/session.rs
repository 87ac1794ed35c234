//! Session and navigation collaborators used by the pipeline.
//!
//! # Design
//! The pipeline never owns global state. It reads the bearer token and
//! clears the session through `SessionStore`, and forces the login redirect
//! through `Navigator`; both are injected into the client so tests can use
//! fakes and separate clients never share a session by accident.
//!
//! `AuthSession` is the concrete auth state container. It can persist to a
//! JSON file and rehydrates from it on open, using the
//! `{"state": {...}, "version": 0}` layout.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::persist;
use crate::types::User;

const WHAT: &str = "session";

/// Source of the bearer token; cleared on authentication failure.
pub trait SessionStore: Send + Sync {
    /// Current token, if any. Synchronous and side-effect free.
    fn token(&self) -> Option<String>;

    /// Drop the persisted credentials. Must be idempotent.
    fn clear_session(&self);
}

/// Host router access, used for the forced login redirect.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    /// Full navigation to `path`, discarding in-page state.
    fn navigate_to(&self, path: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub is_authenticated: bool,
}

/// Auth state container with optional file persistence.
#[derive(Debug, Default)]
pub struct AuthSession {
    state: RwLock<AuthState>,
    path: Option<PathBuf>,
}

impl AuthSession {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a session persisted at `path`.
    ///
    /// A missing or unreadable file starts an empty session.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = persist::load(&path, WHAT).unwrap_or_default();
        Self {
            state: RwLock::new(state),
            path: Some(path),
        }
    }

    /// Open the session persisted under `dir`, keyed by the app namespace.
    pub fn open_in(dir: &Path, env: &EnvConfig) -> Self {
        Self::persistent(env.storage_file(dir, "auth"))
    }

    pub fn login(&self, user: Option<User>, token: impl Into<String>) {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            *state = AuthState {
                user,
                access_token: Some(token.into()),
                is_authenticated: true,
            };
            state.clone()
        };
        self.persist(&snapshot);
    }

    pub fn logout(&self) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = AuthState::default();
        if let Some(path) = &self.path {
            persist::remove(path, WHAT);
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).is_authenticated
    }

    fn persist(&self, state: &AuthState) {
        if let Some(path) = &self.path {
            persist::save(path, state, WHAT);
        }
    }
}

impl SessionStore for AuthSession {
    fn token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .access_token
            .clone()
    }

    fn clear_session(&self) {
        self.logout();
    }
}

/// Navigator for hosts without a browser location.
///
/// Tracks the current path and records every forced navigation.
#[derive(Debug)]
pub struct MemoryNavigator {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(initial.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Paths passed to `navigate_to`, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn navigate_to(&self, path: &str) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = path.to_string();
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn admin() -> User {
        User {
            id: Uuid::nil(),
            username: "admin".to_string(),
            name: "Administrator".to_string(),
            avatar: None,
            is_active: true,
            roles: vec!["admin".to_string()],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn login_then_logout() {
        let session = AuthSession::in_memory();
        assert_eq!(session.token(), None);
        session.login(Some(admin()), "abc");
        assert_eq!(session.token().as_deref(), Some("abc"));
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().username, "admin");
        session.logout();
        assert_eq!(session.state(), AuthState::default());
    }

    #[test]
    fn clear_session_is_idempotent() {
        let session = AuthSession::in_memory();
        session.login(None, "abc");
        session.clear_session();
        let once = session.state();
        session.clear_session();
        assert_eq!(session.state(), once);
        assert_eq!(session.token(), None);
    }

    #[test]
    fn persisted_session_rehydrates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_auth.json");

        AuthSession::persistent(&path).login(Some(admin()), "persisted-token");

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["state"]["accessToken"], "persisted-token");
        assert_eq!(raw["state"]["isAuthenticated"], true);
        assert_eq!(raw["version"], 0);

        let reopened = AuthSession::persistent(&path);
        assert_eq!(reopened.token().as_deref(), Some("persisted-token"));
        assert_eq!(reopened.user().unwrap().name, "Administrator");
    }

    #[test]
    fn clearing_persisted_session_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_auth.json");
        let session = AuthSession::persistent(&path);
        session.login(None, "t");
        assert!(path.exists());
        session.clear_session();
        session.clear_session();
        assert!(!path.exists());
        assert_eq!(AuthSession::persistent(&path).token(), None);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_auth.json");
        std::fs::write(&path, "{not json").unwrap();
        let session = AuthSession::persistent(&path);
        assert_eq!(session.token(), None);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn open_in_uses_namespaced_file() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvConfig {
            namespace: "admin".to_string(),
            ..EnvConfig::default()
        };
        AuthSession::open_in(dir.path(), &env).login(None, "t");
        assert!(dir.path().join("admin_auth.json").exists());
        assert_eq!(AuthSession::open_in(dir.path(), &env).token().as_deref(), Some("t"));
    }

    #[test]
    fn navigator_records_history() {
        let nav = MemoryNavigator::default();
        assert_eq!(nav.current_path(), "/");
        nav.navigate_to("/login");
        assert_eq!(nav.current_path(), "/login");
        assert_eq!(nav.history(), vec!["/login".to_string()]);
    }
}
