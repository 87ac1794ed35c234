//! Persisted UI state that lives next to the auth session: the interface
//! language and the layout preferences.
//!
//! Both containers use the same `{"state": {...}, "version": 0}` files as
//! `AuthSession` and are namespaced through `EnvConfig::storage_file`.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::persist;

pub const DEFAULT_SIDEBAR_WIDTH: u32 = 260;

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::ZhCn, Language::EnUs];

    pub fn code(self) -> &'static str {
        match self {
            Language::ZhCn => "zh-CN",
            Language::EnUs => "en-US",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::ZhCn => "简体中文",
            Language::EnUs => "English",
        }
    }

    /// Map any language tag onto a supported language.
    ///
    /// `en` and `en-*` become English, everything else (including nothing)
    /// falls back to Simplified Chinese.
    pub fn normalize(tag: Option<&str>) -> Language {
        match tag {
            Some("en") => Language::EnUs,
            Some(tag) if tag.starts_with("en-") => Language::EnUs,
            _ => Language::ZhCn,
        }
    }
}

// Stored tags are kept raw so values written by older versions ("en", "zh")
// still rehydrate.
#[derive(Serialize, Deserialize)]
struct LanguageState {
    language: Option<String>,
}

/// The selected interface language, persisted on every change.
#[derive(Debug, Default)]
pub struct LanguageStore {
    language: RwLock<Language>,
    path: Option<PathBuf>,
}

impl LanguageStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let language = persist::load::<LanguageState>(&path, "language")
            .map(|state| Language::normalize(state.language.as_deref()))
            .unwrap_or_default();
        Self {
            language: RwLock::new(language),
            path: Some(path),
        }
    }

    pub fn open_in(dir: &Path, env: &EnvConfig) -> Self {
        Self::persistent(env.storage_file(dir, "i18n"))
    }

    pub fn language(&self) -> Language {
        *self.language.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn change_language(&self, language: Language) {
        *self.language.write().unwrap_or_else(|e| e.into_inner()) = language;
        if let Some(path) = &self.path {
            let state = LanguageState {
                language: Some(language.code().to_string()),
            };
            persist::save(path, &state, "language");
        }
    }
}

/// Layout preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub sidebar_collapsed: bool,
    pub sidebar_width: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            sidebar_collapsed: false,
            sidebar_width: DEFAULT_SIDEBAR_WIDTH,
        }
    }
}

/// Partial update for `PreferenceStore::update_preferences`; `None` keeps
/// the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub sidebar_collapsed: Option<bool>,
    pub sidebar_width: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct PreferenceState {
    #[serde(default)]
    preferences: UserPreferences,
}

#[derive(Debug, Default)]
pub struct PreferenceStore {
    preferences: RwLock<UserPreferences>,
    path: Option<PathBuf>,
}

impl PreferenceStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let preferences = persist::load::<PreferenceState>(&path, "preferences")
            .map(|state| state.preferences)
            .unwrap_or_default();
        Self {
            preferences: RwLock::new(preferences),
            path: Some(path),
        }
    }

    pub fn open_in(dir: &Path, env: &EnvConfig) -> Self {
        Self::persistent(env.storage_file(dir, "preferences"))
    }

    pub fn preferences(&self) -> UserPreferences {
        *self.preferences.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn toggle_sidebar(&self) {
        self.modify(|prefs| prefs.sidebar_collapsed = !prefs.sidebar_collapsed);
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) {
        self.modify(|prefs| prefs.sidebar_collapsed = collapsed);
    }

    pub fn update_preferences(&self, update: PreferencesUpdate) {
        self.modify(|prefs| {
            if let Some(collapsed) = update.sidebar_collapsed {
                prefs.sidebar_collapsed = collapsed;
            }
            if let Some(width) = update.sidebar_width {
                prefs.sidebar_width = width;
            }
        });
    }

    fn modify(&self, change: impl FnOnce(&mut UserPreferences)) {
        let snapshot = {
            let mut prefs = self.preferences.write().unwrap_or_else(|e| e.into_inner());
            change(&mut prefs);
            *prefs
        };
        if let Some(path) = &self.path {
            persist::save(path, &PreferenceState { preferences: snapshot }, "preferences");
        }
    }
}
