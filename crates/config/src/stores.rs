//! Small JSON-backed stores: the persona and the process state.
//!
//! Both are read whole and rewritten whole. A missing file yields defaults;
//! an unparsable one yields defaults plus a warning.

use archie_core::persona::{Persona, PersonaUpdate};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::ConfigError;

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return T::default(),
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unparsable file, using defaults");
            T::default()
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let write_err = |reason: String| ConfigError::WriteError {
        path: path.to_path_buf(),
        reason,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }
    let data = serde_json::to_string_pretty(value).map_err(|e| write_err(e.to_string()))?;
    std::fs::write(path, data).map_err(|e| write_err(e.to_string()))
}

/// The configuration store for [`Persona`] fields.
pub struct PersonaStore {
    path: PathBuf,
}

impl PersonaStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Current persona, with default names filled in.
    pub fn get(&self) -> Persona {
        read_json_or_default::<Persona>(&self.path).with_defaults()
    }

    /// Merge `update` into the stored persona and persist it.
    pub fn set(&self, update: &PersonaUpdate) -> Result<Persona, ConfigError> {
        let mut persona = self.get();
        persona.apply(update);
        write_json(&self.path, &persona)?;
        Ok(persona)
    }
}

/// Process state that survives between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default = "default_check_in")]
    pub check_in_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Local>>,

    /// Newest calendar day whose log has been digested into vector memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_digested_day: Option<NaiveDate>,
}

fn default_check_in() -> bool {
    true
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            check_in_enabled: true,
            last_checked: None,
            last_digested_day: None,
        }
    }
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> AppState {
        read_json_or_default(&self.path)
    }

    pub fn save(&self, state: &AppState) -> Result<(), ConfigError> {
        write_json(&self.path, state)
    }

    /// Read-modify-write the state.
    pub fn update(&self, f: impl FnOnce(&mut AppState)) -> Result<AppState, ConfigError> {
        let mut state = self.load();
        f(&mut state);
        self.save(&state)?;
        Ok(state)
    }

    /// Flip check-ins on or off, returning the new setting.
    pub fn toggle_check_in(&self) -> Result<bool, ConfigError> {
        self.update(|s| s.check_in_enabled = !s.check_in_enabled)
            .map(|s| s.check_in_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn persona_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let store = PersonaStore::new(dir.path().join("persona.json"));
        let persona = store.get();
        assert_eq!(persona.ai_name, "Archie");
        assert_eq!(persona.user_name, "User");
    }

    #[test]
    fn persona_set_persists_merge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("persona.json");
        let store = PersonaStore::new(path.clone());

        store
            .set(&PersonaUpdate {
                user_name: Some("Ada".into()),
                ..PersonaUpdate::default()
            })
            .unwrap();
        store
            .set(&PersonaUpdate {
                personality: Some("curious".into()),
                ..PersonaUpdate::default()
            })
            .unwrap();

        let persona = PersonaStore::new(path).get();
        assert_eq!(persona.user_name, "Ada");
        assert_eq!(persona.personality, "curious");
        assert_eq!(persona.ai_name, "Archie");
    }

    #[test]
    fn corrupt_persona_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("persona.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(PersonaStore::new(path).get(), Persona::default());
    }

    #[test]
    fn check_ins_enabled_by_default_and_toggle() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(store.load().check_in_enabled);
        assert!(!store.toggle_check_in().unwrap());
        assert!(store.toggle_check_in().unwrap());
    }

    #[test]
    fn digest_watermark_persists() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        store.update(|s| s.last_digested_day = Some(day)).unwrap();
        assert_eq!(store.load().last_digested_day, Some(day));
    }
}
