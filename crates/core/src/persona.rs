//! Persona: the free-text fields that seed every system message.

use serde::{Deserialize, Serialize};

pub const DEFAULT_AI_NAME: &str = "Archie";
pub const DEFAULT_USER_NAME: &str = "User";

/// Who the assistant is and who it is talking to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub user_name: String,

    #[serde(default)]
    pub ai_name: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub personality: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            user_name: DEFAULT_USER_NAME.into(),
            ai_name: DEFAULT_AI_NAME.into(),
            bio: String::new(),
            personality: String::new(),
        }
    }
}

impl Persona {
    /// Fill blank names with the defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.ai_name.trim().is_empty() {
            self.ai_name = DEFAULT_AI_NAME.into();
        }
        if self.user_name.trim().is_empty() {
            self.user_name = DEFAULT_USER_NAME.into();
        }
        self
    }

    /// Apply an update; empty or absent fields leave the current value.
    pub fn apply(&mut self, update: &PersonaUpdate) {
        fn merge(slot: &mut String, value: &Option<String>) {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                *slot = v.to_string();
            }
        }
        merge(&mut self.user_name, &update.user_name);
        merge(&mut self.ai_name, &update.ai_name);
        merge(&mut self.bio, &update.bio);
        merge(&mut self.personality, &update.personality);
    }
}

/// A partial persona change requested by the user.
#[derive(Debug, Clone, Default)]
pub struct PersonaUpdate {
    pub user_name: Option<String>,
    pub ai_name: Option<String>,
    pub bio: Option<String>,
    pub personality: Option<String>,
}

impl PersonaUpdate {
    pub fn is_empty(&self) -> bool {
        [&self.user_name, &self.ai_name, &self.bio, &self.personality]
            .iter()
            .all(|f| f.as_deref().is_none_or(str::is_empty))
    }
}
