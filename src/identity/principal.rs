use serde::{Deserialize, Serialize};

/// The signed-in user as reported by `GET /users/me`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    #[serde(default, rename = "full_name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Identity {
    pub fn new<S: Into<String>>(id: i64, email: S) -> Self {
        Self { id, email: email.into(), ..Default::default() }
    }

    /// Display name if the profile has one, the email otherwise.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(n) if !n.trim().is_empty() => n,
            _ => self.email.as_str(),
        }
    }
}
