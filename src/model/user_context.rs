use serde::{Deserialize, Serialize};

const SYSTEM_USER_ID: &str = "system";
const DEV_USER_ID: &str = "dev-user";

/// Whoever is editing a family tree. Feeds the audit fields on trees and members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_email: None,
            user_name: None,
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.user_email = email;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.user_name = name;
        self
    }

    /// Seed data and store-internal changes
    pub fn system() -> Self {
        Self::new(SYSTEM_USER_ID)
            .with_email(Some("system@family-tree.internal".to_string()))
            .with_name(Some("System".to_string()))
    }

    /// Stand-in for requests without identifying headers
    pub fn default_user() -> Self {
        Self::new(DEV_USER_ID)
            .with_email(Some("dev@localhost".to_string()))
            .with_name(Some("Development User".to_string()))
    }

    /// Display name when known, the id otherwise
    pub fn label(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.user_id)
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::default_user()
    }
}
