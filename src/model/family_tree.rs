use crate::model::{generate_id, Id, UserContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A family tree record. Members are scoped to exactly one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTree {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FamilyTree {
    pub fn new(name: String, description: Option<String>, owner: &UserContext) -> Self {
        Self::new_with_id(generate_id(), name, description, owner)
    }

    pub fn new_with_id(
        id: Id,
        name: String,
        description: Option<String>,
        owner: &UserContext,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description,
            owner_id: owner.user_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFamilyTree {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
