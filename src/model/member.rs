use crate::model::common::{default_timestamp, default_user};
use crate::model::{generate_id, Id, UserContext};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// The relationship pointers of a single member.
///
/// Used both as the stored state and as the proposed state of an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipState {
    #[serde(default)]
    pub parents: BTreeSet<Id>,
    #[serde(default)]
    pub children: BTreeSet<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse_id: Option<Id>,
}

impl RelationshipState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parents<I, T>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Id>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Id>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_spouse(mut self, spouse_id: impl Into<Id>) -> Self {
        self.spouse_id = Some(spouse_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.children.is_empty() && self.spouse_id.is_none()
    }

    /// Every member id this state points at
    pub fn referenced_ids(&self) -> impl Iterator<Item = &Id> {
        self.parents
            .iter()
            .chain(self.children.iter())
            .chain(self.spouse_id.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberProfileError {
    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },
    #[error("death date {death} precedes birth date {birth}")]
    DeathBeforeBirth { birth: NaiveDate, death: NaiveDate },
}

impl MemberProfileError {
    pub fn code(&self) -> &'static str {
        match self {
            MemberProfileError::EmptyName { .. } => "empty_name",
            MemberProfileError::DeathBeforeBirth { .. } => "death_before_birth",
        }
    }
}

/// A person in a family tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Id,
    pub tree_id: Id,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    #[serde(default)]
    pub parents: BTreeSet<Id>,
    #[serde(default)]
    pub children: BTreeSet<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,

    /// Bumped on every committed change, for optimistic concurrency checks
    #[serde(default)]
    pub version: u64,

    /// Audit fields for tracking who created/modified this member
    #[serde(default = "default_user")]
    pub created_by: String,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_user")]
    pub updated_by: String,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Build a member from creation input. Relationship sets start empty.
    pub fn new(
        tree_id: Id,
        input: NewMember,
        user: &UserContext,
    ) -> Result<Self, MemberProfileError> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: generate_id(),
            tree_id,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            gender: input.gender,
            birth_date: input.birth_date,
            death_date: input.death_date,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            spouse_id: None,
            bio: input.bio,
            profile_image_url: input.profile_image_url,
            version: 0,
            created_by: user.user_id.clone(),
            created_at: now,
            updated_by: user.user_id.clone(),
            updated_at: now,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn relationship_state(&self) -> RelationshipState {
        RelationshipState {
            parents: self.parents.clone(),
            children: self.children.clone(),
            spouse_id: self.spouse_id.clone(),
        }
    }

    pub fn set_relationship_state(&mut self, state: RelationshipState) {
        self.parents = state.parents;
        self.children = state.children;
        self.spouse_id = state.spouse_id;
    }

    /// Record who changed the member and when
    pub fn stamp(&mut self, user_id: &str) {
        self.updated_by = user_id.to_string();
        self.updated_at = Utc::now();
    }

    /// Record a committed change
    pub fn touch(&mut self, user_id: &str) {
        self.version += 1;
        self.stamp(user_id);
    }

    /// Apply a profile update. The member is left untouched when the result is invalid.
    ///
    /// The version is left alone; the store assigns it when the update is written.
    pub fn apply_update(
        &mut self,
        update: MemberUpdate,
        user: &UserContext,
    ) -> Result<(), MemberProfileError> {
        let first_name = update.first_name.unwrap_or_else(|| self.first_name.clone());
        let last_name = update.last_name.unwrap_or_else(|| self.last_name.clone());
        let birth_date = update.birth_date.or(self.birth_date);
        let death_date = update.death_date.or(self.death_date);
        validate_profile(&first_name, &last_name, birth_date, death_date)?;

        self.first_name = first_name.trim().to_string();
        self.last_name = last_name.trim().to_string();
        self.birth_date = birth_date;
        self.death_date = death_date;
        if let Some(gender) = update.gender {
            self.gender = gender;
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
        if let Some(url) = update.profile_image_url {
            self.profile_image_url = Some(url);
        }
        self.stamp(&user.user_id);
        Ok(())
    }
}

/// Member input model for creation (without ID and relationships)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub death_date: Option<NaiveDate>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

impl NewMember {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, gender: Gender) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            gender,
            birth_date: None,
            death_date: None,
            bio: None,
            profile_image_url: None,
        }
    }

    pub fn validate(&self) -> Result<(), MemberProfileError> {
        validate_profile(
            &self.first_name,
            &self.last_name,
            self.birth_date,
            self.death_date,
        )
    }
}

/// Member update model for PATCH operations
/// All fields are optional for partial updates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

pub fn validate_profile(
    first_name: &str,
    last_name: &str,
    birth_date: Option<NaiveDate>,
    death_date: Option<NaiveDate>,
) -> Result<(), MemberProfileError> {
    if first_name.trim().is_empty() {
        return Err(MemberProfileError::EmptyName { field: "firstName" });
    }
    if last_name.trim().is_empty() {
        return Err(MemberProfileError::EmptyName { field: "lastName" });
    }
    if let (Some(birth), Some(death)) = (birth_date, death_date) {
        if death < birth {
            return Err(MemberProfileError::DeathBeforeBirth { birth, death });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_member_starts_without_relationships() {
        let member = Member::new(
            "tree-1".to_string(),
            NewMember::new("Ada", "Lovelace", Gender::Female),
            &UserContext::default_user(),
        )
        .unwrap();

        assert!(member.relationship_state().is_empty());
        assert_eq!(member.version, 0);
        assert_eq!(member.created_by, "dev-user");
        assert_eq!(member.full_name(), "Ada Lovelace");
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = NewMember::new("  ", "Lovelace", Gender::Female)
            .validate()
            .unwrap_err();
        assert_eq!(err, MemberProfileError::EmptyName { field: "firstName" });
        assert_eq!(err.code(), "empty_name");
    }

    #[test]
    fn death_before_birth_is_rejected() {
        let mut input = NewMember::new("Ada", "Lovelace", Gender::Female);
        input.birth_date = Some(date(1815, 12, 10));
        input.death_date = Some(date(1800, 1, 1));
        assert!(matches!(
            input.validate(),
            Err(MemberProfileError::DeathBeforeBirth { .. })
        ));

        input.death_date = Some(date(1852, 11, 27));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn invalid_update_leaves_member_unchanged() {
        let user = UserContext::default_user();
        let mut input = NewMember::new("Ada", "Lovelace", Gender::Female);
        input.birth_date = Some(date(1815, 12, 10));
        let mut member = Member::new("tree-1".to_string(), input, &user).unwrap();
        let before = member.clone();

        let update = MemberUpdate {
            first_name: Some("Augusta".to_string()),
            death_date: Some(date(1790, 1, 1)),
            ..Default::default()
        };
        assert!(member.apply_update(update, &user).is_err());
        assert_eq!(member, before);

        let update = MemberUpdate {
            first_name: Some("Augusta".to_string()),
            ..Default::default()
        };
        member.apply_update(update, &user).unwrap();
        assert_eq!(member.first_name, "Augusta");
        assert_eq!(member.version, 0);
        assert_eq!(member.updated_by, user.user_id);
    }

    #[test]
    fn member_json_uses_camel_case_and_tolerates_missing_sets() {
        let json = r#"{
            "id": "m1",
            "treeId": "t1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "gender": "female",
            "spouseId": "m2"
        }"#;
        let member: Member = serde_json::from_str(json).unwrap();
        assert!(member.parents.is_empty());
        assert_eq!(member.spouse_id.as_deref(), Some("m2"));
        assert_eq!(member.created_by, "legacy-user");

        let value = serde_json::to_value(&member).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert!(value.get("birthDate").is_none());
    }
}
