use crate::model::{Id, Member};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchField {
    Parents,
    Children,
    SpouseId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Set union on `parents`/`children`
    Add,
    /// Set difference on `parents`/`children`; compare-and-clear on `spouseId`
    Remove,
    /// Assign `spouseId` (a `None` value clears it)
    Set,
}

/// A field-level change to be applied to one member by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub member_id: Id,
    pub field: PatchField,
    pub operation: PatchOp,
    pub value: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("patch targets unknown member '{0}'")]
    UnknownMember(Id),
    #[error("operation {operation:?} is not supported on field {field:?}")]
    UnsupportedOperation { field: PatchField, operation: PatchOp },
    #[error("operation {operation:?} on field {field:?} requires a value")]
    MissingValue { field: PatchField, operation: PatchOp },
}

impl MemberPatch {
    pub fn add_parent(member_id: &str, parent_id: &str) -> Self {
        Self::with_value(member_id, PatchField::Parents, PatchOp::Add, parent_id)
    }

    pub fn remove_parent(member_id: &str, parent_id: &str) -> Self {
        Self::with_value(member_id, PatchField::Parents, PatchOp::Remove, parent_id)
    }

    pub fn add_child(member_id: &str, child_id: &str) -> Self {
        Self::with_value(member_id, PatchField::Children, PatchOp::Add, child_id)
    }

    pub fn remove_child(member_id: &str, child_id: &str) -> Self {
        Self::with_value(member_id, PatchField::Children, PatchOp::Remove, child_id)
    }

    pub fn set_spouse(member_id: &str, spouse_id: &str) -> Self {
        Self::with_value(member_id, PatchField::SpouseId, PatchOp::Set, spouse_id)
    }

    /// Clear `spouseId` only while it still equals `expected`
    pub fn clear_spouse_if(member_id: &str, expected: &str) -> Self {
        Self::with_value(member_id, PatchField::SpouseId, PatchOp::Remove, expected)
    }

    fn with_value(member_id: &str, field: PatchField, operation: PatchOp, value: &str) -> Self {
        Self {
            member_id: member_id.to_string(),
            field,
            operation,
            value: Some(value.to_string()),
        }
    }

    fn check(&self) -> Result<(), PatchError> {
        let (field, operation) = (self.field, self.operation);
        match (field, operation) {
            (PatchField::Parents | PatchField::Children, PatchOp::Set)
            | (PatchField::SpouseId, PatchOp::Add) => {
                Err(PatchError::UnsupportedOperation { field, operation })
            }
            (_, PatchOp::Add | PatchOp::Remove) if self.value.is_none() => {
                Err(PatchError::MissingValue { field, operation })
            }
            _ => Ok(()),
        }
    }

    /// Apply to `member`, returning whether anything changed.
    pub fn apply_to(&self, member: &mut Member) -> Result<bool, PatchError> {
        self.check()?;
        let changed = match (self.field, self.operation, self.value.as_ref()) {
            (PatchField::Parents, PatchOp::Add, Some(id)) => member.parents.insert(id.clone()),
            (PatchField::Parents, PatchOp::Remove, Some(id)) => member.parents.remove(id),
            (PatchField::Children, PatchOp::Add, Some(id)) => member.children.insert(id.clone()),
            (PatchField::Children, PatchOp::Remove, Some(id)) => member.children.remove(id),
            (PatchField::SpouseId, PatchOp::Set, value) => {
                let changed = member.spouse_id.as_ref() != value;
                member.spouse_id = value.cloned();
                changed
            }
            (PatchField::SpouseId, PatchOp::Remove, Some(expected)) => {
                if member.spouse_id.as_ref() == Some(expected) {
                    member.spouse_id = None;
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        Ok(changed)
    }
}

/// Apply a patch list to `members`, all or nothing.
///
/// Every patch is checked before anything is written, so an error leaves
/// `members` untouched. Returns the ids of members that actually changed.
pub fn apply_patches(
    members: &mut [Member],
    patches: &[MemberPatch],
) -> Result<BTreeSet<Id>, PatchError> {
    let index: HashMap<Id, usize> = members
        .iter()
        .enumerate()
        .map(|(i, m)| (m.id.clone(), i))
        .collect();

    for patch in patches {
        patch.check()?;
        if !index.contains_key(&patch.member_id) {
            return Err(PatchError::UnknownMember(patch.member_id.clone()));
        }
    }

    let mut changed = BTreeSet::new();
    for patch in patches {
        let member = &mut members[index[&patch.member_id]];
        if patch.apply_to(member)? {
            changed.insert(patch.member_id.clone());
        }
    }
    Ok(changed)
}
