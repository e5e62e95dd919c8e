use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::model::{apply_patches, Id, Member, MemberPatch, PatchError, RelationshipState};

/// A pointer that has no matching pointer on the other side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SymmetryViolation {
    ParentWithoutChild { member_id: Id, parent_id: Id },
    ChildWithoutParent { member_id: Id, child_id: Id },
    SpouseNotMutual { member_id: Id, spouse_id: Id },
    SelfReference { member_id: Id },
}

/// The caller's view of a member no longer matches the stored one.
///
/// Carries the current state so the caller can retry against it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("member '{member_id}' changed since it was read (now at version {current_version})")]
pub struct StaleStateError {
    pub member_id: Id,
    pub current_version: u64,
    pub current_state: RelationshipState,
}

/// Keeps parent/child/spouse pointers consistent on both ends.
///
/// Everything here is a pure computation over a member snapshot; the store
/// decides how the resulting patches are committed.
pub struct BidirectionalSync;

impl BidirectionalSync {
    /// Patches needed on *other* members when `member_id` moves from
    /// `old_state` to `new_state`.
    ///
    /// Spouse links are cleared before new ones are set. A previous spouse is
    /// only cleared while it still points back, and so is the new spouse's
    /// previous partner. Members missing from the snapshot get no patches.
    pub fn compute_patches(
        members: &[Member],
        member_id: &str,
        old_state: &RelationshipState,
        new_state: &RelationshipState,
    ) -> Vec<MemberPatch> {
        let lookup: HashMap<&str, &Member> =
            members.iter().map(|m| (m.id.as_str(), m)).collect();
        let present = |id: &Id| lookup.contains_key(id.as_str());
        let mut patches = Vec::new();

        for parent_id in new_state.parents.difference(&old_state.parents) {
            if present(parent_id) {
                patches.push(MemberPatch::add_child(parent_id, member_id));
            }
        }
        for parent_id in old_state.parents.difference(&new_state.parents) {
            if present(parent_id) {
                patches.push(MemberPatch::remove_child(parent_id, member_id));
            }
        }
        for child_id in new_state.children.difference(&old_state.children) {
            if present(child_id) {
                patches.push(MemberPatch::add_parent(child_id, member_id));
            }
        }
        for child_id in old_state.children.difference(&new_state.children) {
            if present(child_id) {
                patches.push(MemberPatch::remove_parent(child_id, member_id));
            }
        }

        if old_state.spouse_id != new_state.spouse_id {
            let points_to = |id: &str, target: &str| {
                lookup
                    .get(id)
                    .is_some_and(|m| m.spouse_id.as_deref() == Some(target))
            };

            if let Some(old_spouse) = old_state.spouse_id.as_deref() {
                if points_to(old_spouse, member_id) {
                    patches.push(MemberPatch::clear_spouse_if(old_spouse, member_id));
                }
            }

            if let Some(new_spouse) = new_state.spouse_id.as_deref() {
                if let Some(spouse) = lookup.get(new_spouse) {
                    if let Some(previous) = spouse.spouse_id.as_deref() {
                        if previous != member_id && points_to(previous, new_spouse) {
                            patches.push(MemberPatch::clear_spouse_if(previous, new_spouse));
                        }
                    }
                    patches.push(MemberPatch::set_spouse(new_spouse, member_id));
                }
            }
        }

        patches
    }

    /// Reject an edit whose `old_state` (or version stamp) disagrees with `current`
    pub fn ensure_fresh(
        current: &Member,
        old_state: &RelationshipState,
        expected_version: Option<u64>,
    ) -> Result<(), StaleStateError> {
        let state = current.relationship_state();
        let version_matches = expected_version.map_or(true, |v| v == current.version);
        if state == *old_state && version_matches {
            return Ok(());
        }
        Err(StaleStateError {
            member_id: current.id.clone(),
            current_version: current.version,
            current_state: state,
        })
    }

    /// Patches stripping `deleted_id` from everyone else before it is removed
    pub fn deletion_cleanup(members: &[Member], deleted_id: &str) -> Vec<MemberPatch> {
        let mut patches = Vec::new();
        for member in members.iter().filter(|m| m.id != deleted_id) {
            if member.parents.contains(deleted_id) {
                patches.push(MemberPatch::remove_parent(&member.id, deleted_id));
            }
            if member.children.contains(deleted_id) {
                patches.push(MemberPatch::remove_child(&member.id, deleted_id));
            }
            if member.spouse_id.as_deref() == Some(deleted_id) {
                patches.push(MemberPatch::clear_spouse_if(&member.id, deleted_id));
            }
        }
        patches
    }

    /// Write the primary member's new state and its patches, all or nothing.
    ///
    /// Returns the ids of every member that changed, the primary included.
    pub fn apply_edit(
        members: &mut [Member],
        member_id: &str,
        new_state: &RelationshipState,
        patches: &[MemberPatch],
    ) -> Result<BTreeSet<Id>, PatchError> {
        let Some(position) = members.iter().position(|m| m.id == member_id) else {
            return Err(PatchError::UnknownMember(member_id.to_string()));
        };

        let mut staged = members.to_vec();
        let mut changed = apply_patches(&mut staged, patches)?;
        if staged[position].relationship_state() != *new_state {
            staged[position].set_relationship_state(new_state.clone());
            changed.insert(member_id.to_string());
        }

        members.clone_from_slice(&staged);
        Ok(changed)
    }

    /// Every pointer among `members` whose counterpart is missing.
    ///
    /// References to ids outside the snapshot are not reported here.
    pub fn check_symmetry(members: &[Member]) -> Vec<SymmetryViolation> {
        let lookup: HashMap<&str, &Member> =
            members.iter().map(|m| (m.id.as_str(), m)).collect();
        let mut violations = Vec::new();

        for member in members {
            let id = member.id.as_str();
            if member.parents.contains(id)
                || member.children.contains(id)
                || member.spouse_id.as_deref() == Some(id)
            {
                violations.push(SymmetryViolation::SelfReference {
                    member_id: member.id.clone(),
                });
            }
            for parent_id in &member.parents {
                if let Some(parent) = lookup.get(parent_id.as_str()) {
                    if !parent.children.contains(id) {
                        violations.push(SymmetryViolation::ParentWithoutChild {
                            member_id: member.id.clone(),
                            parent_id: parent_id.clone(),
                        });
                    }
                }
            }
            for child_id in &member.children {
                if let Some(child) = lookup.get(child_id.as_str()) {
                    if !child.parents.contains(id) {
                        violations.push(SymmetryViolation::ChildWithoutParent {
                            member_id: member.id.clone(),
                            child_id: child_id.clone(),
                        });
                    }
                }
            }
            if let Some(spouse_id) = &member.spouse_id {
                if let Some(spouse) = lookup.get(spouse_id.as_str()) {
                    if spouse.spouse_id.as_deref() != Some(id) {
                        violations.push(SymmetryViolation::SpouseNotMutual {
                            member_id: member.id.clone(),
                            spouse_id: spouse_id.clone(),
                        });
                    }
                }
            }
        }

        violations
    }
}
