use log::{debug, info};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{FamilyError, Result};
use crate::logic::{BidirectionalSync, StaleStateError};
use crate::model::{apply_patches, FamilyTree, Id, Member, MemberPatch};
use crate::store::traits::{FamilyTreeStore, MemberStore, RelationshipCommit};

/// In-process store: each write takes the lock once, stages on a copy and
/// swaps it in, so a failed commit leaves nothing behind.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    trees: RwLock<HashMap<Id, FamilyTree>>,
    /// Members per tree id, in insertion order
    members: RwLock<HashMap<Id, Vec<Member>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree_exists(&self, tree_id: &Id) -> bool {
        self.trees.read().contains_key(tree_id)
    }
}

#[async_trait::async_trait]
impl FamilyTreeStore for InMemoryStore {
    async fn get_tree(&self, id: &Id) -> Result<Option<FamilyTree>> {
        Ok(self.trees.read().get(id).cloned())
    }

    async fn list_trees(&self) -> Result<Vec<FamilyTree>> {
        let mut trees: Vec<FamilyTree> = self.trees.read().values().cloned().collect();
        trees.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(trees)
    }

    async fn upsert_tree(&self, tree: FamilyTree) -> Result<()> {
        self.members.write().entry(tree.id.clone()).or_default();
        self.trees.write().insert(tree.id.clone(), tree);
        Ok(())
    }

    async fn delete_tree(&self, id: &Id) -> Result<bool> {
        let removed = self.trees.write().remove(id).is_some();
        if let Some(members) = self.members.write().remove(id) {
            info!("Deleted family tree {} with {} members", id, members.len());
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl MemberStore for InMemoryStore {
    async fn list_members(&self, tree_id: &Id) -> Result<Vec<Member>> {
        if !self.tree_exists(tree_id) {
            return Err(FamilyError::TreeNotFound(tree_id.clone()));
        }
        Ok(self
            .members
            .read()
            .get(tree_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_member(&self, tree_id: &Id, member_id: &Id) -> Result<Option<Member>> {
        Ok(self
            .members
            .read()
            .get(tree_id)
            .and_then(|members| members.iter().find(|m| &m.id == member_id))
            .cloned())
    }

    async fn insert_member(&self, member: Member) -> Result<()> {
        if !self.tree_exists(&member.tree_id) {
            return Err(FamilyError::TreeNotFound(member.tree_id.clone()));
        }
        let mut all = self.members.write();
        let members = all.entry(member.tree_id.clone()).or_default();
        if members.iter().any(|m| m.id == member.id) {
            return Err(FamilyError::Internal(anyhow::anyhow!(
                "member '{}' already exists",
                member.id
            )));
        }
        debug!("Inserted member {} into tree {}", member.id, member.tree_id);
        members.push(member);
        Ok(())
    }

    async fn update_member_profile(&self, member: Member) -> Result<Member> {
        let mut all = self.members.write();
        let stored = all
            .get_mut(&member.tree_id)
            .and_then(|members| members.iter_mut().find(|m| m.id == member.id))
            .ok_or_else(|| FamilyError::member_not_found(&member.tree_id, &member.id))?;

        let relationships = stored.relationship_state();
        let mut updated = member;
        updated.set_relationship_state(relationships);
        updated.version = stored.version + 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn commit_relationship_edit(
        &self,
        tree_id: &Id,
        commit: RelationshipCommit,
    ) -> Result<Vec<Member>> {
        let mut all = self.members.write();
        let members = all
            .get_mut(tree_id)
            .ok_or_else(|| FamilyError::TreeNotFound(tree_id.clone()))?;

        let primary = members
            .iter()
            .find(|m| m.id == commit.member_id)
            .ok_or_else(|| FamilyError::member_not_found(tree_id, &commit.member_id))?;
        BidirectionalSync::ensure_fresh(primary, &commit.old_state, None)?;

        for (id, version) in &commit.read_versions {
            if let Some(current) = members.iter().find(|m| &m.id == id) {
                if current.version != *version {
                    return Err(StaleStateError {
                        member_id: current.id.clone(),
                        current_version: current.version,
                        current_state: current.relationship_state(),
                    }
                    .into());
                }
            }
        }

        let changed = BidirectionalSync::apply_edit(
            members,
            &commit.member_id,
            &commit.new_state,
            &commit.patches,
        )?;

        let mut updated = Vec::with_capacity(changed.len());
        for member in members.iter_mut().filter(|m| changed.contains(&m.id)) {
            member.touch(&commit.updated_by);
            updated.push(member.clone());
        }
        debug!(
            "Committed relationship edit on {}: {} patches, {} members changed",
            commit.member_id,
            commit.patches.len(),
            updated.len()
        );
        Ok(updated)
    }

    async fn delete_member(
        &self,
        tree_id: &Id,
        member_id: &Id,
        deleted_by: &str,
    ) -> Result<(Member, Vec<MemberPatch>)> {
        let mut all = self.members.write();
        let members = all
            .get_mut(tree_id)
            .ok_or_else(|| FamilyError::TreeNotFound(tree_id.clone()))?;
        let position = members
            .iter()
            .position(|m| &m.id == member_id)
            .ok_or_else(|| FamilyError::member_not_found(tree_id, member_id))?;

        // Cleanup is derived under the lock so no reference can slip in meanwhile
        let cleanup = BidirectionalSync::deletion_cleanup(members, member_id);
        let mut staged = members.clone();
        let changed = apply_patches(&mut staged, &cleanup)?;
        let removed = staged.remove(position);
        for member in staged.iter_mut().filter(|m| changed.contains(&m.id)) {
            member.touch(deleted_by);
        }
        *members = staged;

        info!(
            "Deleted member {} from tree {} ({} references cleaned up)",
            member_id,
            tree_id,
            cleanup.len()
        );
        Ok((removed, cleanup))
    }
}
