use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{FamilyTree, Id, Member, MemberPatch, RelationshipState};

/// Everything needed to commit one validated relationship edit.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipCommit {
    pub member_id: Id,
    /// State the edit was computed against
    pub old_state: RelationshipState,
    pub new_state: RelationshipState,
    pub patches: Vec<MemberPatch>,
    /// Versions of every member the edit read, the primary included
    pub read_versions: BTreeMap<Id, u64>,
    pub updated_by: String,
}

#[async_trait::async_trait]
pub trait FamilyTreeStore: Send + Sync {
    async fn get_tree(&self, id: &Id) -> Result<Option<FamilyTree>>;
    async fn list_trees(&self) -> Result<Vec<FamilyTree>>;
    async fn upsert_tree(&self, tree: FamilyTree) -> Result<()>;
    /// Delete a tree together with its members
    async fn delete_tree(&self, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait MemberStore: Send + Sync {
    /// Members of a tree in insertion order
    async fn list_members(&self, tree_id: &Id) -> Result<Vec<Member>>;
    async fn get_member(&self, tree_id: &Id, member_id: &Id) -> Result<Option<Member>>;
    async fn insert_member(&self, member: Member) -> Result<()>;
    /// Replace profile fields; relationship pointers are kept as stored
    async fn update_member_profile(&self, member: Member) -> Result<Member>;
    /// Apply the primary update and every patch atomically.
    ///
    /// Fails with a stale-state error, writing nothing, when any member in
    /// `read_versions` (or the primary's relationship state) changed since it
    /// was read. Returns every member that changed.
    async fn commit_relationship_edit(
        &self,
        tree_id: &Id,
        commit: RelationshipCommit,
    ) -> Result<Vec<Member>>;
    /// Remove a member and strip every reference to it, atomically.
    ///
    /// Returns the removed member and the cleanup patches that were applied.
    async fn delete_member(
        &self,
        tree_id: &Id,
        member_id: &Id,
        deleted_by: &str,
    ) -> Result<(Member, Vec<MemberPatch>)>;
}

pub trait Store: FamilyTreeStore + MemberStore + Send + Sync {}
impl<T: FamilyTreeStore + MemberStore + Send + Sync> Store for T {}
