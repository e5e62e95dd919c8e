use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ErrorKind, FamilyError, Result};
use crate::logic::{BidirectionalSync, LayoutEngine, RelationshipValidator, ValidationError};
use crate::model::{
    derive_relationships, FamilyLayout, FamilyTree, Id, LayoutConfig, Member, MemberPatch,
    MemberProfileError, MemberUpdate, NewFamilyTree, NewMember, Relationship, RelationshipState,
    UserContext,
};
use crate::store::{RelationshipCommit, Store};

/// Request body for a relationship edit on one member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEditRequest {
    /// The caller's view of the member's relationships; the stored state when omitted
    #[serde(default)]
    pub old_state: Option<RelationshipState>,
    #[serde(default)]
    pub expected_version: Option<u64>,
    pub proposed: RelationshipState,
}

impl RelationshipEditRequest {
    pub fn new(proposed: RelationshipState) -> Self {
        Self {
            old_state: None,
            expected_version: None,
            proposed,
        }
    }

    pub fn with_old_state(mut self, old_state: RelationshipState) -> Self {
        self.old_state = Some(old_state);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEditOutcome {
    pub member: Member,
    /// Every member the commit changed, the edited one included
    pub updated_members: Vec<Member>,
    pub patches: Vec<MemberPatch>,
}

/// Result of a dry-run validation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPreview {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub patches: Vec<MemberPatch>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDeletion {
    pub member: Member,
    pub cleanup: Vec<MemberPatch>,
}

/// Tree, member and relationship operations against a store.
///
/// Every relationship mutation, whatever its entry point, goes through
/// [`FamilyOperations::plan_relationship_edit`] before it reaches the store.
pub struct FamilyOperations;

impl FamilyOperations {
    pub async fn list_trees<S: Store>(store: &S) -> Result<Vec<FamilyTree>> {
        store.list_trees().await
    }

    pub async fn create_tree<S: Store>(
        store: &S,
        input: NewFamilyTree,
        user: &UserContext,
    ) -> Result<FamilyTree> {
        if input.name.trim().is_empty() {
            return Err(MemberProfileError::EmptyName { field: "name" }.into());
        }
        let tree = FamilyTree::new(input.name.trim().to_string(), input.description, user);
        store.upsert_tree(tree.clone()).await?;
        info!("Created family tree {} ({}) for {}", tree.id, tree.name, user.label());
        Ok(tree)
    }

    pub async fn get_tree<S: Store>(store: &S, tree_id: &Id) -> Result<FamilyTree> {
        store
            .get_tree(tree_id)
            .await?
            .ok_or_else(|| FamilyError::TreeNotFound(tree_id.clone()))
    }

    pub async fn delete_tree<S: Store>(store: &S, tree_id: &Id) -> Result<()> {
        if store.delete_tree(tree_id).await? {
            Ok(())
        } else {
            Err(FamilyError::TreeNotFound(tree_id.clone()))
        }
    }

    pub async fn list_members<S: Store>(store: &S, tree_id: &Id) -> Result<Vec<Member>> {
        store.list_members(tree_id).await
    }

    pub async fn get_member<S: Store>(store: &S, tree_id: &Id, member_id: &Id) -> Result<Member> {
        Self::get_tree(store, tree_id).await?;
        store
            .get_member(tree_id, member_id)
            .await?
            .ok_or_else(|| FamilyError::member_not_found(tree_id, member_id))
    }

    /// Create a member with empty relationship sets
    pub async fn create_member<S: Store>(
        store: &S,
        tree_id: &Id,
        input: NewMember,
        user: &UserContext,
    ) -> Result<Member> {
        Self::get_tree(store, tree_id).await?;
        let member = Member::new(tree_id.clone(), input, user)?;
        store.insert_member(member.clone()).await?;
        info!("Created member {} ({}) in tree {}", member.id, member.full_name(), tree_id);
        Ok(member)
    }

    pub async fn update_member_profile<S: Store>(
        store: &S,
        tree_id: &Id,
        member_id: &Id,
        update: MemberUpdate,
        user: &UserContext,
    ) -> Result<Member> {
        let mut member = Self::get_member(store, tree_id, member_id).await?;
        member.apply_update(update, user)?;
        store.update_member_profile(member).await
    }

    pub async fn delete_member<S: Store>(
        store: &S,
        tree_id: &Id,
        member_id: &Id,
        user: &UserContext,
    ) -> Result<MemberDeletion> {
        Self::get_tree(store, tree_id).await?;
        let (member, cleanup) = store.delete_member(tree_id, member_id, &user.user_id).await?;
        Ok(MemberDeletion { member, cleanup })
    }

    /// Decide whether `member_id` may move from `old_state` to `proposed`, and
    /// if so which patches keep the other ends in sync.
    pub fn plan_relationship_edit(
        members: &[Member],
        member_id: &str,
        old_state: &RelationshipState,
        proposed: &RelationshipState,
    ) -> Result<Vec<MemberPatch>> {
        if let Some(missing) = proposed
            .referenced_ids()
            .find(|id| !members.iter().any(|m| &&m.id == id))
        {
            return Err(FamilyError::UnknownMember(missing.clone()));
        }
        RelationshipValidator::validate_member_edit(members, member_id, proposed)?;
        check_added_children(members, member_id, old_state, proposed)?;
        Ok(BidirectionalSync::compute_patches(
            members, member_id, old_state, proposed,
        ))
    }

    /// Validate an edit against the stored state without committing it
    pub async fn preview_relationship_edit<S: Store>(
        store: &S,
        tree_id: &Id,
        member_id: &Id,
        proposed: &RelationshipState,
    ) -> Result<EditPreview> {
        let members = store.list_members(tree_id).await?;
        let current = find_member(&members, tree_id, member_id)?;
        let old_state = current.relationship_state();

        match Self::plan_relationship_edit(&members, member_id, &old_state, proposed) {
            Ok(patches) => Ok(EditPreview {
                valid: true,
                code: None,
                message: None,
                patches,
            }),
            Err(e) if e.kind() == ErrorKind::Rejected => Ok(EditPreview {
                valid: false,
                code: Some(e.code().to_string()),
                message: Some(e.to_string()),
                patches: Vec::new(),
            }),
            Err(e) => Err(e),
        }
    }

    pub async fn edit_relationships<S: Store>(
        store: &S,
        tree_id: &Id,
        member_id: &Id,
        request: RelationshipEditRequest,
        user: &UserContext,
    ) -> Result<RelationshipEditOutcome> {
        let members = store.list_members(tree_id).await?;
        Self::commit_edit(store, tree_id, &members, member_id, request, user).await
    }

    /// Add one edge record by turning it into an edit on `member2`
    pub async fn add_relationship<S: Store>(
        store: &S,
        tree_id: &Id,
        relationship: &Relationship,
        user: &UserContext,
    ) -> Result<RelationshipEditOutcome> {
        let members = store.list_members(tree_id).await?;
        let (target_id, proposed) = relationship.to_proposed_edit(&members)?;
        debug!(
            "Edge {:?} {} -> {} becomes an edit on {}",
            relationship.relationship_type,
            relationship.member1_id,
            relationship.member2_id,
            target_id
        );
        let request = RelationshipEditRequest::new(proposed);
        Self::commit_edit(store, tree_id, &members, &target_id, request, user).await
    }

    pub async fn list_relationships<S: Store>(
        store: &S,
        tree_id: &Id,
    ) -> Result<Vec<Relationship>> {
        let members = store.list_members(tree_id).await?;
        Ok(derive_relationships(&members))
    }

    pub async fn compute_layout<S: Store>(
        store: &S,
        tree_id: &Id,
        config: &LayoutConfig,
    ) -> Result<FamilyLayout> {
        let members = store.list_members(tree_id).await?;
        Ok(LayoutEngine::compute_layout(&members, config))
    }

    async fn commit_edit<S: Store>(
        store: &S,
        tree_id: &Id,
        members: &[Member],
        member_id: &Id,
        request: RelationshipEditRequest,
        user: &UserContext,
    ) -> Result<RelationshipEditOutcome> {
        let current = find_member(members, tree_id, member_id)?;
        let old_state = request
            .old_state
            .unwrap_or_else(|| current.relationship_state());
        BidirectionalSync::ensure_fresh(current, &old_state, request.expected_version)?;

        let patches =
            Self::plan_relationship_edit(members, member_id, &old_state, &request.proposed)?;

        let read_ids = read_set(members, member_id, &old_state, &request.proposed, &patches);
        let read_versions: BTreeMap<Id, u64> = members
            .iter()
            .filter(|m| read_ids.contains(m.id.as_str()))
            .map(|m| (m.id.clone(), m.version))
            .collect();

        let commit = RelationshipCommit {
            member_id: member_id.clone(),
            old_state,
            new_state: request.proposed,
            patches: patches.clone(),
            read_versions,
            updated_by: user.user_id.clone(),
        };
        let updated_members = store.commit_relationship_edit(tree_id, commit).await?;
        info!(
            "Committed relationship edit on {} in tree {}: {} patches, {} members updated",
            member_id,
            tree_id,
            patches.len(),
            updated_members.len()
        );

        let member = updated_members
            .iter()
            .find(|m| &m.id == member_id)
            .cloned()
            .unwrap_or_else(|| current.clone());
        Ok(RelationshipEditOutcome {
            member,
            updated_members,
            patches,
        })
    }
}

/// A child gained by `parent_id` must not be married to one of its other
/// children, whether that spouse is a child already or becomes one in this edit.
fn check_added_children(
    members: &[Member],
    parent_id: &str,
    old_state: &RelationshipState,
    proposed: &RelationshipState,
) -> Result<()> {
    for child_id in proposed.children.difference(&old_state.children) {
        let Some(spouse_id) = members
            .iter()
            .find(|m| &m.id == child_id)
            .and_then(|child| child.spouse_id.as_ref())
        else {
            continue;
        };
        let spouse_is_child = proposed.children.contains(spouse_id)
            || members
                .iter()
                .find(|m| &m.id == spouse_id)
                .is_some_and(|spouse| spouse.parents.contains(parent_id));
        if spouse_is_child {
            return Err(ValidationError::SiblingSpouse {
                spouse_id: spouse_id.clone(),
                shared_parent_id: parent_id.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Ids whose current state an edit depends on
fn read_set<'a>(
    members: &'a [Member],
    member_id: &'a str,
    old_state: &'a RelationshipState,
    proposed: &'a RelationshipState,
    patches: &'a [MemberPatch],
) -> BTreeSet<&'a str> {
    let mut ids: BTreeSet<&str> = BTreeSet::new();
    ids.insert(member_id);
    ids.extend(proposed.referenced_ids().map(String::as_str));
    ids.extend(old_state.referenced_ids().map(String::as_str));
    ids.extend(patches.iter().map(|p| p.member_id.as_str()));
    // Spouses of new children feed the sibling check
    let spouses = members
        .iter()
        .filter(|m| proposed.children.contains(&m.id))
        .filter_map(|m| m.spouse_id.as_deref());
    ids.extend(spouses);
    ids
}

fn find_member<'a>(members: &'a [Member], tree_id: &Id, member_id: &str) -> Result<&'a Member> {
    members
        .iter()
        .find(|m| m.id == member_id)
        .ok_or_else(|| FamilyError::member_not_found(tree_id, member_id))
}
