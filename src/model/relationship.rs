use crate::model::{Id, Member, RelationshipState};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Parent,
    Child,
    Spouse,
    Sibling,
}

/// Edge view of a relationship: `member1` is the `relationship_type` of `member2`.
///
/// The member adjacency lists are authoritative; these records are derived
/// from them for display, or converted into an adjacency edit on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub member1_id: Id,
    pub member2_id: Id,
    pub relationship_type: RelationshipType,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationshipEdgeError {
    #[error("member '{0}' is not part of this family tree")]
    UnknownMember(Id),
    #[error("member '{0}' has no parents to share with a sibling")]
    NoSharedParents(Id),
}

impl RelationshipEdgeError {
    pub fn code(&self) -> &'static str {
        match self {
            RelationshipEdgeError::UnknownMember(_) => "unknown_member",
            RelationshipEdgeError::NoSharedParents(_) => "no_shared_parents",
        }
    }
}

impl Relationship {
    pub fn new(member1_id: &str, member2_id: &str, relationship_type: RelationshipType) -> Self {
        Self {
            member1_id: member1_id.to_string(),
            member2_id: member2_id.to_string(),
            relationship_type,
        }
    }

    /// Translate this edge into a proposed relationship state for `member2`.
    ///
    /// The result still has to pass the relationship validator before it is committed.
    pub fn to_proposed_edit(
        &self,
        members: &[Member],
    ) -> Result<(Id, RelationshipState), RelationshipEdgeError> {
        let find = |id: &Id| {
            members
                .iter()
                .find(|m| &m.id == id)
                .ok_or_else(|| RelationshipEdgeError::UnknownMember(id.clone()))
        };
        let member1 = find(&self.member1_id)?;
        let member2 = find(&self.member2_id)?;

        let mut proposed = member2.relationship_state();
        match self.relationship_type {
            RelationshipType::Parent => {
                proposed.parents.insert(member1.id.clone());
            }
            RelationshipType::Child => {
                proposed.children.insert(member1.id.clone());
            }
            RelationshipType::Spouse => {
                proposed.spouse_id = Some(member1.id.clone());
            }
            RelationshipType::Sibling => {
                if member1.parents.is_empty() {
                    return Err(RelationshipEdgeError::NoSharedParents(member1.id.clone()));
                }
                proposed.parents.extend(member1.parents.iter().cloned());
            }
        }
        Ok((member2.id.clone(), proposed))
    }
}

/// Derive the edge view from the adjacency lists.
///
/// One `parent` edge per parent/child pair (either side recording the link is
/// enough), one `spouse` edge per couple and one `sibling` edge per unordered
/// pair sharing a direct parent. References outside `members` are skipped.
pub fn derive_relationships(members: &[Member]) -> Vec<Relationship> {
    let known: HashSet<&str> = members.iter().map(|m| m.id.as_str()).collect();
    let linkable = |owner: &str, other: &str| owner != other && known.contains(other);

    let mut parent_links: BTreeSet<(&str, &str)> = BTreeSet::new();
    let mut couples: BTreeSet<(&str, &str)> = BTreeSet::new();
    for member in members {
        let id = member.id.as_str();
        for parent_id in member.parents.iter().filter(|p| linkable(id, p)) {
            parent_links.insert((parent_id.as_str(), id));
        }
        for child_id in member.children.iter().filter(|c| linkable(id, c)) {
            parent_links.insert((id, child_id.as_str()));
        }
        if let Some(spouse_id) = member.spouse_id.as_deref().filter(|s| linkable(id, s)) {
            couples.insert(if id < spouse_id { (id, spouse_id) } else { (spouse_id, id) });
        }
    }

    let mut children_by_parent: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for &(parent_id, child_id) in &parent_links {
        children_by_parent.entry(parent_id).or_default().insert(child_id);
    }
    let siblings: BTreeSet<(&str, &str)> = children_by_parent
        .values()
        .flat_map(|children| children.iter().copied().tuple_combinations())
        .collect();

    let parents = parent_links
        .iter()
        .map(|(p, c)| Relationship::new(p, c, RelationshipType::Parent));
    let spouses = couples
        .iter()
        .map(|(a, b)| Relationship::new(a, b, RelationshipType::Spouse));
    let sibling_edges = siblings
        .iter()
        .map(|(a, b)| Relationship::new(a, b, RelationshipType::Sibling));
    parents.chain(spouses).chain(sibling_edges).collect()
}
