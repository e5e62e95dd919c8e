use serde::Serialize;
use thiserror::Error;

use crate::model::{Id, Member, RelationshipState};

/// Why a relationship edit was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ValidationError {
    #[error("member '{member_id}' cannot be their own parent, child or spouse")]
    SelfReference { member_id: Id },
    #[error("member '{other_id}' cannot be both a parent and a child")]
    ParentChildOverlap { other_id: Id },
    #[error("spouse '{spouse_id}' cannot also be a parent or child")]
    SpouseRelationConflict { spouse_id: Id },
    #[error("spouse '{spouse_id}' shares parent '{shared_parent_id}'")]
    SiblingSpouse {
        spouse_id: Id,
        shared_parent_id: Id,
    },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::SelfReference { .. } => "self_reference",
            ValidationError::ParentChildOverlap { .. } => "parent_child_overlap",
            ValidationError::SpouseRelationConflict { .. } => "spouse_relation_conflict",
            ValidationError::SiblingSpouse { .. } => "sibling_spouse",
        }
    }
}

/// Consistency rules every relationship edit goes through before it is committed
pub struct RelationshipValidator;

impl RelationshipValidator {
    /// Check a proposed relationship state for `member_id`.
    ///
    /// Rules run in a fixed order and the first failure wins:
    /// self-reference, parent/child overlap, spouse that is also a parent or
    /// child, and spouse sharing a direct parent. Only direct shared parents
    /// count as siblings.
    pub fn validate_member_edit(
        members: &[Member],
        member_id: &str,
        proposed: &RelationshipState,
    ) -> Result<(), ValidationError> {
        if proposed.parents.contains(member_id)
            || proposed.children.contains(member_id)
            || proposed.spouse_id.as_deref() == Some(member_id)
        {
            return Err(ValidationError::SelfReference {
                member_id: member_id.to_string(),
            });
        }

        if let Some(other_id) = proposed.parents.intersection(&proposed.children).next() {
            return Err(ValidationError::ParentChildOverlap {
                other_id: other_id.clone(),
            });
        }

        let Some(spouse_id) = proposed.spouse_id.as_ref() else {
            return Ok(());
        };

        if proposed.parents.contains(spouse_id) || proposed.children.contains(spouse_id) {
            return Err(ValidationError::SpouseRelationConflict {
                spouse_id: spouse_id.clone(),
            });
        }

        if let Some(spouse) = members.iter().find(|m| &m.id == spouse_id) {
            if let Some(shared) = spouse.parents.intersection(&proposed.parents).next() {
                return Err(ValidationError::SiblingSpouse {
                    spouse_id: spouse_id.clone(),
                    shared_parent_id: shared.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, NewMember, UserContext};

    fn member(id: &str) -> Member {
        let mut m = Member::new(
            "tree".to_string(),
            NewMember::new(id, "Test", Gender::Other),
            &UserContext::system(),
        )
        .unwrap();
        m.id = id.to_string();
        m
    }

    #[test]
    fn rejects_self_reference() {
        let members = vec![member("a")];
        for proposed in [
            RelationshipState::new().with_parents(["a"]),
            RelationshipState::new().with_children(["a"]),
            RelationshipState::new().with_spouse("a"),
        ] {
            let err = RelationshipValidator::validate_member_edit(&members, "a", &proposed)
                .unwrap_err();
            assert_eq!(err.code(), "self_reference");
        }
    }

    #[test]
    fn rejects_same_member_as_parent_and_child() {
        let members = vec![member("a"), member("b")];
        let proposed = RelationshipState::new()
            .with_parents(["b"])
            .with_children(["b"]);

        assert_eq!(
            RelationshipValidator::validate_member_edit(&members, "a", &proposed),
            Err(ValidationError::ParentChildOverlap {
                other_id: "b".to_string()
            })
        );
    }

    #[test]
    fn rejects_spouse_that_is_parent_or_child() {
        let members = vec![member("a"), member("b")];
        let as_parent = RelationshipState::new().with_parents(["b"]).with_spouse("b");
        let as_child = RelationshipState::new().with_children(["b"]).with_spouse("b");

        for proposed in [as_parent, as_child] {
            let err = RelationshipValidator::validate_member_edit(&members, "a", &proposed)
                .unwrap_err();
            assert_eq!(
                err,
                ValidationError::SpouseRelationConflict {
                    spouse_id: "b".to_string()
                }
            );
        }
    }

    #[test]
    fn rejects_sibling_as_spouse() {
        let mut a = member("a");
        let mut b = member("b");
        a.parents.insert("p".to_string());
        b.parents.insert("p".to_string());
        let members = vec![member("p"), a, b];

        let proposed = RelationshipState::new().with_parents(["p"]).with_spouse("b");
        let err =
            RelationshipValidator::validate_member_edit(&members, "a", &proposed).unwrap_err();
        assert_eq!(
            err,
            ValidationError::SiblingSpouse {
                spouse_id: "b".to_string(),
                shared_parent_id: "p".to_string(),
            }
        );
    }

    #[test]
    fn cousins_are_not_siblings() {
        let mut a = member("a");
        let mut b = member("b");
        a.parents.insert("p1".to_string());
        b.parents.insert("p2".to_string());
        let members = vec![a, b];

        let proposed = RelationshipState::new().with_parents(["p1"]).with_spouse("b");
        assert!(RelationshipValidator::validate_member_edit(&members, "a", &proposed).is_ok());
    }

    #[test]
    fn first_failing_rule_wins() {
        let members = vec![member("a"), member("b")];
        // Self-reference and overlap at once: self-reference is checked first
        let proposed = RelationshipState::new()
            .with_parents(["a", "b"])
            .with_children(["b"]);
        let err =
            RelationshipValidator::validate_member_edit(&members, "a", &proposed).unwrap_err();
        assert_eq!(err.code(), "self_reference");
    }

    #[test]
    fn verdict_is_deterministic() {
        let mut b = member("b");
        b.parents.insert("p".to_string());
        let members = vec![member("a"), b, member("p")];
        let proposed = RelationshipState::new().with_parents(["p"]).with_spouse("b");

        let first = RelationshipValidator::validate_member_edit(&members, "a", &proposed);
        for _ in 0..10 {
            assert_eq!(
                RelationshipValidator::validate_member_edit(&members, "a", &proposed),
                first
            );
        }
    }

    #[test]
    fn error_serializes_with_kind_tag() {
        let err = ValidationError::SelfReference {
            member_id: "a".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "self_reference");
        assert_eq!(json["memberId"], "a");
    }
}
