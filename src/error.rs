use thiserror::Error;

use crate::logic::{StaleStateError, ValidationError};
use crate::model::{Id, MemberProfileError, PatchError, RelationshipEdgeError};

pub type Result<T> = std::result::Result<T, FamilyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Rejected,
    Conflict,
    NotFound,
    Internal,
}

/// Every way a family-tree operation can be turned down.
#[derive(Debug, Error)]
pub enum FamilyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Profile(#[from] MemberProfileError),
    #[error(transparent)]
    Edge(#[from] RelationshipEdgeError),
    #[error(transparent)]
    StaleState(#[from] StaleStateError),
    #[error("family tree '{0}' not found")]
    TreeNotFound(Id),
    #[error("member '{member_id}' not found in family tree '{tree_id}'")]
    MemberNotFound { tree_id: Id, member_id: Id },
    #[error("referenced member '{0}' is not part of this family tree")]
    UnknownMember(Id),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FamilyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FamilyError::Validation(_)
            | FamilyError::Profile(_)
            | FamilyError::Edge(_)
            | FamilyError::UnknownMember(_) => ErrorKind::Rejected,
            FamilyError::StaleState(_) => ErrorKind::Conflict,
            FamilyError::TreeNotFound(_) | FamilyError::MemberNotFound { .. } => {
                ErrorKind::NotFound
            }
            FamilyError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            FamilyError::Validation(e) => e.code(),
            FamilyError::Profile(e) => e.code(),
            FamilyError::Edge(e) => e.code(),
            FamilyError::StaleState(_) => "stale_state",
            FamilyError::TreeNotFound(_) => "tree_not_found",
            FamilyError::MemberNotFound { .. } => "member_not_found",
            FamilyError::UnknownMember(_) => "unknown_member",
            FamilyError::Internal(_) => "internal_error",
        }
    }

    pub fn member_not_found(tree_id: &str, member_id: &str) -> Self {
        FamilyError::MemberNotFound {
            tree_id: tree_id.to_string(),
            member_id: member_id.to_string(),
        }
    }
}

impl From<PatchError> for FamilyError {
    fn from(value: PatchError) -> Self {
        match value {
            PatchError::UnknownMember(id) => FamilyError::UnknownMember(id),
            other => FamilyError::Internal(anyhow::anyhow!(other)),
        }
    }
}
