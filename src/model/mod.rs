pub mod common;
pub mod family_tree;
pub mod layout;
pub mod member;
pub mod patch;
pub mod relationship;
pub mod user_context;

pub use common::*;
pub use family_tree::*;
pub use layout::*;
pub use member::*;
pub use patch::*;
pub use relationship::*;
pub use user_context::*;
