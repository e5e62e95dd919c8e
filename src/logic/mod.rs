pub mod family_ops;
pub mod generation;
pub mod graph;
pub mod layout;
pub mod sync;
pub mod validate;

pub use family_ops::*;
pub use generation::{assign_generations, GenerationAssignment};
pub use graph::FamilyGraph;
pub use layout::*;
pub use sync::*;
pub use validate::*;
