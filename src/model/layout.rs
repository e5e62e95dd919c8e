use crate::model::Id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Geometry knobs for the generation layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal slot reserved for one member
    pub node_width: f64,
    /// Gap between the two members of a couple
    pub spouse_gap: f64,
    /// Gap between neighbouring units; larger than `spouse_gap`
    pub unit_gap: f64,
    /// Distance between generation bands
    pub vertical_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 160.0,
            spouse_gap: 20.0,
            unit_gap: 60.0,
            vertical_spacing: 150.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub generation: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Directed, from the parent's band to the child's band
    ParentChild,
    /// Undirected, between two members of one band
    Spouse,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub source: Id,
    pub target: Id,
    pub kind: EdgeKind,
}

/// Something the layout tolerated instead of failing on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutWarning {
    DanglingReference {
        #[serde(rename = "memberId")]
        member_id: Id,
        #[serde(rename = "missingId")]
        missing_id: Id,
    },
    CycleDetected {
        #[serde(rename = "memberId")]
        member_id: Id,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyLayout {
    pub positions: BTreeMap<Id, Position>,
    pub edges: Vec<LayoutEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LayoutWarning>,
}

impl FamilyLayout {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.edges.is_empty()
    }

    pub fn generation_of(&self, member_id: &str) -> Option<usize> {
        self.positions.get(member_id).map(|p| p.generation)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &LayoutEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}
