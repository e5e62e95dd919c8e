use itertools::Itertools;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::logic::generation::{assign_generations, GenerationAssignment};
use crate::logic::graph::FamilyGraph;
use crate::model::{
    EdgeKind, FamilyLayout, LayoutConfig, LayoutEdge, LayoutWarning, Member, Position,
};

/// A member, or a member and their spouse, placed as one horizontal block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CoupleUnit {
    /// One or two member indices, left to right
    members: Vec<usize>,
}

impl CoupleUnit {
    fn width(&self, config: &LayoutConfig) -> f64 {
        match self.members.len() {
            2 => 2.0 * config.node_width + config.spouse_gap,
            _ => config.node_width,
        }
    }
}

/// Generation-banded layout for rendering a family tree
pub struct LayoutEngine;

impl LayoutEngine {
    /// Compute positions and edges for every member in the snapshot.
    ///
    /// Never fails: dangling references are skipped and cycles broken, both
    /// reported in `warnings`. Every member of the input gets a position.
    pub fn compute_layout(members: &[Member], config: &LayoutConfig) -> FamilyLayout {
        if members.is_empty() {
            return FamilyLayout::default();
        }

        let graph = FamilyGraph::new(members);
        let assignment = assign_generations(&graph);
        let (units, unit_of) = Self::group_couples(&graph);
        let bands = Self::assign_bands(&graph, &assignment, &units, &unit_of);
        let xs = Self::place_horizontally(&graph, &units, &bands, config);

        let mut positions = BTreeMap::new();
        for (u, unit) in units.iter().enumerate() {
            for &m in &unit.members {
                positions.insert(
                    graph.id(m).clone(),
                    Position {
                        x: xs[m],
                        y: bands[u] as f64 * config.vertical_spacing,
                        generation: bands[u],
                    },
                );
            }
        }

        let mut warnings = graph.dangling.clone();
        warnings.extend(
            assignment
                .cycle_breaks
                .iter()
                .map(|&m| LayoutWarning::CycleDetected {
                    member_id: graph.id(m).clone(),
                }),
        );
        for warning in &warnings {
            warn!("Layout tolerated bad relationship data: {:?}", warning);
        }

        let edges = Self::collect_edges(&graph);
        debug!(
            "Computed layout: {} members, {} units, {} edges",
            positions.len(),
            units.len(),
            edges.len()
        );

        FamilyLayout {
            positions,
            edges,
            warnings,
        }
    }

    /// Pair spouses into couple units in encounter order; everyone else is a single unit.
    fn group_couples(graph: &FamilyGraph<'_>) -> (Vec<CoupleUnit>, Vec<Option<usize>>) {
        let n = graph.len();
        let mut units = Vec::new();
        let mut unit_of = vec![None; n];

        for i in 0..n {
            if unit_of[i].is_some() || !graph.is_canonical(i) {
                continue;
            }
            let mut members = vec![i];
            if let Some(s) = graph.spouse[i] {
                if unit_of[s].is_none() && s != i {
                    members.push(s);
                }
            }
            for &m in &members {
                unit_of[m] = Some(units.len());
            }
            units.push(CoupleUnit { members });
        }

        (units, unit_of)
    }

    /// Band per unit.
    ///
    /// A unit starts at the lowest generation among its members that have
    /// known parents, so a spouse who married in (no parents in the tree)
    /// lines up with their partner. Units are then pushed down until every
    /// child sits strictly below its parents.
    fn assign_bands(
        graph: &FamilyGraph<'_>,
        assignment: &GenerationAssignment,
        units: &[CoupleUnit],
        unit_of: &[Option<usize>],
    ) -> Vec<usize> {
        let generations = &assignment.generations;
        let mut bands: Vec<usize> = units
            .iter()
            .map(|unit| {
                unit.members
                    .iter()
                    .filter(|&&m| !graph.parents[m].is_empty())
                    .map(|&m| generations[m])
                    .min()
                    .or_else(|| unit.members.iter().map(|&m| generations[m]).min())
                    .unwrap_or(0)
            })
            .collect();

        // Only forward edges are constrained; links closing a cycle are ignored.
        // Bounded so that couples linking two lines in opposite directions still terminate.
        for _ in 0..=units.len() {
            let mut changed = false;
            for &child in &assignment.order {
                let Some(cu) = unit_of[child] else { continue };
                for &parent in &graph.parents[child] {
                    let Some(pu) = unit_of[parent] else { continue };
                    if pu == cu || generations[parent] >= generations[child] {
                        continue;
                    }
                    if bands[cu] <= bands[pu] {
                        bands[cu] = bands[pu] + 1;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        bands
    }

    /// X coordinate per member.
    ///
    /// Bands are placed top-down. Units sharing the same placed parents form a
    /// sibling group centered under the mean x of those parents; groups keep
    /// parent order left to right and are pushed right to avoid overlaps.
    /// Units without placed parents follow, and a band with no placed parents
    /// at all (the top band) is centered on x = 0.
    fn place_horizontally(
        graph: &FamilyGraph<'_>,
        units: &[CoupleUnit],
        bands: &[usize],
        config: &LayoutConfig,
    ) -> Vec<f64> {
        let mut xs: Vec<Option<f64>> = vec![None; graph.len()];

        let mut by_band: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (u, &band) in bands.iter().enumerate() {
            by_band.entry(band).or_default().push(u);
        }

        for band_units in by_band.values() {
            let mut groups: Vec<(Option<f64>, Vec<usize>)> = Vec::new();
            let mut group_by_parents: HashMap<Vec<usize>, usize> = HashMap::new();

            for &u in band_units {
                let placed_parents: Vec<usize> = units[u]
                    .members
                    .iter()
                    .flat_map(|&m| graph.parents[m].iter().copied())
                    .filter(|&p| xs[p].is_some())
                    .sorted()
                    .dedup()
                    .collect();

                let slot = match group_by_parents.get(&placed_parents) {
                    Some(&slot) => slot,
                    None => {
                        let anchor = if placed_parents.is_empty() {
                            None
                        } else {
                            let sum: f64 = placed_parents.iter().filter_map(|&p| xs[p]).sum();
                            Some(sum / placed_parents.len() as f64)
                        };
                        groups.push((anchor, Vec::new()));
                        group_by_parents.insert(placed_parents, groups.len() - 1);
                        groups.len() - 1
                    }
                };
                groups[slot].1.push(u);
            }

            let (anchored, floating): (Vec<_>, Vec<_>) =
                groups.into_iter().partition(|(anchor, _)| anchor.is_some());
            let ordered = anchored
                .into_iter()
                .sorted_by(|a, b| a.0.unwrap_or(0.0).total_cmp(&b.0.unwrap_or(0.0)))
                .chain(floating);

            let mut cursor: Option<f64> = None;
            for (anchor, group) in ordered {
                let group_width: f64 = group.iter().map(|&u| units[u].width(config)).sum::<f64>()
                    + group.len().saturating_sub(1) as f64 * config.unit_gap;

                let mut left = match (anchor, cursor) {
                    (Some(a), Some(c)) => (a - group_width / 2.0).max(c + config.unit_gap),
                    (Some(a), None) => a - group_width / 2.0,
                    (None, Some(c)) => c + config.unit_gap,
                    (None, None) => -group_width / 2.0,
                };

                for &u in &group {
                    let unit = &units[u];
                    for (slot, &m) in unit.members.iter().enumerate() {
                        let offset = slot as f64 * (config.node_width + config.spouse_gap);
                        xs[m] = Some(left + offset + config.node_width / 2.0);
                    }
                    let right = left + unit.width(config);
                    cursor = Some(right);
                    left = right + config.unit_gap;
                }
            }
        }

        xs.into_iter().map(|x| x.unwrap_or(0.0)).collect()
    }

    /// Parent→child edges, then spouse edges, one per unordered pair of members.
    fn collect_edges(graph: &FamilyGraph<'_>) -> Vec<LayoutEdge> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        let mut push = |a: usize, b: usize, kind: EdgeKind| {
            if seen.insert((a.min(b), a.max(b))) {
                edges.push(LayoutEdge {
                    source: graph.id(a).clone(),
                    target: graph.id(b).clone(),
                    kind,
                });
            }
        };

        for parent in 0..graph.len() {
            for &child in &graph.children[parent] {
                push(parent, child, EdgeKind::ParentChild);
            }
        }
        for member in 0..graph.len() {
            if let Some(spouse) = graph.spouse[member] {
                push(member, spouse, EdgeKind::Spouse);
            }
        }

        edges
    }
}
