use std::collections::VecDeque;

use crate::logic::graph::FamilyGraph;

/// Generation index per member, in snapshot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAssignment {
    pub generations: Vec<usize>,
    /// Processing order; parents always precede children outside of cycles
    pub order: Vec<usize>,
    /// Members placed while their ancestry was still unresolved
    pub cycle_breaks: Vec<usize>,
}

/// Assign `generation = 1 + max(parent generations)`, 0 for members without parents.
///
/// Kahn-style topological processing. When nothing is ready but members
/// remain, their parent links form a cycle: the earliest remaining member in
/// snapshot order is placed using only the parents already resolved (0 if
/// none) and processing continues from there.
pub fn assign_generations(graph: &FamilyGraph<'_>) -> GenerationAssignment {
    let n = graph.len();
    let mut pending: Vec<usize> = graph.parents.iter().map(Vec::len).collect();
    let mut generations = vec![0usize; n];
    let mut done = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut cycle_breaks = Vec::new();

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut scan = 0usize;

    while order.len() < n {
        let Some(i) = queue.pop_front() else {
            while done[scan] {
                scan += 1;
            }
            cycle_breaks.push(scan);
            pending[scan] = 0;
            queue.push_back(scan);
            continue;
        };
        if done[i] {
            continue;
        }
        done[i] = true;
        order.push(i);

        generations[i] = graph.parents[i]
            .iter()
            .filter(|&&p| done[p] && p != i)
            .map(|&p| generations[p] + 1)
            .max()
            .unwrap_or(0);

        for &child in &graph.children[i] {
            if !done[child] && pending[child] > 0 {
                pending[child] -= 1;
                if pending[child] == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    GenerationAssignment {
        generations,
        order,
        cycle_breaks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, Member, NewMember, UserContext};

    fn member(id: &str, parents: &[&str]) -> Member {
        let mut m = Member::new(
            "tree".to_string(),
            NewMember::new(id, "Test", Gender::Other),
            &UserContext::system(),
        )
        .unwrap();
        m.id = id.to_string();
        m.parents = parents.iter().map(|p| p.to_string()).collect();
        m
    }

    #[test]
    fn chain_gets_increasing_generations() {
        let members = vec![
            member("child", &["parent"]),
            member("grandparent", &[]),
            member("parent", &["grandparent"]),
        ];
        let graph = FamilyGraph::new(&members);
        let assignment = assign_generations(&graph);

        assert_eq!(assignment.generations, vec![2, 0, 1]);
        assert!(assignment.cycle_breaks.is_empty());
    }

    #[test]
    fn deepest_parent_wins() {
        // d has a parent at generation 0 and one at generation 1
        let members = vec![
            member("a", &[]),
            member("b", &["a"]),
            member("c", &[]),
            member("d", &["b", "c"]),
        ];
        let graph = FamilyGraph::new(&members);
        assert_eq!(assign_generations(&graph).generations, vec![0, 1, 0, 2]);
    }

    #[test]
    fn cycles_terminate_with_best_effort_generations() {
        // a -> b -> a, plus c below b
        let members = vec![
            member("a", &["b"]),
            member("b", &["a"]),
            member("c", &["b"]),
        ];
        let graph = FamilyGraph::new(&members);
        let assignment = assign_generations(&graph);

        assert_eq!(assignment.order.len(), 3);
        assert_eq!(assignment.cycle_breaks, vec![0]);
        assert_eq!(assignment.generations, vec![0, 1, 2]);
    }

    #[test]
    fn empty_graph() {
        let members: Vec<Member> = Vec::new();
        let graph = FamilyGraph::new(&members);
        let assignment = assign_generations(&graph);
        assert!(assignment.generations.is_empty());
        assert!(assignment.order.is_empty());
    }
}
