use std::collections::{BTreeSet, HashMap};

use crate::model::{Id, LayoutWarning, Member};

/// Index-based view over a member snapshot.
///
/// Parent/child adjacency is the union of every member's `parents` and
/// `children` lists, so a one-sided link in bad data still counts.
/// References to ids outside the snapshot are dropped and reported.
pub struct FamilyGraph<'a> {
    pub members: &'a [Member],
    index: HashMap<&'a str, usize>,
    pub parents: Vec<Vec<usize>>,
    pub children: Vec<Vec<usize>>,
    pub spouse: Vec<Option<usize>>,
    pub dangling: Vec<LayoutWarning>,
}

impl<'a> FamilyGraph<'a> {
    pub fn new(members: &'a [Member]) -> Self {
        let n = members.len();
        let mut index = HashMap::with_capacity(n);
        for (i, member) in members.iter().enumerate() {
            index.entry(member.id.as_str()).or_insert(i);
        }

        let mut parent_sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut child_sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut spouse = vec![None; n];
        let mut dangling = Vec::new();

        let mut resolve = |owner: &Member, id: &Id| -> Option<usize> {
            let found = index.get(id.as_str()).copied();
            if found.is_none() {
                dangling.push(LayoutWarning::DanglingReference {
                    member_id: owner.id.clone(),
                    missing_id: id.clone(),
                });
            }
            found
        };

        for member in members {
            // Links on a repeated id are merged into its first occurrence
            let i = index[member.id.as_str()];
            for parent_id in &member.parents {
                if let Some(p) = resolve(member, parent_id) {
                    if p != i {
                        parent_sets[i].insert(p);
                        child_sets[p].insert(i);
                    }
                }
            }
            for child_id in &member.children {
                if let Some(c) = resolve(member, child_id) {
                    if c != i {
                        child_sets[i].insert(c);
                        parent_sets[c].insert(i);
                    }
                }
            }
            if let Some(spouse_id) = &member.spouse_id {
                if let Some(s) = resolve(member, spouse_id) {
                    if s != i {
                        spouse[i] = Some(s);
                    }
                }
            }
        }

        Self {
            members,
            index,
            parents: parent_sets.into_iter().map(|s| s.into_iter().collect()).collect(),
            children: child_sets.into_iter().map(|s| s.into_iter().collect()).collect(),
            spouse,
            dangling,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, i: usize) -> &'a Id {
        &self.members[i].id
    }

    /// Whether `i` is the first occurrence of its id in the snapshot
    pub fn is_canonical(&self, i: usize) -> bool {
        self.index_of(&self.members[i].id) == Some(i)
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
    fn one_sided_links_are_merged() {
        let mut p = member("p");
        let mut c = member("c");
        let d = member("d");
        p.children.insert("c".to_string());
        c.parents.insert("p".to_string());
        // only the child side knows about this one
        let mut e = member("e");
        e.parents.insert("d".to_string());
        let members = vec![p, c, d, e];

        let graph = FamilyGraph::new(&members);
        assert_eq!(graph.children[0], vec![1]);
        assert_eq!(graph.parents[1], vec![0]);
        assert_eq!(graph.children[2], vec![3]);
        assert!(graph.dangling.is_empty());
    }

    #[test]
    fn dangling_references_are_reported_not_indexed() {
        let mut a = member("a");
        a.parents.insert("ghost".to_string());
        a.spouse_id = Some("nobody".to_string());
        let members = vec![a];

        let graph = FamilyGraph::new(&members);
        assert!(graph.parents[0].is_empty());
        assert_eq!(graph.spouse[0], None);
        assert_eq!(graph.dangling.len(), 2);
    }
}
