//! Truth maintenance for forward deductions
//!
//! Every fact in the forward engine carries its origins: asserted by the
//! caller, or derived by a rule from a list of premises. Each premise keeps
//! the set of facts that depend on it.
//!
//! Retraction is delete-and-rederive:
//! 1. [`SupportGraph::overdelete`] removes the retracted fact and every fact
//!    transitively supported by it, pruning origins that used a deleted fact.
//! 2. The caller checks each deleted fact for a remaining origin whose
//!    premises are all still present, and re-asserts those. The network then
//!    re-fires from them and rebuilds whatever they support.
//!
//! Asserted facts are never overdeleted; only their derived origins are pruned.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};

use crate::term::Triple;

/// How a fact came to hold
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Asserted by the caller (base fact)
    Asserted,
    /// Concluded by a rule firing
    Derived {
        /// Index of the rule in the forward network
        rule: usize,
        /// Triples matched by the rule body
        premises: Vec<Triple>,
    },
}

impl Origin {
    fn uses(&self, triple: &Triple) -> bool {
        match self {
            Origin::Asserted => false,
            Origin::Derived { premises, .. } => premises.contains(triple),
        }
    }
}

/// Origins and dependents of one fact
#[derive(Clone, Debug, Default)]
struct SupportEntry {
    origins: Vec<Origin>,
    dependents: IndexSet<Triple>,
}

impl SupportEntry {
    fn is_asserted(&self) -> bool {
        self.origins.contains(&Origin::Asserted)
    }
}

/// Support graph over forward facts
#[derive(Clone, Debug, Default)]
pub struct SupportGraph {
    entries: IndexMap<Triple, SupportEntry>,
}

impl SupportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a base assertion
    pub fn add_asserted(&mut self, triple: Triple) {
        let entry = self.entries.entry(triple).or_default();
        if !entry.is_asserted() {
            entry.origins.push(Origin::Asserted);
        }
    }

    /// Record a derivation; repeats of an existing origin are ignored
    pub fn add_derived(&mut self, triple: Triple, rule: usize, premises: Vec<Triple>) {
        for premise in &premises {
            self.entries.entry(premise.clone()).or_default().dependents.insert(triple.clone());
        }
        let origin = Origin::Derived { rule, premises };
        let entry = self.entries.entry(triple).or_default();
        if !entry.origins.contains(&origin) {
            entry.origins.push(origin);
        }
    }

    /// Drop the asserted origin of a fact
    pub fn remove_assertion(&mut self, triple: &Triple) {
        if let Some(entry) = self.entries.get_mut(triple) {
            entry.origins.retain(|o| o != &Origin::Asserted);
        }
    }

    pub fn is_asserted(&self, triple: &Triple) -> bool {
        self.entries.get(triple).map_or(false, SupportEntry::is_asserted)
    }

    /// Whether any rule has concluded this fact
    pub fn is_derived(&self, triple: &Triple) -> bool {
        self.entries
            .get(triple)
            .map_or(false, |e| e.origins.iter().any(|o| matches!(o, Origin::Derived { .. })))
    }

    pub fn origins(&self, triple: &Triple) -> &[Origin] {
        match self.entries.get(triple) {
            Some(entry) => &entry.origins,
            None => &[],
        }
    }

    /// Whether some origin still holds, given which facts are present
    pub fn has_valid_origin(&self, triple: &Triple, present: impl Fn(&Triple) -> bool) -> bool {
        self.origins(triple).iter().any(|origin| match origin {
            Origin::Asserted => true,
            Origin::Derived { premises, .. } => premises.iter().all(|p| present(p)),
        })
    }

    /// Collect the retracted fact and everything it transitively supports
    ///
    /// Origins that used a deleted fact are pruned along the way. Asserted
    /// dependents are kept and stop the cascade.
    pub fn overdelete(&mut self, triple: &Triple) -> IndexSet<Triple> {
        let mut deleted = IndexSet::new();
        deleted.insert(triple.clone());
        let mut queue = VecDeque::from([triple.clone()]);

        while let Some(current) = queue.pop_front() {
            let dependents = match self.entries.get(&current) {
                Some(entry) => entry.dependents.clone(),
                None => continue,
            };
            for dependent in dependents {
                let Some(entry) = self.entries.get_mut(&dependent) else {
                    continue;
                };
                entry.origins.retain(|o| !o.uses(&current));
                if entry.is_asserted() || deleted.contains(&dependent) {
                    continue;
                }
                deleted.insert(dependent.clone());
                queue.push_back(dependent);
            }
        }
        deleted
    }

    /// Remove a fact's record entirely
    pub fn forget(&mut self, triple: &Triple) {
        self.entries.shift_remove(triple);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Node;

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Node::uri(s), Node::uri(p), Node::uri(o))
    }

    #[test]
    fn test_overdelete_cascades_through_derived() {
        let mut support = SupportGraph::new();
        let (a, b, c) = (t("x", "p", "y"), t("x", "q", "y"), t("x", "r", "y"));
        support.add_asserted(a.clone());
        support.add_derived(b.clone(), 0, vec![a.clone()]);
        support.add_derived(c.clone(), 1, vec![b.clone()]);

        support.remove_assertion(&a);
        let deleted = support.overdelete(&a);
        assert_eq!(deleted.len(), 3);
        assert!(!support.has_valid_origin(&c, |_| true));
    }

    #[test]
    fn test_alternative_origin_survives() {
        let mut support = SupportGraph::new();
        let (a1, a2, b) = (t("x", "p", "y"), t("x", "s", "y"), t("x", "q", "y"));
        support.add_asserted(a1.clone());
        support.add_asserted(a2.clone());
        support.add_derived(b.clone(), 0, vec![a1.clone()]);
        support.add_derived(b.clone(), 1, vec![a2.clone()]);

        support.remove_assertion(&a1);
        let deleted = support.overdelete(&a1);
        assert!(deleted.contains(&b));
        assert!(support.has_valid_origin(&b, |p| !deleted.contains(p)));
        assert_eq!(support.origins(&b).len(), 1);
    }

    #[test]
    fn test_asserted_dependent_stops_cascade() {
        let mut support = SupportGraph::new();
        let (a, b, c) = (t("x", "p", "y"), t("x", "q", "y"), t("x", "r", "y"));
        support.add_asserted(a.clone());
        support.add_asserted(b.clone());
        support.add_derived(b.clone(), 0, vec![a.clone()]);
        support.add_derived(c.clone(), 1, vec![b.clone()]);

        let deleted = support.overdelete(&a);
        assert_eq!(deleted.len(), 1);
        assert!(support.is_asserted(&b));
        assert!(!support.is_derived(&b));
    }
}
