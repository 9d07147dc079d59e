//! Triple store
//!
//! The engines read and write base facts through [`TripleStore`]. [`Store`]
//! is the in-memory implementation: a set of triples with one index per
//! position, so lookups with any ground position avoid a full scan. Indexes
//! are keyed by value, so `3` and `'3'^^xsd:long` share a bucket.

use fnv::FnvHashMap;
use indexmap::IndexSet;

use crate::builtins::value::index_key;
use crate::term::{Goal, Node, Triple};

/// A mutable set of ground triples
pub trait TripleStore {
    /// Insert a triple; false if it was already present
    fn add(&mut self, triple: Triple) -> bool;

    /// Delete a triple; false if it was absent
    fn remove(&mut self, triple: &Triple) -> bool;

    fn contains(&self, triple: &Triple) -> bool;

    /// Every triple matching the goal, in insertion order
    fn find(&self, goal: &Goal) -> Vec<Triple>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Index = FnvHashMap<Node, IndexSet<Triple>>;

/// An indexed in-memory triple set
#[derive(Clone, Default)]
pub struct Store {
    /// The triples in this store
    triples: IndexSet<Triple>,
    /// Index by subject
    by_subject: Index,
    /// Index by predicate
    by_predicate: Index,
    /// Index by object
    by_object: Index,
}

fn index_insert(index: &mut Index, key: &Node, triple: &Triple) {
    index.entry(index_key(key)).or_default().insert(triple.clone());
}

fn index_remove(index: &mut Index, key: &Node, triple: &Triple) {
    let key = index_key(key);
    if let Some(bucket) = index.get_mut(&key) {
        bucket.shift_remove(triple);
        if bucket.is_empty() {
            index.remove(&key);
        }
    }
}

impl Store {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add multiple triples
    pub fn add_all(&mut self, triples: impl IntoIterator<Item = Triple>) {
        for triple in triples {
            TripleStore::add(self, triple);
        }
    }

    /// Iterate over all triples
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Clear all triples
    pub fn clear(&mut self) {
        self.triples.clear();
        self.by_subject.clear();
        self.by_predicate.clear();
        self.by_object.clear();
    }

    /// The smallest candidate set for a goal
    fn candidates<'a>(&'a self, goal: &Goal) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        let buckets = [
            goal.subject.as_ref().map(|n| self.by_subject.get(&index_key(n))),
            goal.predicate.as_ref().map(|n| self.by_predicate.get(&index_key(n))),
            goal.object.as_ref().map(|n| self.by_object.get(&index_key(n))),
        ];
        let mut best: Option<&IndexSet<Triple>> = None;
        for bucket in buckets.into_iter().flatten() {
            match bucket {
                // A ground position with no entries: nothing can match
                None => return Box::new(std::iter::empty()),
                Some(set) if best.map_or(true, |b| set.len() < b.len()) => best = Some(set),
                Some(_) => {}
            }
        }
        match best {
            Some(set) => Box::new(set.iter()),
            None => Box::new(self.triples.iter()),
        }
    }
}

impl TripleStore for Store {
    fn add(&mut self, triple: Triple) -> bool {
        if self.triples.contains(&triple) {
            return false;
        }
        index_insert(&mut self.by_subject, &triple.subject, &triple);
        index_insert(&mut self.by_predicate, &triple.predicate, &triple);
        index_insert(&mut self.by_object, &triple.object, &triple);
        self.triples.insert(triple)
    }

    fn remove(&mut self, triple: &Triple) -> bool {
        if !self.triples.shift_remove(triple) {
            return false;
        }
        index_remove(&mut self.by_subject, &triple.subject, triple);
        index_remove(&mut self.by_predicate, &triple.predicate, triple);
        index_remove(&mut self.by_object, &triple.object, triple);
        true
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    fn find(&self, goal: &Goal) -> Vec<Triple> {
        self.candidates(goal).filter(|t| goal.matches(t)).cloned().collect()
    }

    fn len(&self) -> usize {
        self.triples.len()
    }
}

impl FromIterator<Triple> for Store {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut store = Store::new();
        store.add_all(iter);
        store
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store {{")?;
        for triple in &self.triples {
            writeln!(f, "  {:?}", triple)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Node::uri(s), Node::uri(p), Node::uri(o))
    }

    #[test]
    fn test_add_and_contains() {
        let mut store = Store::new();
        let triple = t("http://example.org/s", "http://example.org/p", "http://example.org/o");

        assert!(store.add(triple.clone()));
        assert!(store.contains(&triple));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_no_duplicates() {
        let mut store = Store::new();
        let triple = t("s", "p", "o");

        assert!(store.add(triple.clone()));
        assert!(!store.add(triple));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_find_by_position() {
        let store: Store = vec![t("alice", "knows", "bob"), t("alice", "knows", "charlie"), t("bob", "knows", "charlie")]
            .into_iter()
            .collect();

        let knows = Some(Node::uri("knows"));
        assert_eq!(store.find(&Goal::new(Some(Node::uri("alice")), knows.clone(), None)).len(), 2);
        assert_eq!(store.find(&Goal::new(None, None, Some(Node::uri("charlie")))).len(), 2);
        assert_eq!(store.find(&Goal::new(None, knows, None)).len(), 3);
        assert!(store.find(&Goal::new(Some(Node::uri("dave")), None, None)).is_empty());
        assert_eq!(store.find(&Goal::any()).len(), 3);
    }

    #[test]
    fn test_remove_updates_indexes() {
        let mut store: Store = vec![t("a", "p", "b"), t("a", "p", "c")].into_iter().collect();
        assert!(store.remove(&t("a", "p", "b")));
        assert!(!store.remove(&t("a", "p", "b")));
        assert_eq!(store.find(&Goal::new(None, None, Some(Node::uri("b")))), vec![]);
        assert_eq!(store.find(&Goal::new(Some(Node::uri("a")), None, None)), vec![t("a", "p", "c")]);
    }

    #[test]
    fn test_find_matches_equal_values() {
        use crate::term::uri::ns;

        let long3 = Node::typed_literal("3", ns::xsd("long"));
        let store: Store = vec![
            Triple::new(Node::uri("a"), Node::uri("age"), long3.clone()),
            Triple::new(Node::uri("b"), Node::uri("age"), Node::literal("3")),
        ]
        .into_iter()
        .collect();

        let found = store.find(&Goal::new(None, None, Some(Node::integer(3))));
        assert_eq!(found, vec![Triple::new(Node::uri("a"), Node::uri("age"), long3.clone())]);
        assert!(!store.contains(&Triple::new(Node::uri("a"), Node::uri("age"), Node::integer(3))));
    }
}
