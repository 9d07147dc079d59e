//! Functor-encoded cons lists
//!
//! A list is the node `cons(first, rest)` ending in `rdf:nil`. Lists are
//! ordinary functor values, so they unify structurally like any other term.

use std::sync::Arc;

use super::{FunctorNode, Node};

/// Functor name of a list cell
pub const CONS: &str = "cons";

/// The empty list
pub fn nil() -> Node {
    Node::uri(super::uri::ns::rdf_nil())
}

/// Check whether a node is the empty list
pub fn is_nil(node: &Node) -> bool {
    matches!(node, Node::Uri(u) if u.as_str() == super::uri::ns::rdf_nil())
}

/// Build a list from a vector of nodes
pub fn from_vec(items: Vec<Node>) -> Node {
    items.into_iter().rev().fold(nil(), |rest, item| {
        Node::Functor(Arc::new(FunctorNode::new(CONS, vec![item, rest])))
    })
}

/// Iterate over the elements of a list node
pub fn iter(node: &Node) -> ListIter<'_> {
    ListIter { current: Some(node) }
}

/// Collect the elements of a well-formed list, `None` for anything else
pub fn to_vec(node: &Node) -> Option<Vec<Node>> {
    let mut result = Vec::new();
    for item in iter(node) {
        result.push(item?.clone());
    }
    Some(result)
}

/// Iterator over list elements; yields `None` once if the spine is malformed
pub struct ListIter<'a> {
    current: Option<&'a Node>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Option<&'a Node>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        if is_nil(node) {
            self.current = None;
            return None;
        }
        match node {
            Node::Functor(f) if f.name() == CONS && f.args().len() == 2 => {
                self.current = Some(&f.args()[1]);
                Some(Some(&f.args()[0]))
            }
            _ => {
                self.current = None;
                Some(None)
            }
        }
    }
}
