//! Terms, triples and patterns
//!
//! This module defines the data model the engines work over:
//! - [`Node`]: a ground RDF term (URI, literal, blank node) or a ground functor value
//! - [`Term`]: a rule-level term, either a constant node, a slot-indexed variable or a functor
//! - [`Triple`]: a ground (subject, predicate, object) fact
//! - [`TriplePattern`]: a triple template over terms
//! - [`Goal`]: a query pattern whose positions are either ground or wildcards

use std::fmt;
use std::sync::Arc;

pub mod uri;
pub mod list;
mod literal;
mod blank;
mod variable;

pub use uri::Uri;
pub use literal::{Literal, LiteralTag};
pub use blank::BlankNode;
pub use variable::Variable;

/// A ground term
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// A URI reference (named node)
    Uri(Arc<Uri>),
    /// A literal value
    Literal(Arc<Literal>),
    /// A blank node (anonymous)
    Blank(BlankNode),
    /// A structured value, `name(arg ...)`
    Functor(Arc<FunctorNode>),
}

/// A ground functor value
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FunctorNode {
    name: String,
    args: Vec<Node>,
}

impl FunctorNode {
    pub fn new(name: impl Into<String>, args: Vec<Node>) -> Self {
        FunctorNode { name: name.into(), args }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Node] {
        &self.args
    }
}

impl Node {
    /// Create a URI node
    pub fn uri(s: impl Into<String>) -> Self {
        Node::Uri(Arc::new(Uri::new(s.into())))
    }

    /// Create a plain literal
    pub fn literal(s: impl Into<String>) -> Self {
        Node::Literal(Arc::new(Literal::plain(s.into())))
    }

    /// Create a typed literal
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Node::Literal(Arc::new(Literal::typed(value.into(), datatype.into())))
    }

    /// Create a language-tagged literal
    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Node::Literal(Arc::new(Literal::with_language(value.into(), lang.into())))
    }

    /// Create an integer literal, `xsd:int` when it fits and `xsd:long` otherwise
    pub fn integer(value: i64) -> Self {
        let datatype = if i32::try_from(value).is_ok() { "int" } else { "long" };
        Node::typed_literal(value.to_string(), uri::ns::xsd(datatype))
    }

    /// Create an `xsd:double` literal
    pub fn double(value: f64) -> Self {
        Node::typed_literal(value.to_string(), uri::ns::xsd("double"))
    }

    /// Create a blank node with a label
    pub fn blank(label: impl Into<String>) -> Self {
        Node::Blank(BlankNode::labeled(label))
    }

    /// Create a fresh blank node
    pub fn fresh_blank() -> Self {
        Node::Blank(BlankNode::fresh())
    }

    /// Create a functor value
    pub fn functor(name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::Functor(Arc::new(FunctorNode::new(name, args)))
    }

    /// Get the URI if this is a URI node
    pub fn as_uri(&self) -> Option<&Uri> {
        match self {
            Node::Uri(u) => Some(u),
            _ => None,
        }
    }

    /// Get the literal if this is a literal node
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Get the functor if this is a functor value
    pub fn as_functor(&self) -> Option<&FunctorNode> {
        match self {
            Node::Functor(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }

    pub fn is_functor(&self) -> bool {
        matches!(self, Node::Functor(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Uri(u) => write!(f, "{}", u),
            Node::Literal(l) => write!(f, "{}", l),
            Node::Blank(b) => write!(f, "{}", b),
            Node::Functor(func) => write_call(f, func.name(), func.args()),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Write `name(a b c)`
pub(crate) fn write_call<T: fmt::Display>(f: &mut fmt::Formatter<'_>, name: &str, args: &[T]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", arg)?;
    }
    write!(f, ")")
}

/// A rule-level term
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A ground node
    Constant(Node),
    /// A variable, addressed by its slot
    Variable(Variable),
    /// A functor whose arguments may contain variables
    Functor(Arc<Functor>),
}

/// A functor over terms
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Functor {
    name: String,
    args: Vec<Term>,
}

impl Functor {
    pub fn new(name: impl Into<String>, args: Vec<Term>) -> Self {
        Functor { name: name.into(), args }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }
}

impl Term {
    /// Create a URI constant
    pub fn uri(s: impl Into<String>) -> Self {
        Term::Constant(Node::uri(s))
    }

    /// Create a variable
    pub fn var(name: impl Into<String>, slot: usize) -> Self {
        Term::Variable(Variable::new(name, slot))
    }

    /// Create a functor term
    pub fn functor(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Functor(Arc::new(Functor::new(name, args)))
    }

    /// Check if this term is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn is_functor(&self) -> bool {
        matches!(self, Term::Functor(_))
    }

    /// Check if this term contains no variables
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Constant(_) => true,
            Term::Variable(_) => false,
            Term::Functor(f) => f.args.iter().all(Term::is_ground),
        }
    }

    /// Get the node if this is a constant
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Term::Constant(n) => Some(n),
            _ => None,
        }
    }

    /// Visit every variable occurrence, left to right
    pub fn for_each_variable(&self, visit: &mut impl FnMut(&Variable)) {
        match self {
            Term::Constant(_) => {}
            Term::Variable(v) => visit(v),
            Term::Functor(f) => {
                for arg in &f.args {
                    arg.for_each_variable(visit);
                }
            }
        }
    }
}

impl From<Node> for Term {
    fn from(node: Node) -> Self {
        Term::Constant(node)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(n) => write!(f, "{}", n),
            Term::Variable(v) => write!(f, "{}", v),
            Term::Functor(func) => write_call(f, func.name(), func.args()),
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{:?}", v),
            _ => write!(f, "{}", self),
        }
    }
}

/// A ground fact
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl Triple {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Triple { subject, predicate, object }
    }

    /// Whether the object is a structured functor value
    pub fn has_functor_object(&self) -> bool {
        self.object.is_functor()
    }
}

impl fmt::Debug for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// A triple template over rule terms
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        TriplePattern { subject, predicate, object }
    }

    /// The three positions in order
    pub fn terms(&self) -> [&Term; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Check if this pattern contains no variables
    pub fn is_ground(&self) -> bool {
        self.terms().iter().all(|t| t.is_ground())
    }

    /// Visit every variable occurrence, left to right
    pub fn for_each_variable(&self, visit: &mut impl FnMut(&Variable)) {
        for term in self.terms() {
            term.for_each_variable(visit);
        }
    }
}

impl From<Triple> for TriplePattern {
    fn from(t: Triple) -> Self {
        TriplePattern::new(t.subject.into(), t.predicate.into(), t.object.into())
    }
}

impl fmt::Debug for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?} {:?} {:?})", self.subject, self.predicate, self.object)
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// A lookup pattern: each position is ground or a wildcard
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Goal {
    pub subject: Option<Node>,
    pub predicate: Option<Node>,
    pub object: Option<Node>,
}

impl Goal {
    pub fn new(subject: Option<Node>, predicate: Option<Node>, object: Option<Node>) -> Self {
        Goal { subject, predicate, object }
    }

    /// The all-wildcard goal
    pub fn any() -> Self {
        Goal::default()
    }

    /// Check whether a triple satisfies every ground position, by value
    pub fn matches(&self, triple: &Triple) -> bool {
        fn position(want: &Option<Node>, have: &Node) -> bool {
            want.as_ref().map_or(true, |w| crate::builtins::value::same_value(w, have))
        }
        position(&self.subject, &triple.subject)
            && position(&self.predicate, &triple.predicate)
            && position(&self.object, &triple.object)
    }
}

impl From<&Triple> for Goal {
    fn from(t: &Triple) -> Self {
        Goal::new(Some(t.subject.clone()), Some(t.predicate.clone()), Some(t.object.clone()))
    }
}

impl fmt::Debug for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |n: &Option<Node>| n.as_ref().map_or_else(|| "*".to_string(), |n| n.to_string());
        write!(f, "({} {} {})", show(&self.subject), show(&self.predicate), show(&self.object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        assert!(matches!(Node::uri("http://example.org/foo"), Node::Uri(_)));
        assert!(Node::literal("hello").is_literal());
        assert!(Node::blank("b1").is_blank());
        assert!(Node::functor("f", vec![Node::uri("a")]).is_functor());
    }

    #[test]
    fn test_integer_datatypes() {
        let small = Node::integer(3);
        assert_eq!(small.as_literal().unwrap().xsd_type(), Some("int"));
        let big = Node::integer(1 << 40);
        assert_eq!(big.as_literal().unwrap().xsd_type(), Some("long"));
    }

    #[test]
    fn test_ground_check() {
        assert!(Term::uri("p").is_ground());
        assert!(!Term::var("x", 0).is_ground());
        let f = Term::functor("f", vec![Term::uri("a"), Term::var("y", 1)]);
        assert!(!f.is_ground());
    }

    #[test]
    fn test_triple_display() {
        let t = Triple::new(Node::uri("a"), Node::uri("p"), Node::functor("f", vec![Node::uri("b"), Node::integer(1)]));
        assert_eq!(t.to_string(), "(a p f(b 1))");
        assert!(t.has_functor_object());
    }

    #[test]
    fn test_goal_matches() {
        let t = Triple::new(Node::uri("a"), Node::uri("p"), Node::uri("b"));
        assert!(Goal::any().matches(&t));
        assert!(Goal::new(None, Some(Node::uri("p")), None).matches(&t));
        assert!(!Goal::new(None, Some(Node::uri("q")), None).matches(&t));
        assert_eq!(Goal::new(Some(Node::uri("a")), None, None).to_string(), "(a * *)");
    }
}
