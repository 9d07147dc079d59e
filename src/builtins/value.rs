//! Typed literal values and value-based comparison
//!
//! Numbers compare numerically across the XML Schema integer, decimal and
//! floating types. `dateTime` and `date` literals compare by instant. Any
//! other pair is comparable only for equality, by node identity.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::term::uri::ns;
use crate::term::{Literal, Node};

/// A numeric literal value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Render back into a literal node, `xsd:int`/`xsd:long` or `xsd:double`
    pub fn to_node(self) -> Node {
        match self {
            Number::Int(i) => Node::integer(i),
            Number::Float(f) => Node::double(f),
        }
    }

    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

const INTEGER_TYPES: &[&str] = &[
    "int",
    "integer",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

const FLOAT_TYPES: &[&str] = &["decimal", "float", "double"];

/// Numeric value of a typed literal
pub fn number(node: &Node) -> Option<Number> {
    let lit = node.as_literal()?;
    let xsd = lit.xsd_type()?;
    if INTEGER_TYPES.contains(&xsd) {
        lit.parse_i64().map(Number::Int)
    } else if FLOAT_TYPES.contains(&xsd) {
        lit.parse_f64().map(Number::Float)
    } else {
        None
    }
}

/// Integer value of a literal, accepting integral floats
pub fn integer(node: &Node) -> Option<i64> {
    match number(node)? {
        Number::Int(i) => Some(i),
        Number::Float(f) if f.fract() == 0.0 => Some(f as i64),
        Number::Float(_) => None,
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Temporal {
    Instant(DateTime<Utc>),
    Date(NaiveDate),
}

fn temporal(lit: &Literal) -> Option<Temporal> {
    let text = lit.value().trim();
    match lit.xsd_type()? {
        "dateTime" | "dateTimeStamp" => {
            if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(text) {
                return Some(Temporal::Instant(dt.with_timezone(&Utc)));
            }
            let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
            Some(Temporal::Instant(naive.and_utc()))
        }
        "date" => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(Temporal::Date),
        _ => None,
    }
}

/// Compare two nodes by value
///
/// `None` means the pair is not ordered: mixed or non-numeric datatypes.
pub fn compare(a: &Node, b: &Node) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (number(a), number(b)) {
        return x.compare(y);
    }
    if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
        match (temporal(x), temporal(y)) {
            (Some(Temporal::Instant(x)), Some(Temporal::Instant(y))) => return Some(x.cmp(&y)),
            (Some(Temporal::Date(x)), Some(Temporal::Date(y))) => return Some(x.cmp(&y)),
            _ => {}
        }
    }
    if a == b {
        Some(Ordering::Equal)
    } else {
        None
    }
}

/// Semantic equality: equal values, or identical nodes
pub fn same_value(a: &Node, b: &Node) -> bool {
    a == b || compare(a, b) == Some(Ordering::Equal)
}

/// Index key under which value-equal nodes collide
///
/// Numbers map to a canonical `xsd:integer` or `xsd:double` form and
/// temporal literals to their UTC form. Other nodes key as themselves.
pub fn index_key(node: &Node) -> Node {
    if let Some(n) = number(node) {
        return match n {
            Number::Int(i) => Node::typed_literal(i.to_string(), ns::xsd("integer")),
            Number::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Node::typed_literal((f as i64).to_string(), ns::xsd("integer"))
            }
            Number::Float(f) => Node::typed_literal(f.to_string(), ns::xsd("double")),
        };
    }
    match node.as_literal().and_then(temporal) {
        Some(Temporal::Instant(t)) => Node::typed_literal(t.to_rfc3339(), ns::xsd("dateTime")),
        Some(Temporal::Date(d)) => Node::typed_literal(d.to_string(), ns::xsd("date")),
        None => node.clone(),
    }
}

/// Lexical text of a node: literal form, URI string or blank label
pub fn lexical(node: &Node) -> String {
    match node {
        Node::Literal(lit) => lit.value().to_string(),
        Node::Uri(uri) => uri.as_str().to_string(),
        Node::Blank(b) => b.label().to_string(),
        Node::Functor(_) => node.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_across_subtypes() {
        let int3 = Node::integer(3);
        let long3 = Node::typed_literal("3", ns::xsd("long"));
        let integer4 = Node::typed_literal("4", ns::xsd("integer"));
        let float = Node::typed_literal("2.5", ns::xsd("float"));
        assert!(same_value(&int3, &long3));
        assert_eq!(compare(&int3, &integer4), Some(Ordering::Less));
        assert_eq!(compare(&float, &int3), Some(Ordering::Less));
    }

    #[test]
    fn test_temporal_by_instant() {
        let a = Node::typed_literal("2020-01-01T12:00:00Z", ns::xsd("dateTime"));
        let b = Node::typed_literal("2020-01-01T13:00:00+02:00", ns::xsd("dateTime"));
        assert_eq!(compare(&a, &b), Some(Ordering::Greater));
        let d1 = Node::typed_literal("2020-01-01", ns::xsd("date"));
        let d2 = Node::typed_literal("2021-01-01", ns::xsd("date"));
        assert_eq!(compare(&d1, &d2), Some(Ordering::Less));
    }

    #[test]
    fn test_incomparable() {
        let n = Node::integer(1);
        let s = Node::literal("1");
        assert_eq!(compare(&n, &s), None);
        assert!(!same_value(&n, &s));
        assert_eq!(compare(&Node::uri("a"), &Node::uri("a")), Some(Ordering::Equal));
        assert_eq!(compare(&Node::uri("a"), &Node::uri("b")), None);
    }

    #[test]
    fn test_integer_extraction() {
        assert_eq!(integer(&Node::integer(7)), Some(7));
        assert_eq!(integer(&Node::typed_literal("2.0", ns::xsd("double"))), Some(2));
        assert_eq!(integer(&Node::literal("x")), None);
    }

    #[test]
    fn test_index_key_collides_for_equal_values() {
        let int3 = Node::integer(3);
        let long3 = Node::typed_literal("3", ns::xsd("long"));
        let double3 = Node::typed_literal("3.0", ns::xsd("double"));
        assert_eq!(index_key(&int3), index_key(&long3));
        assert_eq!(index_key(&int3), index_key(&double3));
        assert_ne!(index_key(&int3), index_key(&Node::literal("3")));

        let a = Node::typed_literal("2020-01-01T12:00:00Z", ns::xsd("dateTime"));
        let b = Node::typed_literal("2020-01-01T14:00:00+02:00", ns::xsd("dateTime"));
        assert_eq!(index_key(&a), index_key(&b));
        assert_eq!(index_key(&Node::uri("x")), Node::uri("x"));
    }
}
