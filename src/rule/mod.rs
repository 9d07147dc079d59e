//! Rules for the forward and backward engines
//!
//! A rule is an ordered body of clauses and one or more head clauses. Each
//! clause is either a triple pattern or a builtin call. Forward rules are
//! written `body -> head`, backward rules `head <- body`; a rule with an
//! empty body is an axiom.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{ErrorCode, RuleError, RuleResult};
use crate::term::{write_call, Term, TriplePattern, Variable};

pub mod parser;

pub use parser::{parse_rule, parse_rules, RuleParser};

/// Evaluation direction of a rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `body -> head`, run eagerly by the RETE engine
    Forward,
    /// `head <- body`, run on demand by the tabled resolver
    Backward,
}

/// A call to a named builtin
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BuiltinCall {
    name: String,
    args: Vec<Term>,
}

impl BuiltinCall {
    pub fn new(name: impl Into<String>, args: Vec<Term>) -> Self {
        BuiltinCall { name: name.into(), args }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }
}

impl fmt::Display for BuiltinCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_call(f, &self.name, &self.args)
    }
}

impl fmt::Debug for BuiltinCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// One clause of a rule body or head
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    /// A triple pattern matched against (or asserted into) the graph
    Pattern(TriplePattern),
    /// A builtin test in a body, or a side-effecting action in a head
    Builtin(BuiltinCall),
}

/// Body clauses are tests or generators
pub type BodyElement = Clause;
/// Head clauses are conclusions or actions
pub type HeadElement = Clause;

impl Clause {
    pub fn as_pattern(&self) -> Option<&TriplePattern> {
        match self {
            Clause::Pattern(p) => Some(p),
            Clause::Builtin(_) => None,
        }
    }

    pub fn as_builtin(&self) -> Option<&BuiltinCall> {
        match self {
            Clause::Builtin(b) => Some(b),
            Clause::Pattern(_) => None,
        }
    }

    /// Visit every variable occurrence, left to right
    pub fn for_each_variable(&self, visit: &mut impl FnMut(&Variable)) {
        match self {
            Clause::Pattern(p) => p.for_each_variable(visit),
            Clause::Builtin(b) => {
                for arg in b.args() {
                    arg.for_each_variable(visit);
                }
            }
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Pattern(p) => write!(f, "{}", p),
            Clause::Builtin(b) => write!(f, "{}", b),
        }
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Pattern(p) => write!(f, "{:?}", p),
            Clause::Builtin(b) => write!(f, "{:?}", b),
        }
    }
}

impl From<TriplePattern> for Clause {
    fn from(p: TriplePattern) -> Self {
        Clause::Pattern(p)
    }
}

impl From<BuiltinCall> for Clause {
    fn from(b: BuiltinCall) -> Self {
        Clause::Builtin(b)
    }
}

/// An inference rule
///
/// Equality ignores the rule name and compares clauses slot by slot, so two
/// rules that differ only in how their variables are spelled are equal.
#[derive(Clone)]
pub struct Rule {
    name: Option<String>,
    body: Vec<BodyElement>,
    head: Vec<HeadElement>,
    direction: Direction,
    num_vars: usize,
}

impl Rule {
    /// Create a rule; the slot count is taken from the highest slot used
    pub fn new(name: Option<String>, body: Vec<BodyElement>, head: Vec<HeadElement>, direction: Direction) -> Self {
        let mut num_vars = 0;
        for clause in body.iter().chain(head.iter()) {
            clause.for_each_variable(&mut |v| num_vars = num_vars.max(v.slot() + 1));
        }
        Rule { name, body, head, direction, num_vars }
    }

    /// Create a named forward rule
    pub fn forward(name: impl Into<String>, body: Vec<BodyElement>, head: Vec<HeadElement>) -> Self {
        Self::new(Some(name.into()), body, head, Direction::Forward)
    }

    /// Create a named backward rule
    pub fn backward(name: impl Into<String>, head: Vec<HeadElement>, body: Vec<BodyElement>) -> Self {
        Self::new(Some(name.into()), body, head, Direction::Backward)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used in traces and derivations
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anon>")
    }

    pub fn body(&self) -> &[BodyElement] {
        &self.body
    }

    pub fn head(&self) -> &[HeadElement] {
        &self.head
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_backward(&self) -> bool {
        self.direction == Direction::Backward
    }

    /// Number of binding slots this rule needs
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// An axiom has no body and is asserted once when the rules bind
    pub fn is_axiom(&self) -> bool {
        self.body.is_empty()
    }

    /// Triple patterns in the body, in order
    pub fn body_patterns(&self) -> impl Iterator<Item = &TriplePattern> {
        self.body.iter().filter_map(Clause::as_pattern)
    }

    /// Triple patterns in the head, in order
    pub fn head_patterns(&self) -> impl Iterator<Item = &TriplePattern> {
        self.head.iter().filter_map(Clause::as_pattern)
    }

    /// Builtin calls anywhere in the rule
    pub fn builtin_calls(&self) -> impl Iterator<Item = &BuiltinCall> {
        self.body.iter().chain(self.head.iter()).filter_map(Clause::as_builtin)
    }

    /// Check the structural constraints a rule must meet before it can run
    ///
    /// Every variable used in the head must occur somewhere in the body.
    /// Backward rules need exactly one head, and it must be a triple pattern.
    pub fn validate(&self) -> RuleResult<()> {
        let mut bound = HashSet::new();
        for clause in &self.body {
            clause.for_each_variable(&mut |v| {
                bound.insert(v.slot());
            });
        }

        let mut missing = Vec::new();
        for clause in &self.head {
            clause.for_each_variable(&mut |v| {
                if !bound.contains(&v.slot()) && !missing.iter().any(|m: &Variable| m == v) {
                    missing.push(v.clone());
                }
            });
        }
        if let Some(var) = missing.first() {
            return Err(RuleError::new(
                ErrorCode::UnboundHeadVariable,
                format!("head variable {} does not occur in the rule body", var),
            )
            .with_context("rule", self.to_string())
            .with_hint("bind the variable in a body pattern or builtin"));
        }

        if self.is_backward() {
            match self.head.as_slice() {
                [Clause::Pattern(_)] => {}
                [_] => {
                    return Err(RuleError::compilation("backward rule head must be a triple pattern")
                        .with_context("rule", self.to_string()));
                }
                _ => {
                    return Err(RuleError::compilation("backward rule must have exactly one head")
                        .with_context("rule", self.to_string()));
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.direction == other.direction && self.body == other.body && self.head == other.head
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.direction.hash(state);
        self.body.hash(state);
        self.head.hash(state);
    }
}

/// Re-parseable text form: `[ name: body -> head ]` or `[ name: head <- body ]`
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ ")?;
        if let Some(name) = &self.name {
            write!(f, "{}: ", name)?;
        }
        let (first, arrow, second) = match self.direction {
            Direction::Forward => (&self.body, "->", &self.head),
            Direction::Backward => (&self.head, "<-", &self.body),
        };
        for clause in first {
            write!(f, "{} ", clause)?;
        }
        write!(f, "{} ", arrow)?;
        for clause in second {
            write!(f, "{} ", clause)?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn pattern(s: Term, p: &str, o: Term) -> Clause {
        Clause::Pattern(TriplePattern::new(s, Term::uri(p), o))
    }

    #[test]
    fn test_num_vars() {
        let rule = Rule::backward(
            "r1",
            vec![pattern(Term::var("a", 0), "r", Term::var("c", 2))],
            vec![
                pattern(Term::var("a", 0), "p", Term::var("b", 1)),
                pattern(Term::var("b", 1), "p", Term::var("c", 2)),
            ],
        );
        assert_eq!(rule.num_vars(), 3);
        assert!(rule.is_backward());
        assert!(!rule.is_axiom());
    }

    #[test]
    fn test_display() {
        let rule = Rule::backward(
            "r1",
            vec![pattern(Term::var("a", 0), "r", Term::var("c", 2))],
            vec![
                pattern(Term::var("a", 0), "p", Term::var("b", 1)),
                pattern(Term::var("b", 1), "p", Term::var("c", 2)),
            ],
        );
        assert_eq!(rule.to_string(), "[ r1: (?a r ?c) <- (?a p ?b) (?b p ?c) ]");

        let axiom = Rule::new(None, vec![], vec![pattern(Term::uri("a"), "p", Term::uri("b"))], Direction::Forward);
        assert_eq!(axiom.to_string(), "[ -> (a p b) ]");
        assert!(axiom.is_axiom());
    }

    #[test]
    fn test_equality_ignores_variable_names() {
        let r1 = Rule::forward(
            "x",
            vec![pattern(Term::var("a", 0), "p", Term::var("b", 1))],
            vec![pattern(Term::var("b", 1), "q", Term::var("a", 0))],
        );
        let r2 = Rule::forward(
            "y",
            vec![pattern(Term::var("s", 0), "p", Term::var("o", 1))],
            vec![pattern(Term::var("o", 1), "q", Term::var("s", 0))],
        );
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_validate_unbound_head_variable() {
        let rule = Rule::forward(
            "bad",
            vec![pattern(Term::var("a", 0), "p", Term::uri("b"))],
            vec![pattern(Term::var("a", 0), "q", Term::var("z", 1))],
        );
        let err = rule.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnboundHeadVariable);
        assert!(err.message.contains("?z"));
    }

    #[test]
    fn test_validate_builtin_binds() {
        let rule = Rule::forward(
            "inc",
            vec![
                pattern(Term::uri("n1"), "p", Term::var("x", 0)),
                Clause::Builtin(BuiltinCall::new("addOne", vec![Term::var("x", 0), Term::var("y", 1)])),
            ],
            vec![pattern(Term::uri("n1"), "q", Term::var("y", 1))],
        );
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_backward_multi_head() {
        let rule = Rule::backward(
            "two",
            vec![
                pattern(Term::var("a", 0), "p", Term::uri("b")),
                pattern(Term::var("a", 0), "q", Term::uri("b")),
            ],
            vec![pattern(Term::var("a", 0), "r", Term::uri("b"))],
        );
        assert_eq!(rule.validate().unwrap_err().code, ErrorCode::RuleCompilation);
    }
}
