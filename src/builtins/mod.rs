//! Builtin predicates and actions
//!
//! A builtin is a named procedure callable from a rule. In a body it acts as
//! a test or generator ([`Builtin::body_call`]), possibly binding fresh
//! variables. In a head it is a side-effecting action
//! ([`Builtin::head_action`]).
//!
//! Builtins are looked up through a [`BuiltinRegistry`]. Registries are
//! layered: a registry consults its own table first, then its parent. The
//! process-wide default registry is assembled once and never mutated;
//! callers who need extra or replacement builtins layer a registry over it.
//!
//! # Builtin families
//!
//! - `math`: arithmetic (`sum`, `difference`, `product`, `quotient`, `min`, `max`, `addOne`)
//!   and value comparison (`lessThan`, `greaterThan`, `le`, `ge`, `equal`, `notEqual`)
//! - `types`: binding and term-kind tests (`bound`, `unbound`, `isLiteral`, `noValue`, ...)
//! - `string`: `strConcat`, `uriConcat`, `regex`, and node construction
//!   (`makeTemp`, `makeSkolem`, `makeInstance`)
//! - `list`: functor-encoded cons lists (`listLength`, `listEntry`, `listContains`, ...)
//! - `control`: head actions (`print`, `remove`, `drop`, `table`, `tableAll`, `hide`)

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::binding::BindingEnvironment;
use crate::error::{ErrorCode, RuleError, RuleResult};
use crate::rule::{BuiltinCall, Rule};
use crate::store::TripleStore;
use crate::term::{Goal, Node, Term, Triple};

pub mod helpers;
pub mod value;
mod math;
mod types;
mod string;
mod list;
mod control;

pub use control::{DropMatch, Hide, Print, RemoveMatch, Table, TableAll};
pub use list::{ListContains, ListEntry, ListEqual, ListLength, ListNotContains, ListNotEqual};
pub use math::*;
pub use string::{MakeInstance, MakeSkolem, MakeTemp, RegexMatch, StrConcat, UriConcat};
pub use types::{
    Bound, IsBNode, IsFunctor, IsLiteral, NoValue, NotBNode, NotFunctor, NotLiteral, Unbound,
};

// ============================================================================
// Execution context
// ============================================================================

/// What a builtin sees while a rule is being evaluated
///
/// Engines implement this for each firing. Mutation requests made from head
/// actions are queued and applied by the engine after all head actions of
/// the firing have run.
pub trait RuleContext {
    /// Current variable bindings
    fn env(&self) -> &BindingEnvironment;

    fn env_mut(&mut self) -> &mut BindingEnvironment;

    /// The rule being evaluated
    fn rule(&self) -> &Rule;

    /// Whether any visible triple matches the goal
    fn contains(&self, goal: &Goal) -> bool;

    /// Every visible triple matching the goal
    fn find(&self, goal: &Goal) -> Vec<Triple>;

    /// Retract a triple, with truth maintenance, once the firing completes
    fn request_remove(&mut self, _triple: Triple) {}

    /// Delete a triple silently, without retracting its consequences
    fn request_drop(&mut self, _triple: Triple) {}

    /// Mark a predicate tabled for backward evaluation
    fn set_tabled(&mut self, _predicate: Node) {}

    /// Table every predicate
    fn table_all(&mut self) {}

    /// Filter triples mentioning `node` out of query results
    fn hide(&mut self, _node: Node) {}
}

/// A read-only context over a triple store
///
/// Used wherever body builtins run during matching: they may bind
/// variables and query the store, but cannot change it.
pub struct StoreContext<'a> {
    pub env: BindingEnvironment,
    rule: &'a Rule,
    store: &'a dyn TripleStore,
}

impl<'a> StoreContext<'a> {
    pub fn new(env: BindingEnvironment, rule: &'a Rule, store: &'a dyn TripleStore) -> Self {
        StoreContext { env, rule, store }
    }
}

impl RuleContext for StoreContext<'_> {
    fn env(&self) -> &BindingEnvironment {
        &self.env
    }

    fn env_mut(&mut self) -> &mut BindingEnvironment {
        &mut self.env
    }

    fn rule(&self) -> &Rule {
        self.rule
    }

    fn contains(&self, goal: &Goal) -> bool {
        !self.store.find(goal).is_empty()
    }

    fn find(&self, goal: &Goal) -> Vec<Triple> {
        self.store.find(goal)
    }
}

// ============================================================================
// Builtin trait
// ============================================================================

/// A named builtin callable from rule bodies and heads
pub trait Builtin: Send + Sync + Debug {
    /// Name as written in rule text
    fn name(&self) -> &str;

    /// Fixed argument count, or `None` when any count is accepted
    fn arg_length(&self) -> Option<usize> {
        None
    }

    /// Human-readable description of the builtin
    fn description(&self) -> &str {
        ""
    }

    /// Whether the builtin may appear in a rule body
    fn is_body_test(&self) -> bool {
        true
    }

    /// Whether the builtin may appear in a rule head
    fn is_head_action(&self) -> bool {
        false
    }

    /// Run as a body clause; false fails the match
    fn body_call(&self, _args: &[Term], _ctx: &mut dyn RuleContext) -> bool {
        false
    }

    /// Run as a head action
    fn head_action(&self, _args: &[Term], _ctx: &mut dyn RuleContext) -> RuleResult<()> {
        Err(RuleError::new(
            ErrorCode::BuiltinFailed,
            format!("builtin {} cannot be used in a rule head", self.name()),
        ))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Layered name to builtin table
#[derive(Debug, Default)]
pub struct BuiltinRegistry {
    builtins: HashMap<String, Arc<dyn Builtin>>,
    parent: Option<Arc<BuiltinRegistry>>,
}

static DEFAULT_REGISTRY: OnceLock<Arc<BuiltinRegistry>> = OnceLock::new();

impl BuiltinRegistry {
    /// An empty registry with no parent
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding every standard builtin, with no parent
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        math::register(&mut registry);
        types::register(&mut registry);
        string::register(&mut registry);
        list::register(&mut registry);
        control::register(&mut registry);
        debug!(count = registry.builtins.len(), "assembled standard builtins");
        registry
    }

    /// The shared process-wide default registry
    pub fn global() -> Arc<BuiltinRegistry> {
        DEFAULT_REGISTRY.get_or_init(|| Arc::new(Self::standard())).clone()
    }

    /// A registry whose lookups fall back to `parent`
    pub fn layered(parent: Arc<BuiltinRegistry>) -> Self {
        BuiltinRegistry {
            builtins: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Register a builtin, replacing any with the same name in this layer
    pub fn register(&mut self, builtin: impl Builtin + 'static) {
        self.register_arc(Arc::new(builtin));
    }

    pub fn register_arc(&mut self, builtin: Arc<dyn Builtin>) {
        self.builtins.insert(builtin.name().to_string(), builtin);
    }

    /// Look up a builtin, this layer first
    pub fn get(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        match self.builtins.get(name) {
            Some(b) => Some(b.clone()),
            None => self.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All visible builtin names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builtins.keys().cloned().collect();
        if let Some(parent) = &self.parent {
            for name in parent.names() {
                if !self.builtins.contains_key(&name) {
                    names.push(name);
                }
            }
        }
        names.sort();
        names
    }

    /// Resolve a call site, checking that it exists, its arity and its position
    pub fn resolve(&self, call: &BuiltinCall, in_head: bool) -> RuleResult<Arc<dyn Builtin>> {
        let builtin = self.get(call.name()).ok_or_else(|| {
            RuleError::new(ErrorCode::UnknownBuiltin, format!("unknown builtin {}", call.name()))
        })?;
        if let Some(expected) = builtin.arg_length() {
            if expected != call.args().len() {
                return Err(RuleError::new(
                    ErrorCode::BuiltinArity,
                    format!("builtin {} takes {} arguments, got {}", call.name(), expected, call.args().len()),
                ));
            }
        }
        let allowed = if in_head { builtin.is_head_action() } else { builtin.is_body_test() };
        if !allowed {
            let place = if in_head { "head" } else { "body" };
            return Err(RuleError::compilation(format!("builtin {} cannot be used in a rule {}", call.name(), place)));
        }
        Ok(builtin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct AlwaysTrue(&'static str);

    impl Builtin for AlwaysTrue {
        fn name(&self) -> &str {
            self.0
        }

        fn body_call(&self, _args: &[Term], _ctx: &mut dyn RuleContext) -> bool {
            true
        }
    }

    #[test]
    fn test_global_registry_has_standard_builtins() {
        let registry = BuiltinRegistry::global();
        for name in ["sum", "lessThan", "bound", "listLength", "remove", "table", "regex"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(!registry.contains("noSuchBuiltin"));
    }

    #[test]
    fn test_layered_override() {
        let global = BuiltinRegistry::global();
        let mut layer = BuiltinRegistry::layered(global.clone());
        layer.register(AlwaysTrue("lessThan"));
        layer.register(AlwaysTrue("myTest"));

        assert!(layer.contains("myTest"));
        assert!(!global.contains("myTest"));
        assert_eq!(format!("{:?}", layer.get("lessThan").unwrap()), "AlwaysTrue(\"lessThan\")");
        assert_ne!(format!("{:?}", global.get("lessThan").unwrap()), "AlwaysTrue(\"lessThan\")");
        assert!(layer.names().contains(&"sum".to_string()));
    }

    #[test]
    fn test_resolve_checks() {
        let registry = BuiltinRegistry::global();
        let call = BuiltinCall::new("lessThan", vec![Term::var("x", 0)]);
        assert_eq!(registry.resolve(&call, false).unwrap_err().code, ErrorCode::BuiltinArity);

        let call = BuiltinCall::new("frobnicate", vec![]);
        assert_eq!(registry.resolve(&call, false).unwrap_err().code, ErrorCode::UnknownBuiltin);

        let call = BuiltinCall::new("remove", vec![Term::Constant(Node::integer(0))]);
        assert!(registry.resolve(&call, true).is_ok());
        assert_eq!(registry.resolve(&call, false).unwrap_err().code, ErrorCode::RuleCompilation);
    }
}
