//! Matching and instantiation
//!
//! Patterns are matched against ground triples (or against the ground
//! positions of a goal), extending a [`BindingEnvironment`]. A failed match
//! may leave partial bindings behind: callers `push` before matching and
//! `unwind` on failure.

use crate::binding::BindingEnvironment;
use crate::builtins::value;
use crate::error::{RuleError, RuleResult};
use crate::term::{Goal, Node, Term, Triple, TriplePattern};

/// Match one term against a ground node
pub fn match_term(term: &Term, node: &Node, env: &mut BindingEnvironment) -> bool {
    match term {
        Term::Constant(c) => value::same_value(c, node),
        Term::Variable(v) => env.bind(v.slot(), node.clone()),
        Term::Functor(f) => match node {
            Node::Functor(g) if g.name() == f.name() && g.args().len() == f.args().len() => f
                .args()
                .iter()
                .zip(g.args())
                .all(|(arg, value)| match_term(arg, value, env)),
            _ => false,
        },
    }
}

/// Match a pattern against a triple, binding its variables
pub fn match_pattern(pattern: &TriplePattern, triple: &Triple, env: &mut BindingEnvironment) -> bool {
    match_term(&pattern.subject, &triple.subject, env)
        && match_term(&pattern.predicate, &triple.predicate, env)
        && match_term(&pattern.object, &triple.object, env)
}

/// Match a pattern against the ground positions of a goal; wildcards match anything
pub fn match_goal(pattern: &TriplePattern, goal: &Goal, env: &mut BindingEnvironment) -> bool {
    fn position(term: &Term, want: &Option<Node>, env: &mut BindingEnvironment) -> bool {
        match want {
            Some(node) => match_term(term, node, env),
            None => true,
        }
    }
    position(&pattern.subject, &goal.subject, env)
        && position(&pattern.predicate, &goal.predicate, env)
        && position(&pattern.object, &goal.object, env)
}

/// Resolve a term under the current bindings, `None` if any variable is unbound
pub fn resolve(term: &Term, env: &BindingEnvironment) -> Option<Node> {
    match term {
        Term::Constant(c) => Some(c.clone()),
        Term::Variable(v) => env.get(v.slot()).cloned(),
        Term::Functor(f) => {
            let args = f.args().iter().map(|a| resolve(a, env)).collect::<Option<Vec<_>>>()?;
            Some(Node::functor(f.name(), args))
        }
    }
}

/// Instantiate a term; an unbound variable is an engine fault
pub fn instantiate_term(term: &Term, env: &BindingEnvironment) -> RuleResult<Node> {
    match term {
        Term::Constant(c) => Ok(c.clone()),
        Term::Variable(v) => env
            .get(v.slot())
            .cloned()
            .ok_or_else(|| RuleError::unbound_variable(v.name())),
        Term::Functor(f) => {
            let args = f
                .args()
                .iter()
                .map(|a| instantiate_term(a, env))
                .collect::<RuleResult<Vec<_>>>()?;
            Ok(Node::functor(f.name(), args))
        }
    }
}

/// Instantiate a pattern into a ground triple
pub fn instantiate(pattern: &TriplePattern, env: &BindingEnvironment) -> RuleResult<Triple> {
    Ok(Triple::new(
        instantiate_term(&pattern.subject, env)?,
        instantiate_term(&pattern.predicate, env)?,
        instantiate_term(&pattern.object, env)?,
    ))
}

/// Turn a pattern into a lookup goal: resolved positions are ground, the rest wildcards
pub fn to_goal(pattern: &TriplePattern, env: &BindingEnvironment) -> Goal {
    Goal::new(
        resolve(&pattern.subject, env),
        resolve(&pattern.predicate, env),
        resolve(&pattern.object, env),
    )
}

/// Whether a term has no unbound variables under the current bindings
pub fn is_ground(term: &Term, env: &BindingEnvironment) -> bool {
    match term {
        Term::Constant(_) => true,
        Term::Variable(v) => env.is_bound(v.slot()),
        Term::Functor(f) => f.args().iter().all(|a| is_ground(a, env)),
    }
}
