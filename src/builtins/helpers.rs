//! Shared utility functions for builtin implementations
//!
//! This module provides common operations used across the builtin families:
//! - Argument resolution under the current bindings
//! - Value extraction (numbers, integers, lists)
//! - Result binding (match or bind)

use crate::term::{list, Node, Term};
use crate::unify;

use super::value::{self, Number};
use super::RuleContext;

// ============================================================================
// Argument access
// ============================================================================

/// Resolve argument `i` under the current bindings
///
/// Returns `None` for a missing argument or one with unbound variables.
pub fn arg(args: &[Term], i: usize, ctx: &dyn RuleContext) -> Option<Node> {
    args.get(i).and_then(|t| unify::resolve(t, ctx.env()))
}

/// Resolve every argument, failing if any is unbound
pub fn all_args(args: &[Term], ctx: &dyn RuleContext) -> Option<Vec<Node>> {
    args.iter().map(|t| unify::resolve(t, ctx.env())).collect()
}

// ============================================================================
// Value extraction
// ============================================================================

/// Numeric value of argument `i`
pub fn get_number(args: &[Term], i: usize, ctx: &dyn RuleContext) -> Option<Number> {
    arg(args, i, ctx).as_ref().and_then(value::number)
}

/// Integer value of argument `i`
pub fn get_int(args: &[Term], i: usize, ctx: &dyn RuleContext) -> Option<i64> {
    arg(args, i, ctx).as_ref().and_then(value::integer)
}

/// Elements of a cons-list argument
pub fn get_list(args: &[Term], i: usize, ctx: &dyn RuleContext) -> Option<Vec<Node>> {
    arg(args, i, ctx).as_ref().and_then(list::to_vec)
}

// ============================================================================
// Result binding
// ============================================================================

/// Bind `value` to an output argument, or check it against an existing value
///
/// An unbound variable is bound; anything else must have the same value.
pub fn bind_or_check(target: &Term, value: Node, ctx: &mut dyn RuleContext) -> bool {
    match target {
        Term::Variable(v) if !ctx.env().is_bound(v.slot()) => ctx.env_mut().bind(v.slot(), value),
        _ => match unify::resolve(target, ctx.env()) {
            Some(existing) => value::same_value(&existing, &value),
            None => {
                let env = ctx.env_mut();
                env.push();
                let ok = unify::match_term(target, &value, env);
                if ok {
                    env.commit().is_ok()
                } else {
                    let _ = env.unwind();
                    false
                }
            }
        },
    }
}

/// Bind output argument `i`, failing when the call has no such argument
pub fn bind_arg(args: &[Term], i: usize, value: Node, ctx: &mut dyn RuleContext) -> bool {
    match args.get(i) {
        Some(target) => bind_or_check(target, value, ctx),
        None => false,
    }
}
