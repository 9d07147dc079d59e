//! Side-effecting builtins: printing, retraction, tabling and hiding directives

use tracing::info;

use crate::builtins::helpers::{all_args, arg};
use crate::builtins::value::{integer, lexical};
use crate::builtins::{Builtin, RuleContext};
use crate::error::{ErrorCode, RuleError, RuleResult};
use crate::rule::Clause;
use crate::term::{Term, Triple};
use crate::unify;

use super::BuiltinRegistry;

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register(Print);
    registry.register(RemoveMatch);
    registry.register(DropMatch);
    registry.register(Table);
    registry.register(TableAll);
    registry.register(Hide);
}

/// `print(a b ...)`: write the arguments to stdout
///
/// Usable in bodies (always succeeds) and heads.
#[derive(Debug)]
pub struct Print;

impl Print {
    fn emit(args: &[Term], ctx: &dyn RuleContext) {
        let line = args
            .iter()
            .map(|a| match unify::resolve(a, ctx.env()) {
                Some(node) if node.is_literal() => lexical(&node),
                Some(node) => node.to_string(),
                None => a.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        info!(rule = ctx.rule().display_name(), "print: {}", line);
        println!("{}", line);
    }
}

impl Builtin for Print {
    fn name(&self) -> &str {
        "print"
    }

    fn is_head_action(&self) -> bool {
        true
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        Self::emit(args, ctx);
        true
    }

    fn head_action(&self, args: &[Term], ctx: &mut dyn RuleContext) -> RuleResult<()> {
        Self::emit(args, ctx);
        Ok(())
    }
}

/// Instantiate the body patterns named by the index arguments
fn indexed_matches(name: &str, args: &[Term], ctx: &dyn RuleContext) -> RuleResult<Vec<Triple>> {
    let mut triples = Vec::with_capacity(args.len());
    for i in 0..args.len() {
        let index = arg(args, i, ctx)
            .as_ref()
            .and_then(integer)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| crate::rule_error!(ErrorCode::BuiltinFailed, "{} expects body clause indices", name))?;
        match ctx.rule().body().get(index) {
            Some(Clause::Pattern(pattern)) => triples.push(unify::instantiate(pattern, ctx.env())?),
            _ => {
                return Err(crate::rule_error!(
                    ErrorCode::BuiltinFailed,
                    "{}({}) does not name a triple pattern in the body",
                    name,
                    index
                )
                .with_context("rule", ctx.rule().to_string()))
            }
        }
    }
    Ok(triples)
}

/// `remove(n ...)`: retract the triples matched by body clauses n, ...
///
/// Consequences of the removed triples are retracted too.
#[derive(Debug)]
pub struct RemoveMatch;

impl Builtin for RemoveMatch {
    fn name(&self) -> &str {
        "remove"
    }

    fn is_body_test(&self) -> bool {
        false
    }

    fn is_head_action(&self) -> bool {
        true
    }

    fn head_action(&self, args: &[Term], ctx: &mut dyn RuleContext) -> RuleResult<()> {
        for triple in indexed_matches(self.name(), args, ctx)? {
            ctx.request_remove(triple);
        }
        Ok(())
    }
}

/// `drop(n ...)`: delete the matched triples without retracting what they support
#[derive(Debug)]
pub struct DropMatch;

impl Builtin for DropMatch {
    fn name(&self) -> &str {
        "drop"
    }

    fn is_body_test(&self) -> bool {
        false
    }

    fn is_head_action(&self) -> bool {
        true
    }

    fn head_action(&self, args: &[Term], ctx: &mut dyn RuleContext) -> RuleResult<()> {
        for triple in indexed_matches(self.name(), args, ctx)? {
            ctx.request_drop(triple);
        }
        Ok(())
    }
}

/// `table(p ...)`: memoize backward goals on predicates p, ...
#[derive(Debug)]
pub struct Table;

impl Builtin for Table {
    fn name(&self) -> &str {
        "table"
    }

    fn is_body_test(&self) -> bool {
        false
    }

    fn is_head_action(&self) -> bool {
        true
    }

    fn head_action(&self, args: &[Term], ctx: &mut dyn RuleContext) -> RuleResult<()> {
        let predicates = all_args(args, ctx).ok_or_else(|| {
            RuleError::new(ErrorCode::BuiltinFailed, "table() arguments must be ground predicates")
        })?;
        for predicate in predicates {
            ctx.set_tabled(predicate);
        }
        Ok(())
    }
}

/// `tableAll()`: memoize every backward goal
#[derive(Debug)]
pub struct TableAll;

impl Builtin for TableAll {
    fn name(&self) -> &str {
        "tableAll"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(0)
    }

    fn is_body_test(&self) -> bool {
        false
    }

    fn is_head_action(&self) -> bool {
        true
    }

    fn head_action(&self, _args: &[Term], ctx: &mut dyn RuleContext) -> RuleResult<()> {
        ctx.table_all();
        Ok(())
    }
}

/// `hide(n ...)`: keep triples that mention n, ... out of query results
///
/// Rules still see the hidden triples.
#[derive(Debug)]
pub struct Hide;

impl Builtin for Hide {
    fn name(&self) -> &str {
        "hide"
    }

    fn is_body_test(&self) -> bool {
        false
    }

    fn is_head_action(&self) -> bool {
        true
    }

    fn head_action(&self, args: &[Term], ctx: &mut dyn RuleContext) -> RuleResult<()> {
        let nodes = all_args(args, ctx)
            .ok_or_else(|| RuleError::new(ErrorCode::BuiltinFailed, "hide() arguments must be bound"))?;
        for node in nodes {
            ctx.hide(node);
        }
        Ok(())
    }
}
