//! String, URI and node construction builtins

use std::hash::{Hash, Hasher};

use fnv::FnvHasher;
use regex::Regex;

use crate::builtins::helpers::{all_args, arg, bind_arg, bind_or_check};
use crate::builtins::value::lexical;
use crate::builtins::{Builtin, RuleContext};
use crate::term::{Node, Term};

use super::BuiltinRegistry;

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register(StrConcat);
    registry.register(UriConcat);
    registry.register(RegexMatch);
    registry.register(MakeTemp);
    registry.register(MakeSkolem);
    registry.register(MakeInstance);
}

/// Concatenate the lexical forms of every argument except the last
fn concat(args: &[Term], ctx: &dyn RuleContext) -> Option<String> {
    let (_, inputs) = args.split_last()?;
    let nodes = all_args(inputs, ctx)?;
    Some(nodes.iter().map(lexical).collect())
}

/// `strConcat(a b ... out)`: out is the plain literal joining a, b, ...
#[derive(Debug)]
pub struct StrConcat;

impl Builtin for StrConcat {
    fn name(&self) -> &str {
        "strConcat"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        match concat(args, ctx) {
            Some(text) => bind_arg(args, args.len() - 1, Node::literal(text), ctx),
            None => false,
        }
    }
}

/// `uriConcat(a b ... out)`: out is the URI joining a, b, ...
#[derive(Debug)]
pub struct UriConcat;

impl Builtin for UriConcat {
    fn name(&self) -> &str {
        "uriConcat"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        match concat(args, ctx) {
            Some(text) => bind_arg(args, args.len() - 1, Node::uri(text), ctx),
            None => false,
        }
    }
}

/// `regex(text pattern [group1 group2 ...])`
///
/// The whole text must match. Extra arguments bind to capture groups.
#[derive(Debug)]
pub struct RegexMatch;

impl Builtin for RegexMatch {
    fn name(&self) -> &str {
        "regex"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        let (Some(text), Some(pattern)) = (arg(args, 0, ctx), arg(args, 1, ctx)) else {
            return false;
        };
        let Ok(re) = Regex::new(&format!("^(?:{})$", lexical(&pattern))) else {
            return false;
        };
        let text = lexical(&text);
        let Some(caps) = re.captures(&text) else {
            return false;
        };
        for (i, target) in args.iter().enumerate().skip(2) {
            let Some(group) = caps.get(i - 1) else {
                return false;
            };
            if !bind_or_check(target, Node::literal(group.as_str()), ctx) {
                return false;
            }
        }
        true
    }
}

/// `makeTemp(?x)`: bind ?x to a fresh blank node
#[derive(Debug)]
pub struct MakeTemp;

impl Builtin for MakeTemp {
    fn name(&self) -> &str {
        "makeTemp"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(1)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        bind_arg(args, 0, Node::fresh_blank(), ctx)
    }
}

/// A blank node fixed by a tag and a node sequence
///
/// Equal inputs give the same node in every graph and every run.
fn skolem(tag: &str, nodes: &[Node]) -> Node {
    let mut hasher = FnvHasher::default();
    tag.hash(&mut hasher);
    nodes.hash(&mut hasher);
    Node::blank(format!("{}{:016x}", tag, hasher.finish()))
}

/// `makeSkolem(?x a b ...)`: bind ?x to a blank node determined by a, b, ...
#[derive(Debug)]
pub struct MakeSkolem;

impl Builtin for MakeSkolem {
    fn name(&self) -> &str {
        "makeSkolem"
    }

    fn description(&self) -> &str {
        "bind the first argument to a blank node unique to the remaining arguments"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        let Some((_, inputs)) = args.split_first() else {
            return false;
        };
        match all_args(inputs, ctx) {
            Some(nodes) => bind_arg(args, 0, skolem("sk", &nodes), ctx),
            None => false,
        }
    }
}

/// `makeInstance(?x ?p [?class] ?t)`: the stand-in value of property ?p on ?x
///
/// Every call with the same instance, property and class yields the same
/// blank node, so backward rules can talk about a value that is known to
/// exist without minting a new one each time they run.
#[derive(Debug)]
pub struct MakeInstance;

impl Builtin for MakeInstance {
    fn name(&self) -> &str {
        "makeInstance"
    }

    fn description(&self) -> &str {
        "bind the last argument to the blank node standing for a property value"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        if !(3..=4).contains(&args.len()) {
            return false;
        }
        let Some(key) = all_args(&args[..args.len() - 1], ctx) else {
            return false;
        };
        bind_arg(args, args.len() - 1, skolem("mi", &key), ctx)
    }
}
