//! Builtins over functor-encoded cons lists
//!
//! Lists are ordinary `cons(first rest)` values ending in `rdf:nil`; these
//! builtins walk that structure and never treat it as anything special for
//! unification. Element comparison is by value.

use crate::builtins::helpers::{arg, bind_arg, get_int, get_list};
use crate::builtins::value::same_value;
use crate::builtins::{Builtin, RuleContext};
use crate::term::{Node, Term};

use super::BuiltinRegistry;

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register(ListLength);
    registry.register(ListEntry);
    registry.register(ListEqual);
    registry.register(ListNotEqual);
    registry.register(ListContains);
    registry.register(ListNotContains);
}

/// Same length, and every element has a distinct same-valued partner
fn lists_equal(a: &[Node], b: &[Node]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unused: Vec<&Node> = b.iter().collect();
    a.iter().all(|x| match unused.iter().position(|y| same_value(x, y)) {
        Some(i) => {
            unused.swap_remove(i);
            true
        }
        None => false,
    })
}

/// `listLength(l n)`
#[derive(Debug)]
pub struct ListLength;

impl Builtin for ListLength {
    fn name(&self) -> &str {
        "listLength"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        match get_list(args, 0, ctx) {
            Some(items) => bind_arg(args, 1, Node::integer(items.len() as i64), ctx),
            None => false,
        }
    }
}

/// `listEntry(l i e)`: e is the element at zero-based index i
#[derive(Debug)]
pub struct ListEntry;

impl Builtin for ListEntry {
    fn name(&self) -> &str {
        "listEntry"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(3)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        let (Some(items), Some(index)) = (get_list(args, 0, ctx), get_int(args, 1, ctx)) else {
            return false;
        };
        match usize::try_from(index).ok().and_then(|i| items.into_iter().nth(i)) {
            Some(entry) => bind_arg(args, 2, entry, ctx),
            None => false,
        }
    }
}

/// `listEqual(a b)`: same elements by value, in any order
#[derive(Debug)]
pub struct ListEqual;

impl Builtin for ListEqual {
    fn name(&self) -> &str {
        "listEqual"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        match (get_list(args, 0, ctx), get_list(args, 1, ctx)) {
            (Some(a), Some(b)) => lists_equal(&a, &b),
            _ => false,
        }
    }
}

/// `listNotEqual(a b)`
#[derive(Debug)]
pub struct ListNotEqual;

impl Builtin for ListNotEqual {
    fn name(&self) -> &str {
        "listNotEqual"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        match (get_list(args, 0, ctx), get_list(args, 1, ctx)) {
            (Some(a), Some(b)) => !lists_equal(&a, &b),
            _ => false,
        }
    }
}

fn contains(args: &[Term], ctx: &dyn RuleContext) -> Option<bool> {
    let items = get_list(args, 0, ctx)?;
    let wanted = arg(args, 1, ctx)?;
    Some(items.iter().any(|item| same_value(item, &wanted)))
}

/// `listContains(l e)`
#[derive(Debug)]
pub struct ListContains;

impl Builtin for ListContains {
    fn name(&self) -> &str {
        "listContains"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        contains(args, ctx) == Some(true)
    }
}

/// `listNotContains(l e)`
#[derive(Debug)]
pub struct ListNotContains;

impl Builtin for ListNotContains {
    fn name(&self) -> &str {
        "listNotContains"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        contains(args, ctx) == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::uri::ns;

    #[test]
    fn test_lists_equal_by_value_any_order() {
        let p = vec![Node::uri("C1"), Node::integer(3), Node::uri("C3")];
        let q = vec![Node::uri("C3"), Node::uri("C1"), Node::typed_literal("3", ns::xsd("long"))];
        let r = vec![Node::uri("C3"), Node::uri("C1"), Node::typed_literal("2", ns::xsd("long"))];
        assert!(lists_equal(&p, &q));
        assert!(!lists_equal(&p, &r));
        assert!(!lists_equal(&p, &p[..2]));
    }
}
