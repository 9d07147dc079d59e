//! Value comparison builtins
//!
//! All of these compare by typed value (see [`crate::builtins::value`]).
//! Unbound arguments and incomparable values fail the call.

use std::cmp::Ordering;

use crate::builtins::helpers::arg;
use crate::builtins::value;
use crate::builtins::{Builtin, RuleContext};
use crate::term::Term;

fn ordering(args: &[Term], ctx: &dyn RuleContext) -> Option<Ordering> {
    let a = arg(args, 0, ctx)?;
    let b = arg(args, 1, ctx)?;
    value::compare(&a, &b)
}

/// `lessThan(a b)`: a < b
#[derive(Debug)]
pub struct LessThan;

impl Builtin for LessThan {
    fn name(&self) -> &str {
        "lessThan"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn description(&self) -> &str {
        "lessThan(a b) holds if a < b"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        ordering(args, ctx) == Some(Ordering::Less)
    }
}

/// `greaterThan(a b)`: a > b
#[derive(Debug)]
pub struct GreaterThan;

impl Builtin for GreaterThan {
    fn name(&self) -> &str {
        "greaterThan"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn description(&self) -> &str {
        "greaterThan(a b) holds if a > b"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        ordering(args, ctx) == Some(Ordering::Greater)
    }
}

/// `le(a b)`: a <= b
#[derive(Debug)]
pub struct Le;

impl Builtin for Le {
    fn name(&self) -> &str {
        "le"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        matches!(ordering(args, ctx), Some(Ordering::Less | Ordering::Equal))
    }
}

/// `ge(a b)`: a >= b
#[derive(Debug)]
pub struct Ge;

impl Builtin for Ge {
    fn name(&self) -> &str {
        "ge"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        matches!(ordering(args, ctx), Some(Ordering::Greater | Ordering::Equal))
    }
}

/// `equal(a b)`: same value, or the same node
#[derive(Debug)]
pub struct Equal;

impl Builtin for Equal {
    fn name(&self) -> &str {
        "equal"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        match (arg(args, 0, ctx), arg(args, 1, ctx)) {
            (Some(a), Some(b)) => value::same_value(&a, &b),
            _ => false,
        }
    }
}

/// `notEqual(a b)`: different values
#[derive(Debug)]
pub struct NotEqual;

impl Builtin for NotEqual {
    fn name(&self) -> &str {
        "notEqual"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        match (arg(args, 0, ctx), arg(args, 1, ctx)) {
            (Some(a), Some(b)) => !value::same_value(&a, &b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingEnvironment;
    use crate::builtins::StoreContext;
    use crate::rule::Rule;
    use crate::store::Store;
    use crate::term::uri::ns;
    use crate::term::Node;

    fn holds(builtin: &dyn Builtin, a: Node, b: Node) -> bool {
        let rule = Rule::forward("cmp", Vec::new(), Vec::new());
        let store = Store::new();
        let mut ctx = StoreContext::new(BindingEnvironment::new(0), &rule, &store);
        builtin.body_call(&[Term::Constant(a), Term::Constant(b)], &mut ctx)
    }

    #[test]
    fn test_numeric_subtypes_compare_by_value() {
        let long_three = Node::typed_literal("3", ns::xsd("long"));
        assert!(holds(&LessThan, Node::integer(2), long_three.clone()));
        assert!(holds(&Equal, Node::integer(3), long_three.clone()));
        assert!(holds(&Ge, long_three, Node::double(2.5)));
        assert!(!holds(&GreaterThan, Node::integer(2), Node::integer(2)));
    }

    #[test]
    fn test_date_times_compare_by_instant() {
        let early = Node::typed_literal("2001-01-01T10:00:00Z", ns::xsd("dateTime"));
        let late = Node::typed_literal("2001-01-01T12:00:00+01:00", ns::xsd("dateTime"));
        assert!(holds(&LessThan, early.clone(), late.clone()));
        assert!(holds(&Le, early, late));
    }

    #[test]
    fn test_incomparable_values_fail() {
        let word = Node::literal("three");
        assert!(!holds(&LessThan, Node::integer(3), word.clone()));
        assert!(!holds(&GreaterThan, word.clone(), Node::integer(3)));
        assert!(!holds(&Equal, Node::uri("a"), Node::uri("b")));
        assert!(holds(&NotEqual, Node::uri("a"), Node::uri("b")));
        assert!(holds(&Equal, word.clone(), word));
    }
}
