//! Binding and term-kind tests

use crate::builtins::helpers::arg;
use crate::builtins::{Builtin, RuleContext};
use crate::term::{Goal, Node, Term};
use crate::unify;

use super::BuiltinRegistry;

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register(Bound);
    registry.register(Unbound);
    registry.register(IsLiteral);
    registry.register(NotLiteral);
    registry.register(IsFunctor);
    registry.register(NotFunctor);
    registry.register(IsBNode);
    registry.register(NotBNode);
    registry.register(NoValue);
}

/// `bound(?x ...)`: every argument has a value
#[derive(Debug)]
pub struct Bound;

impl Builtin for Bound {
    fn name(&self) -> &str {
        "bound"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        args.iter().all(|a| unify::is_ground(a, ctx.env()))
    }
}

/// `unbound(?x ...)`: no argument has a value
#[derive(Debug)]
pub struct Unbound;

impl Builtin for Unbound {
    fn name(&self) -> &str {
        "unbound"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        args.iter().all(|a| !unify::is_ground(a, ctx.env()))
    }
}

/// Generates a one-argument test on the resolved node
macro_rules! node_test {
    ($ty:ident, $name:expr, $test:expr) => {
        #[derive(Debug)]
        pub struct $ty;

        impl Builtin for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn arg_length(&self) -> Option<usize> {
                Some(1)
            }

            fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
                let test: fn(&Node) -> bool = $test;
                arg(args, 0, ctx).map_or(false, |n| test(&n))
            }
        }
    };
}

node_test!(IsLiteral, "isLiteral", |n| n.is_literal());
node_test!(NotLiteral, "notLiteral", |n| !n.is_literal());
node_test!(IsFunctor, "isFunctor", |n| n.is_functor());
node_test!(NotFunctor, "notFunctor", |n| !n.is_functor());
node_test!(IsBNode, "isBNode", |n| n.is_blank());
node_test!(NotBNode, "notBNode", |n| !n.is_blank());

/// `noValue(s p)` or `noValue(s p o)`: no visible triple matches
///
/// Unbound arguments act as wildcards.
#[derive(Debug)]
pub struct NoValue;

impl Builtin for NoValue {
    fn name(&self) -> &str {
        "noValue"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        if args.len() < 2 || args.len() > 3 {
            return false;
        }
        let goal = Goal::new(arg(args, 0, ctx), arg(args, 1, ctx), arg(args, 2, ctx));
        !ctx.contains(&goal)
    }
}
