//! Arithmetic builtins

use std::cmp::Ordering;

use crate::builtins::helpers::{arg, bind_arg, get_number};
use crate::builtins::value::{self, Number};
use crate::builtins::{Builtin, RuleContext};
use crate::term::Term;

/// Apply an exact integer operation, or fall back to floating point
fn combine(
    a: Number,
    b: Number,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Option<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x, y).map(Number::Int),
        (x, y) => {
            let r = float_op(x.as_f64(), y.as_f64());
            if r.is_finite() {
                Some(Number::Float(r))
            } else {
                None
            }
        }
    }
}

/// Shared body of the three-argument arithmetic builtins
fn arith3(
    args: &[Term],
    ctx: &mut dyn RuleContext,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> bool {
    let (Some(a), Some(b)) = (get_number(args, 0, ctx), get_number(args, 1, ctx)) else {
        return false;
    };
    match combine(a, b, int_op, float_op) {
        Some(result) => bind_arg(args, 2, result.to_node(), ctx),
        None => false,
    }
}

/// `sum(a b c)`: a + b = c
#[derive(Debug)]
pub struct Sum;

impl Builtin for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(3)
    }

    fn description(&self) -> &str {
        "sum(a b c) binds c to a + b"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        arith3(args, ctx, i64::checked_add, |x, y| x + y)
    }
}

/// `difference(a b c)`: a - b = c
#[derive(Debug)]
pub struct Difference;

impl Builtin for Difference {
    fn name(&self) -> &str {
        "difference"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(3)
    }

    fn description(&self) -> &str {
        "difference(a b c) binds c to a - b"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        arith3(args, ctx, i64::checked_sub, |x, y| x - y)
    }
}

/// `product(a b c)`: a * b = c
#[derive(Debug)]
pub struct Product;

impl Builtin for Product {
    fn name(&self) -> &str {
        "product"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(3)
    }

    fn description(&self) -> &str {
        "product(a b c) binds c to a * b"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        arith3(args, ctx, i64::checked_mul, |x, y| x * y)
    }
}

/// `quotient(a b c)`: a / b = c; division by zero fails
#[derive(Debug)]
pub struct Quotient;

impl Builtin for Quotient {
    fn name(&self) -> &str {
        "quotient"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(3)
    }

    fn description(&self) -> &str {
        "quotient(a b c) binds c to a / b"
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        arith3(args, ctx, i64::checked_div, |x, y| x / y)
    }
}

/// Bind the third argument to whichever operand wins `pick`
fn select(args: &[Term], ctx: &mut dyn RuleContext, pick: Ordering) -> bool {
    let (Some(a), Some(b)) = (arg(args, 0, ctx), arg(args, 1, ctx)) else {
        return false;
    };
    let (Some(x), Some(y)) = (value::number(&a), value::number(&b)) else {
        return false;
    };
    let chosen = match x.compare(y) {
        Some(ord) if ord == pick || ord == Ordering::Equal => a,
        Some(_) => b,
        None => return false,
    };
    bind_arg(args, 2, chosen, ctx)
}

/// `min(a b c)`: c is the smaller of a and b
#[derive(Debug)]
pub struct Min;

impl Builtin for Min {
    fn name(&self) -> &str {
        "min"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(3)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        select(args, ctx, Ordering::Less)
    }
}

/// `max(a b c)`: c is the larger of a and b
#[derive(Debug)]
pub struct Max;

impl Builtin for Max {
    fn name(&self) -> &str {
        "max"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(3)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        select(args, ctx, Ordering::Greater)
    }
}

/// `addOne(a b)`: b = a + 1
#[derive(Debug)]
pub struct AddOne;

impl Builtin for AddOne {
    fn name(&self) -> &str {
        "addOne"
    }

    fn arg_length(&self) -> Option<usize> {
        Some(2)
    }

    fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
        let Some(a) = get_number(args, 0, ctx) else {
            return false;
        };
        match combine(a, Number::Int(1), i64::checked_add, |x, y| x + y) {
            Some(result) => bind_arg(args, 1, result.to_node(), ctx),
            None => false,
        }
    }
}
