//! Arithmetic and comparison builtins
//!
//! Arithmetic builtins take their operands first and bind (or check) the
//! result in the last argument:
//! - `sum(a b c)` means a + b = c
//! - `difference(a b c)` means a - b = c
//! - `product(a b c)` means a * b = c
//! - `quotient(a b c)` means a / b = c, integer division for integer operands
//! - `min(a b c)`, `max(a b c)`
//! - `addOne(a b)` means a + 1 = b
//!
//! Integer arithmetic stays exact; any floating operand makes the result an
//! `xsd:double`. Non-numeric operands fail the call.

mod arithmetic;
mod comparison;

pub use arithmetic::*;
pub use comparison::*;

use super::BuiltinRegistry;

pub(super) fn register(registry: &mut BuiltinRegistry) {
    // Arithmetic
    registry.register(Sum);
    registry.register(Difference);
    registry.register(Product);
    registry.register(Quotient);
    registry.register(Min);
    registry.register(Max);
    registry.register(AddOne);

    // Comparison
    registry.register(LessThan);
    registry.register(GreaterThan);
    registry.register(Le);
    registry.register(Ge);
    registry.register(Equal);
    registry.register(NotEqual);
}
