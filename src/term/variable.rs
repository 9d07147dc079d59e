//! Rule variables
//!
//! A variable carries its source name for printing and a slot index that
//! addresses the binding environment directly. Slots are assigned per rule
//! in order of first appearance, so two variables are the same variable
//! exactly when their slots agree.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A variable in a rule clause
#[derive(Clone)]
pub struct Variable {
    name: Arc<str>,
    slot: usize,
}

impl Variable {
    /// Create a variable bound to a binding-environment slot
    pub fn new(name: impl Into<String>, slot: usize) -> Self {
        Variable {
            name: Arc::from(name.into()),
            slot,
        }
    }

    /// Get the variable name (without the leading `?`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the slot index
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}#{}", self.name, self.slot)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable() {
        let v = Variable::new("x", 0);
        assert_eq!(v.name(), "x");
        assert_eq!(v.slot(), 0);
        assert_eq!(format!("{}", v), "?x");
    }

    #[test]
    fn test_variable_equality_is_by_slot() {
        assert_eq!(Variable::new("x", 1), Variable::new("y", 1));
        assert_ne!(Variable::new("x", 0), Variable::new("x", 1));
    }
}
