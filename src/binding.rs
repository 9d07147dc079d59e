//! Variable binding environment with a trail
//!
//! Bindings live in a flat array indexed by variable slot. Every binding
//! made records its slot on the trail; `push` marks the trail height and
//! `unwind` clears everything bound since the matching mark, so restoring a
//! choice point costs only the bindings it made.

use std::fmt;

use crate::error::{ErrorCode, RuleError, RuleResult};
use crate::term::Node;

/// Slot-indexed bindings plus trail and marks for backtracking
#[derive(Clone, Default)]
pub struct BindingEnvironment {
    slots: Vec<Option<Node>>,
    trail: Vec<usize>,
    marks: Vec<usize>,
}

impl BindingEnvironment {
    /// Create an environment with `size` empty slots
    pub fn new(size: usize) -> Self {
        BindingEnvironment {
            slots: vec![None; size],
            trail: Vec::new(),
            marks: Vec::new(),
        }
    }

    /// Start from an existing slot array, e.g. a suspended frame
    pub fn from_slots(slots: Vec<Option<Node>>) -> Self {
        BindingEnvironment {
            slots,
            trail: Vec::new(),
            marks: Vec::new(),
        }
    }

    /// Clear every binding and mark, resizing to `size` slots
    pub fn reset(&mut self, size: usize) {
        self.slots.clear();
        self.slots.resize(size, None);
        self.trail.clear();
        self.marks.clear();
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current binding of a slot
    pub fn get(&self, slot: usize) -> Option<&Node> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn is_bound(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    /// Bind a slot, or check an existing binding
    ///
    /// Returns false if the slot already holds a value that differs from
    /// this one. Numbers and dates compare by value.
    pub fn bind(&mut self, slot: usize, value: Node) -> bool {
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, None);
        }
        match &self.slots[slot] {
            Some(existing) => crate::builtins::value::same_value(existing, &value),
            None => {
                self.slots[slot] = Some(value);
                self.trail.push(slot);
                true
            }
        }
    }

    /// Mark the current trail height
    pub fn push(&mut self) {
        self.marks.push(self.trail.len());
    }

    /// Undo every binding made since the matching `push`
    pub fn unwind(&mut self) -> RuleResult<()> {
        let mark = self.pop_mark("unwind")?;
        for slot in self.trail.drain(mark..) {
            self.slots[slot] = None;
        }
        Ok(())
    }

    /// Drop the latest mark, keeping the bindings made since it
    pub fn commit(&mut self) -> RuleResult<()> {
        self.pop_mark("commit").map(|_| ())
    }

    /// Number of outstanding marks
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Copy of the slot array
    pub fn snapshot(&self) -> Vec<Option<Node>> {
        self.slots.clone()
    }

    pub fn slots(&self) -> &[Option<Node>] {
        &self.slots
    }

    fn pop_mark(&mut self, op: &str) -> RuleResult<usize> {
        self.marks.pop().ok_or_else(|| {
            RuleError::new(ErrorCode::BindingStackUnderflow, format!("{} without a matching push", op))
        })
    }
}

impl fmt::Debug for BindingEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match slot {
                Some(node) => write!(f, "{}={}", i, node)?,
                None => write!(f, "{}=_", i)?,
            }
        }
        write!(f, "]")
    }
}
