//! Blank node representation

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for generating unique blank node labels
static BLANK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A blank node (anonymous node), identified by its label
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlankNode {
    label: Arc<str>,
}

impl BlankNode {
    /// Create a fresh blank node with a unique label
    pub fn fresh() -> Self {
        let id = BLANK_COUNTER.fetch_add(1, Ordering::SeqCst);
        BlankNode {
            label: Arc::from(format!("genid{}", id)),
        }
    }

    /// Create a blank node with a label
    pub fn labeled(label: impl Into<String>) -> Self {
        BlankNode {
            label: Arc::from(label.into()),
        }
    }

    /// Get the label
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.label)
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.label)
    }
}
