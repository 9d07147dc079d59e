//! Answer tables for goal generators

use indexmap::IndexSet;

use crate::term::{Goal, Node, Triple};

pub type GeneratorId = usize;

/// Lifecycle of a generator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorState {
    /// Created, rules not yet expanded
    New,
    /// Expanding; answers may still arrive
    Generating,
    /// Every alternative exhausted; the answer table is final
    Complete,
    /// No open query needs it; pending work is parked until a call resumes it
    Suspended,
    /// Private work of an abandoned query, never resumed
    Dropped,
}

/// A rule body suspended at a clause
#[derive(Clone, Debug)]
pub struct Frame {
    /// Generator this frame produces answers for
    pub owner: GeneratorId,
    /// Index of the backward rule
    pub rule: usize,
    /// Next body clause to run
    pub clause: usize,
    pub slots: Vec<Option<Node>>,
    /// Answers consumed by body patterns so far
    pub matched: Vec<Triple>,
}

/// A frame waiting on a generator's answers
#[derive(Debug)]
pub struct Consumer {
    pub frame: Frame,
    /// Answers already delivered to this frame
    pub cursor: usize,
}

/// The producer for one goal
///
/// Tabled goals share one generator per distinct goal; untabled calls get a
/// private generator with a single consumer.
#[derive(Debug)]
pub struct Generator {
    pub goal: Goal,
    pub tabled: bool,
    pub state: GeneratorState,
    pub answers: IndexSet<Triple>,
    pub consumers: Vec<Consumer>,
    /// Tasks set aside while suspended
    pub parked: Vec<Task>,
}

impl Generator {
    pub fn new(goal: Goal, tabled: bool) -> Self {
        Generator {
            goal,
            tabled,
            state: GeneratorState::New,
            answers: IndexSet::new(),
            consumers: Vec::new(),
            parked: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == GeneratorState::Complete
    }

    /// Whether work for this generator may run
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            GeneratorState::New | GeneratorState::Generating | GeneratorState::Complete
        )
    }

    /// Record an answer; false if it was already in the table
    pub fn add_answer(&mut self, triple: Triple) -> bool {
        self.answers.insert(triple)
    }
}

/// Work items for the trampoline
#[derive(Debug)]
pub enum Task {
    /// Expand a new generator: stored facts, then matching rules
    Seed(GeneratorId),
    /// Run a frame forward from its current clause
    Run(Frame),
    /// Deliver pending answers of a generator to one consumer
    Feed(GeneratorId, usize),
}
