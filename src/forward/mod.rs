//! Forward (RETE) engine with truth maintenance
//!
//! The engine owns the base facts it was bound to and the working fact set
//! the forward rules see (base plus deductions). Changes run synchronously
//! to a fixpoint:
//!
//! - An added fact is injected into the [`rete::Network`]; completed body
//!   matches queue as firings on the agenda. Firing a rule instantiates its
//!   heads, runs head actions, then applies any `remove`/`drop` requests the
//!   actions made. New conclusions are injected in turn.
//! - A removed fact is retracted through the [`support::SupportGraph`]:
//!   everything it supported is deleted, then facts with another valid
//!   origin are re-asserted and propagate again.
//!
//! Axioms fire once, when the engine is prepared and before any data is
//! injected.

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, info, trace};

use crate::binding::BindingEnvironment;
use crate::builtins::{BuiltinRegistry, RuleContext};
use crate::derivation::{Derivation, DerivationStore};
use crate::error::{RuleError, RuleResult};
use crate::rule::Rule;
use crate::store::{Store, TripleStore};
use crate::term::{Goal, Node, Triple};
use crate::unify;

pub mod rete;
pub mod support;

use rete::{Firing, HeadNode, Network};
use support::SupportGraph;

/// Counters for one forward engine
#[derive(Clone, Debug, Default)]
pub struct ForwardStats {
    /// Rule firings that ran their heads
    pub rules_fired: usize,
    /// Facts added by rule heads
    pub triples_derived: usize,
    /// Facts deleted by retraction, including ones later re-asserted
    pub triples_retracted: usize,
    /// Facts re-asserted after a retraction
    pub triples_rederived: usize,
}

/// Head-action context for one firing
///
/// Mutations are collected, not applied: the engine applies them once every
/// head clause of the firing has run.
struct FiringContext<'a> {
    env: BindingEnvironment,
    rule: &'a Rule,
    facts: &'a Store,
    removals: Vec<Triple>,
    drops: Vec<Triple>,
    tabled: Vec<Node>,
    table_all: bool,
    hidden: Vec<Node>,
}

impl RuleContext for FiringContext<'_> {
    fn env(&self) -> &BindingEnvironment {
        &self.env
    }

    fn env_mut(&mut self) -> &mut BindingEnvironment {
        &mut self.env
    }

    fn rule(&self) -> &Rule {
        self.rule
    }

    fn contains(&self, goal: &Goal) -> bool {
        !self.facts.find(goal).is_empty()
    }

    fn find(&self, goal: &Goal) -> Vec<Triple> {
        self.facts.find(goal)
    }

    fn request_remove(&mut self, triple: Triple) {
        self.removals.push(triple);
    }

    fn request_drop(&mut self, triple: Triple) {
        self.drops.push(triple);
    }

    fn set_tabled(&mut self, predicate: Node) {
        self.tabled.push(predicate);
    }

    fn table_all(&mut self) {
        self.table_all = true;
    }

    fn hide(&mut self, node: Node) {
        self.hidden.push(node);
    }
}

/// What a firing produced, gathered before the engine applies it
struct Outcome {
    conclusions: Vec<Triple>,
    removals: Vec<Triple>,
    drops: Vec<Triple>,
    tabled: Vec<Node>,
    table_all: bool,
    hidden: Vec<Node>,
}

/// Forward rule engine over one base graph
#[derive(Debug)]
pub struct ForwardEngine {
    network: Network,
    base: Store,
    facts: Store,
    support: SupportGraph,
    agenda: VecDeque<Firing>,
    derivations: DerivationStore,
    log_derivations: bool,
    trace: bool,
    max_steps: usize,
    tabled: IndexSet<Node>,
    table_all: bool,
    hidden: IndexSet<Node>,
    stats: ForwardStats,
}

impl ForwardEngine {
    /// Compile forward rules; the engine starts with no data
    pub fn new(rules: &[Arc<Rule>], registry: &BuiltinRegistry) -> RuleResult<Self> {
        let network = Network::compile(rules, registry)?;
        info!(rules = network.len(), "forward network compiled");
        Ok(ForwardEngine {
            network,
            base: Store::new(),
            facts: Store::new(),
            support: SupportGraph::new(),
            agenda: VecDeque::new(),
            derivations: DerivationStore::new(),
            log_derivations: false,
            trace: false,
            max_steps: 0,
            tabled: IndexSet::new(),
            table_all: false,
            hidden: IndexSet::new(),
            stats: ForwardStats::default(),
        })
    }

    /// Enable derivation records for firings from now on
    pub fn set_derivation_logging(&mut self, enabled: bool) {
        self.log_derivations = enabled;
    }

    /// Log every rule firing
    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    /// Bound the firings of one propagation run; 0 is unlimited
    pub fn set_max_steps(&mut self, max_steps: usize) {
        self.max_steps = max_steps;
    }

    /// Fire axioms, then inject every base fact and run to a fixpoint
    ///
    /// Any previous derived state is discarded.
    pub fn prepare(&mut self, base: Store) -> RuleResult<()> {
        self.network.clear();
        self.facts.clear();
        self.support.clear();
        self.agenda.clear();
        self.derivations.clear();
        self.tabled.clear();
        self.table_all = false;
        self.hidden.clear();
        self.stats = ForwardStats::default();
        self.base = base;

        let seeded = self.network.seed(&self.facts);
        self.agenda.extend(seeded);
        self.run()?;

        let triples: Vec<Triple> = self.base.iter().cloned().collect();
        for triple in triples {
            self.support.add_asserted(triple.clone());
            self.insert_fact(triple);
        }
        self.run()?;
        debug!(base = self.base.len(), facts = self.facts.len(), "forward closure prepared");
        Ok(())
    }

    /// Add a base fact and propagate its consequences
    pub fn add(&mut self, triple: Triple) -> RuleResult<()> {
        self.base.add(triple.clone());
        self.support.add_asserted(triple.clone());
        self.insert_fact(triple);
        self.run()
    }

    /// Remove a base fact and retract what only it supported
    pub fn remove(&mut self, triple: &Triple) -> RuleResult<()> {
        self.retract(triple);
        self.run()
    }

    /// Every fact visible to rules: base plus deductions
    pub fn facts(&self) -> &Store {
        &self.facts
    }

    pub fn base(&self) -> &Store {
        &self.base
    }

    /// Facts concluded by a rule
    pub fn deductions(&self) -> Vec<Triple> {
        self.facts.iter().filter(|t| self.support.is_derived(t)).cloned().collect()
    }

    pub fn derivations(&self) -> &DerivationStore {
        &self.derivations
    }

    /// Predicates tabled by `table(...)` axioms
    pub fn tabled(&self) -> impl Iterator<Item = &Node> {
        self.tabled.iter()
    }

    /// Whether a `tableAll()` axiom fired
    pub fn tables_all(&self) -> bool {
        self.table_all
    }

    /// Whether a `hide` action covers any position of the triple
    pub fn is_hidden(&self, triple: &Triple) -> bool {
        !self.hidden.is_empty()
            && (self.hidden.contains(&triple.subject)
                || self.hidden.contains(&triple.predicate)
                || self.hidden.contains(&triple.object))
    }

    pub fn stats(&self) -> &ForwardStats {
        &self.stats
    }

    /// Make a fact visible and queue the firings it completes
    fn insert_fact(&mut self, triple: Triple) -> bool {
        if !self.facts.add(triple.clone()) {
            return false;
        }
        trace!(%triple, "injecting");
        let firings = self.network.inject(&triple, &self.facts);
        self.agenda.extend(firings);
        true
    }

    /// Delete a fact from base, working set and network
    fn delete_fact(&mut self, triple: &Triple) {
        self.base.remove(triple);
        if self.facts.remove(triple) {
            self.network.retract(triple);
        }
    }

    /// Delete-and-rederive retraction
    fn retract(&mut self, triple: &Triple) {
        self.support.remove_assertion(triple);
        self.base.remove(triple);
        let deleted = self.support.overdelete(triple);
        for fact in &deleted {
            self.delete_fact(fact);
            self.derivations.forget(fact);
        }
        self.stats.triples_retracted += deleted.len();

        let facts = &self.facts;
        let survivors: Vec<Triple> = deleted
            .iter()
            .filter(|fact| self.support.has_valid_origin(fact, |p| facts.contains(p)))
            .cloned()
            .collect();
        for fact in &deleted {
            if !survivors.contains(fact) {
                self.support.forget(fact);
            }
        }
        debug!(%triple, deleted = deleted.len(), rederived = survivors.len(), "retracted");
        self.stats.triples_rederived += survivors.len();
        for fact in survivors {
            self.insert_fact(fact);
        }
    }

    /// Delete a fact without touching what it supports
    fn drop_fact(&mut self, triple: &Triple) {
        debug!(%triple, "dropped");
        self.delete_fact(triple);
        self.support.forget(triple);
    }

    /// Drain the agenda
    fn run(&mut self) -> RuleResult<()> {
        let mut steps = 0;
        while let Some(firing) = self.agenda.pop_front() {
            steps += 1;
            if self.max_steps > 0 && steps > self.max_steps {
                self.agenda.clear();
                return Err(RuleError::step_limit(steps - 1, self.max_steps));
            }
            self.fire(firing)?;
        }
        Ok(())
    }

    fn fire(&mut self, firing: Firing) -> RuleResult<()> {
        // A premise may have gone since the firing was queued
        if !firing.token.matched.iter().all(|t| self.facts.contains(t)) {
            return Ok(());
        }
        let Some(rule) = self.network.rule(firing.rule).cloned() else {
            return Err(RuleError::internal(format!("no production {}", firing.rule)));
        };
        let outcome = self.run_heads(&rule, firing.rule, &firing.token.slots)?;
        self.stats.rules_fired += 1;
        if self.trace {
            debug!(rule = rule.display_name(), conclusions = ?outcome.conclusions, premises = ?firing.token.matched, "rule fired");
        }

        for conclusion in outcome.conclusions {
            self.support.add_derived(conclusion.clone(), firing.rule, firing.token.matched.clone());
            if self.log_derivations {
                self.derivations
                    .record(Derivation::new(conclusion.clone(), rule.clone(), firing.token.matched.clone()));
            }
            if self.insert_fact(conclusion) {
                self.stats.triples_derived += 1;
            }
        }
        self.tabled.extend(outcome.tabled);
        self.table_all |= outcome.table_all;
        self.hidden.extend(outcome.hidden);
        for triple in &outcome.removals {
            self.retract(triple);
        }
        for triple in &outcome.drops {
            self.drop_fact(triple);
        }
        Ok(())
    }

    /// Instantiate head patterns and run head actions for one match
    fn run_heads(&self, rule: &Rule, index: usize, slots: &[Option<Node>]) -> RuleResult<Outcome> {
        let mut ctx = FiringContext {
            env: BindingEnvironment::from_slots(slots.to_vec()),
            rule,
            facts: &self.facts,
            removals: Vec::new(),
            drops: Vec::new(),
            tabled: Vec::new(),
            table_all: false,
            hidden: Vec::new(),
        };
        let mut conclusions = Vec::new();
        for head in self.network.head(index) {
            match head {
                HeadNode::Assert(pattern) => conclusions.push(unify::instantiate(pattern, &ctx.env)?),
                HeadNode::Action(builtin, call) => builtin
                    .head_action(call.args(), &mut ctx)
                    .map_err(|e| e.with_context("rule", rule.to_string()))?,
            }
        }
        Ok(Outcome {
            conclusions,
            removals: ctx.removals,
            drops: ctx.drops,
            tabled: ctx.tabled,
            table_all: ctx.table_all,
            hidden: ctx.hidden,
        })
    }
}
