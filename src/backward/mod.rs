//! Tabled backward engine
//!
//! Queries are answered goal-first. Every call on a goal is served by a
//! generator that owns an answer table and a list of consumers, the rule
//! bodies suspended on that goal. Calls on tabled predicates share one
//! generator per distinct goal, so recursive and mutually recursive rule
//! sets reach a fixpoint instead of looping; untabled calls get a private
//! generator and behave like plain depth-first expansion.
//!
//! Nothing recurses. All work sits on one FIFO queue of [`Task`]s and
//! [`BackwardEngine::next`] pulls from it until the query's generator has an
//! unread answer:
//!
//! - `Seed` collects the stored facts matching the goal, then starts one
//!   frame per rule whose head unifies with the goal.
//! - `Run` advances a frame through builtins until it reaches a body
//!   pattern, where it subscribes to the generator for that subgoal. A frame
//!   that gets past its last clause instantiates the head as an answer.
//! - `Feed` hands a consumer the answers it has not seen yet.
//!
//! When the queue drains, no generator can produce anything new and every
//! open generator is marked complete. Later calls on a completed goal read
//! its table directly.
//!
//! Queries interleave over the shared tables. Giving one up sets aside only
//! the work no other open query depends on: unfinished tabled goals are
//! suspended with their pending tasks and resume when a later call reaches
//! them, while private untabled work is dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use fnv::FnvHashMap;
use indexmap::IndexSet;
use tracing::{debug, info, trace};

use crate::binding::BindingEnvironment;
use crate::builtins::{Builtin, BuiltinRegistry, StoreContext};
use crate::derivation::{Derivation, DerivationStore};
use crate::error::{RuleError, RuleResult};
use crate::rule::{BuiltinCall, Clause, Rule};
use crate::store::{Store, TripleStore};
use crate::term::{Goal, Node, Term, Triple, TriplePattern};
use crate::unify;

pub mod table;

use table::{Consumer, Frame, Generator, GeneratorId, GeneratorState, Task};

#[derive(Debug)]
enum Step {
    Pattern(TriplePattern),
    Test(Arc<dyn Builtin>, BuiltinCall),
}

#[derive(Debug)]
struct CompiledRule {
    rule: Arc<Rule>,
    head: TriplePattern,
    body: Vec<Step>,
}

/// An open query: a cursor into the answer table of its root generator
#[derive(Debug)]
pub struct Query {
    id: u64,
    root: GeneratorId,
    cursor: usize,
    steps: usize,
    epoch: u64,
}

impl Query {
    /// Answers returned so far
    pub fn returned(&self) -> usize {
        self.cursor
    }
}

/// Goal-directed resolver over backward rules
#[derive(Debug)]
pub struct BackwardEngine {
    rules: Vec<Arc<CompiledRule>>,
    by_predicate: FnvHashMap<Node, Vec<usize>>,
    any_predicate: Vec<usize>,
    generators: Vec<Generator>,
    tables: FnvHashMap<Goal, GeneratorId>,
    queue: VecDeque<Task>,
    tabled: IndexSet<Node>,
    table_all: bool,
    derivations: DerivationStore,
    log_derivations: bool,
    trace: bool,
    max_steps: usize,
    rules_fired: usize,
    epoch: u64,
    /// Roots of the queries still open
    open: FnvHashMap<u64, GeneratorId>,
    next_query: u64,
}

impl BackwardEngine {
    /// Compile backward rules, resolving body builtins through `registry`
    pub fn new(rules: &[Arc<Rule>], registry: &BuiltinRegistry) -> RuleResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut by_predicate: FnvHashMap<Node, Vec<usize>> = FnvHashMap::default();
        let mut any_predicate = Vec::new();

        for (index, rule) in rules.iter().enumerate() {
            rule.validate()?;
            let Some(head) = rule.head_patterns().next().cloned() else {
                return Err(RuleError::compilation("backward rule head must be a triple pattern")
                    .with_context("rule", rule.to_string()));
            };
            match &head.predicate {
                Term::Constant(p) => by_predicate.entry(p.clone()).or_default().push(index),
                _ => any_predicate.push(index),
            }
            let mut body = Vec::with_capacity(rule.body().len());
            for clause in rule.body() {
                match clause {
                    Clause::Pattern(pattern) => body.push(Step::Pattern(pattern.clone())),
                    Clause::Builtin(call) => {
                        let builtin = registry
                            .resolve(call, false)
                            .map_err(|e| e.with_context("rule", rule.to_string()))?;
                        body.push(Step::Test(builtin, call.clone()));
                    }
                }
            }
            compiled.push(Arc::new(CompiledRule { rule: rule.clone(), head, body }));
        }
        info!(rules = compiled.len(), "backward rules compiled");

        Ok(BackwardEngine {
            rules: compiled,
            by_predicate,
            any_predicate,
            generators: Vec::new(),
            tables: FnvHashMap::default(),
            queue: VecDeque::new(),
            tabled: IndexSet::new(),
            table_all: false,
            derivations: DerivationStore::new(),
            log_derivations: false,
            trace: false,
            max_steps: 0,
            rules_fired: 0,
            epoch: 0,
            open: FnvHashMap::default(),
            next_query: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Memoize goals on this predicate from the next query on
    pub fn set_tabled(&mut self, predicate: Node) {
        if self.tabled.insert(predicate) {
            self.reset();
        }
    }

    /// Memoize every goal
    pub fn set_table_all(&mut self, enabled: bool) {
        if self.table_all != enabled {
            self.table_all = enabled;
            self.reset();
        }
    }

    pub fn set_derivation_logging(&mut self, enabled: bool) {
        self.log_derivations = enabled;
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    /// Bound the tasks one query may run; 0 is unlimited
    pub fn set_max_steps(&mut self, max_steps: usize) {
        self.max_steps = max_steps;
    }

    pub fn is_tabled(&self, goal: &Goal) -> bool {
        match &goal.predicate {
            Some(p) => self.table_all || self.tabled.contains(p),
            None => self.table_all,
        }
    }

    pub fn derivations(&self) -> &DerivationStore {
        &self.derivations
    }

    /// Rule bodies completed so far
    pub fn rules_fired(&self) -> usize {
        self.rules_fired
    }

    /// Number of tabled goals with an answer table
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Discard every table and pending task
    ///
    /// Open queries become stale and fail on their next pull. Recorded
    /// derivations survive; see [`prune_derivations`](Self::prune_derivations).
    pub fn reset(&mut self) {
        if !self.generators.is_empty() || !self.queue.is_empty() {
            debug!(generators = self.generators.len(), tables = self.tables.len(), "backward state reset");
        }
        self.generators.clear();
        self.tables.clear();
        self.queue.clear();
        self.open.clear();
        self.epoch += 1;
    }

    /// Keep only derivations whose premises are still facts or still derived
    pub fn prune_derivations(&mut self, is_fact: impl Fn(&Triple) -> bool) -> usize {
        let removed = self.derivations.retain_grounded(is_fact);
        if removed > 0 {
            debug!(removed, kept = self.derivations.len(), "backward derivations pruned");
        }
        removed
    }

    pub fn clear_derivations(&mut self) {
        self.derivations.clear();
    }

    /// Open a query on `goal`
    pub fn start(&mut self, goal: &Goal) -> Query {
        let root = self.generator_for(goal.clone());
        self.schedule(root);
        let id = self.next_query;
        self.next_query += 1;
        self.open.insert(id, root);
        Query { id, root, cursor: 0, steps: 0, epoch: self.epoch }
    }

    /// Pull the next answer of a query
    ///
    /// `facts` is the fact set goals are resolved against. Runs queued tasks
    /// until the query's table grows or its goal completes. A query that
    /// exceeds the step budget or fails is closed and its work set aside.
    pub fn next(&mut self, query: &mut Query, facts: &Store) -> RuleResult<Option<Triple>> {
        if query.epoch != self.epoch {
            return Err(RuleError::concurrent_modification().with_context("reason", "backward tables were reset"));
        }
        if !self.open.contains_key(&query.id) {
            return Ok(None);
        }
        loop {
            let Some(root) = self.generators.get(query.root) else {
                return Err(RuleError::internal(format!("no generator {}", query.root)));
            };
            if let Some(answer) = root.answers.get_index(query.cursor) {
                query.cursor += 1;
                return Ok(Some(answer.clone()));
            }
            if root.is_complete() {
                self.open.remove(&query.id);
                return Ok(None);
            }
            let Some(task) = self.queue.pop_front() else {
                self.complete_all();
                continue;
            };
            query.steps += 1;
            if self.max_steps > 0 && query.steps > self.max_steps {
                self.queue.push_front(task);
                self.open.remove(&query.id);
                self.set_aside();
                return Err(RuleError::step_limit(query.steps - 1, self.max_steps));
            }
            if let Err(e) = self.execute(task, facts) {
                self.open.remove(&query.id);
                self.set_aside();
                return Err(e);
            }
        }
    }

    /// Give up on a query
    ///
    /// Tables shared with other open queries are untouched.
    pub fn abandon(&mut self, query: &Query) {
        if query.epoch != self.epoch {
            return;
        }
        if self.open.remove(&query.id).is_some() {
            self.set_aside();
        }
    }

    /// Number of queries started and not yet exhausted or abandoned
    pub fn open_queries(&self) -> usize {
        self.open.len()
    }

    /// Run a query to exhaustion
    pub fn solve(&mut self, goal: &Goal, facts: &Store) -> RuleResult<Vec<Triple>> {
        let mut query = self.start(goal);
        let mut answers = Vec::new();
        while let Some(answer) = self.next(&mut query, facts)? {
            answers.push(answer);
        }
        Ok(answers)
    }

    fn candidates(&self, goal: &Goal) -> Vec<usize> {
        match &goal.predicate {
            None => (0..self.rules.len()).collect(),
            Some(p) => {
                let mut out = self.by_predicate.get(p).cloned().unwrap_or_default();
                out.extend_from_slice(&self.any_predicate);
                out.sort_unstable();
                out
            }
        }
    }

    /// The generator serving a call on `goal`
    fn generator_for(&mut self, goal: Goal) -> GeneratorId {
        let tabled = self.is_tabled(&goal);
        if tabled {
            if let Some(&id) = self.tables.get(&goal) {
                return id;
            }
        }
        let id = self.generators.len();
        if tabled {
            debug!(?goal, id, "tabled call created");
            self.tables.insert(goal.clone(), id);
        }
        self.generators.push(Generator::new(goal, tabled));
        id
    }

    /// Queue the seed of a new generator, or wake a suspended one
    fn schedule(&mut self, id: GeneratorId) {
        let Some(state) = self.generators.get(id).map(|g| g.state) else {
            return;
        };
        match state {
            GeneratorState::New => {
                self.generators[id].state = GeneratorState::Generating;
                self.queue.push_back(Task::Seed(id));
            }
            GeneratorState::Suspended => self.resume(id),
            _ => {}
        }
    }

    /// For each generator, the generators its rule bodies are waiting on
    fn dependencies(&self) -> Vec<Vec<GeneratorId>> {
        let mut deps = vec![Vec::new(); self.generators.len()];
        for (id, generator) in self.generators.iter().enumerate() {
            for consumer in &generator.consumers {
                if let Some(waiting) = deps.get_mut(consumer.frame.owner) {
                    waiting.push(id);
                }
            }
        }
        deps
    }

    /// The generator a task makes progress for
    fn task_owner(&self, task: &Task) -> Option<GeneratorId> {
        match task {
            Task::Seed(id) => Some(*id),
            Task::Run(frame) => Some(frame.owner),
            Task::Feed(id, consumer) => self
                .generators
                .get(*id)
                .and_then(|g| g.consumers.get(*consumer))
                .map(|c| c.frame.owner),
        }
    }

    /// Park or drop queued work that no open query depends on
    ///
    /// Unfinished tabled generators, and whatever they wait on, are
    /// suspended. Remaining private generators are dropped with their tasks.
    fn set_aside(&mut self) {
        let deps = self.dependencies();
        let live = reachable(&deps, self.open.values().copied());
        let pending = |(id, g): (usize, &Generator)| {
            let unfinished = matches!(g.state, GeneratorState::Generating | GeneratorState::Suspended);
            (g.tabled && unfinished && !live[id]).then_some(id)
        };
        let kept = reachable(&deps, self.generators.iter().enumerate().filter_map(pending));

        let (mut suspended, mut dropped) = (0, 0);
        for (id, generator) in self.generators.iter_mut().enumerate() {
            let unfinished = matches!(
                generator.state,
                GeneratorState::New | GeneratorState::Generating | GeneratorState::Suspended
            );
            if live[id] || !unfinished {
                continue;
            }
            if kept[id] {
                generator.state = GeneratorState::Suspended;
                suspended += 1;
            } else {
                generator.state = GeneratorState::Dropped;
                generator.parked.clear();
                dropped += 1;
            }
        }

        let queue = std::mem::take(&mut self.queue);
        for task in queue {
            let owner = self.task_owner(&task);
            match owner.and_then(|id| self.generators.get_mut(id)) {
                Some(g) if g.state == GeneratorState::Suspended => g.parked.push(task),
                Some(g) if g.state == GeneratorState::Dropped => {}
                _ => self.queue.push_back(task),
            }
        }
        if suspended + dropped > 0 {
            debug!(suspended, dropped, open = self.open.len(), "backward work set aside");
        }
    }

    /// Wake a suspended generator and every suspended generator it waits on
    fn resume(&mut self, id: GeneratorId) {
        let deps = self.dependencies();
        let woken = reachable(&deps, std::iter::once(id));
        let mut resumed = vec![false; self.generators.len()];
        for (gid, generator) in self.generators.iter_mut().enumerate() {
            if woken[gid] && generator.state == GeneratorState::Suspended {
                generator.state = GeneratorState::Generating;
                self.queue.extend(generator.parked.drain(..));
                resumed[gid] = true;
            }
        }
        // Answers that arrived while suspended were not fed
        for (source, generator) in self.generators.iter().enumerate() {
            for (index, consumer) in generator.consumers.iter().enumerate() {
                if resumed.get(consumer.frame.owner).copied().unwrap_or(false) {
                    self.queue.push_back(Task::Feed(source, index));
                }
            }
        }
        trace!(id, resumed = resumed.iter().filter(|r| **r).count(), "suspended work resumed");
    }

    fn complete_all(&mut self) {
        for (id, generator) in self.generators.iter_mut().enumerate() {
            if generator.state == GeneratorState::Generating {
                generator.state = GeneratorState::Complete;
                if generator.tabled {
                    debug!(goal = ?generator.goal, id, answers = generator.answers.len(), "tabled call complete");
                }
            }
        }
    }

    fn execute(&mut self, task: Task, facts: &Store) -> RuleResult<()> {
        match task {
            Task::Seed(id) => {
                self.seed(id, facts);
                Ok(())
            }
            Task::Run(frame) => self.run(frame, facts),
            Task::Feed(id, consumer) => self.feed(id, consumer),
        }
    }

    fn seed(&mut self, id: GeneratorId, facts: &Store) {
        let goal = match self.generators.get(id) {
            Some(generator) => generator.goal.clone(),
            None => return,
        };
        trace!(?goal, "seeding");
        for triple in facts.find(&goal) {
            self.add_answer(id, triple);
        }
        for rule in self.candidates(&goal) {
            let compiled = &self.rules[rule];
            let mut env = BindingEnvironment::new(compiled.rule.num_vars());
            if unify::match_goal(&compiled.head, &goal, &mut env) {
                self.queue.push_back(Task::Run(Frame {
                    owner: id,
                    rule,
                    clause: 0,
                    slots: env.snapshot(),
                    matched: Vec::new(),
                }));
            }
        }
    }

    /// Advance a frame to its next body pattern, or to an answer
    fn run(&mut self, mut frame: Frame, facts: &Store) -> RuleResult<()> {
        let compiled = self.rules[frame.rule].clone();
        while let Some(step) = compiled.body.get(frame.clause) {
            match step {
                Step::Test(builtin, call) => {
                    let env = BindingEnvironment::from_slots(std::mem::take(&mut frame.slots));
                    let mut ctx = StoreContext::new(env, &compiled.rule, facts);
                    if !builtin.body_call(call.args(), &mut ctx) {
                        return Ok(());
                    }
                    frame.slots = ctx.env.snapshot();
                    frame.clause += 1;
                }
                Step::Pattern(pattern) => {
                    let env = BindingEnvironment::from_slots(frame.slots.clone());
                    let id = self.generator_for(unify::to_goal(pattern, &env));
                    self.subscribe(id, frame);
                    return Ok(());
                }
            }
        }

        let env = BindingEnvironment::from_slots(frame.slots);
        let answer = unify::instantiate(&compiled.head, &env)
            .map_err(|e| e.with_context("rule", compiled.rule.to_string()))?;
        let Some(owner) = self.generators.get(frame.owner) else {
            return Ok(());
        };
        if !owner.goal.matches(&answer) {
            return Ok(());
        }
        self.rules_fired += 1;
        if self.trace {
            debug!(rule = compiled.rule.display_name(), %answer, premises = ?frame.matched, "backward rule fired");
        }
        if self.log_derivations {
            self.derivations
                .record(Derivation::new(answer.clone(), compiled.rule.clone(), frame.matched));
        }
        self.add_answer(frame.owner, answer);
        Ok(())
    }

    fn subscribe(&mut self, id: GeneratorId, frame: Frame) {
        let Some(generator) = self.generators.get_mut(id) else {
            return;
        };
        generator.consumers.push(Consumer { frame, cursor: 0 });
        let consumer = generator.consumers.len() - 1;
        self.schedule(id);
        self.queue.push_back(Task::Feed(id, consumer));
    }

    fn add_answer(&mut self, id: GeneratorId, answer: Triple) {
        let Some(generator) = self.generators.get_mut(id) else {
            return;
        };
        if !generator.add_answer(answer) {
            return;
        }
        let owners: Vec<GeneratorId> = generator.consumers.iter().map(|c| c.frame.owner).collect();
        for (consumer, owner) in owners.into_iter().enumerate() {
            if self.generators.get(owner).map_or(false, Generator::is_active) {
                self.queue.push_back(Task::Feed(id, consumer));
            }
        }
    }

    /// Resume a consumer with every answer it has not seen
    fn feed(&mut self, id: GeneratorId, consumer: usize) -> RuleResult<()> {
        let Some(generator) = self.generators.get_mut(id) else {
            return Ok(());
        };
        let Some(waiting) = generator.consumers.get_mut(consumer) else {
            return Ok(());
        };
        if waiting.cursor >= generator.answers.len() {
            return Ok(());
        }
        let pending: Vec<Triple> = generator.answers.iter().skip(waiting.cursor).cloned().collect();
        waiting.cursor = generator.answers.len();
        let frame = waiting.frame.clone();

        let compiled = self.rules[frame.rule].clone();
        let Some(Step::Pattern(pattern)) = compiled.body.get(frame.clause) else {
            return Err(RuleError::internal(format!(
                "consumer of {} is not suspended on a pattern",
                compiled.rule.display_name()
            )));
        };
        for answer in pending {
            let mut env = BindingEnvironment::from_slots(frame.slots.clone());
            if unify::match_pattern(pattern, &answer, &mut env) {
                let mut matched = frame.matched.clone();
                matched.push(answer);
                self.queue.push_back(Task::Run(Frame {
                    owner: frame.owner,
                    rule: frame.rule,
                    clause: frame.clause + 1,
                    slots: env.snapshot(),
                    matched,
                }));
            }
        }
        Ok(())
    }
}

/// Generators reachable from `roots` along waits-on edges
fn reachable(deps: &[Vec<GeneratorId>], roots: impl IntoIterator<Item = GeneratorId>) -> Vec<bool> {
    let mut seen = vec![false; deps.len()];
    let mut stack: Vec<GeneratorId> = roots.into_iter().collect();
    while let Some(id) = stack.pop() {
        match seen.get_mut(id) {
            Some(flag) if !*flag => *flag = true,
            _ => continue,
        }
        stack.extend(deps[id].iter().copied());
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::rule::RuleParser;

    fn setup(rules: &str, data: &str) -> (BackwardEngine, Store) {
        let mut parser = RuleParser::new();
        let rules: Vec<Arc<Rule>> = parser.parse_rules(rules).unwrap().into_iter().map(Arc::new).collect();
        let facts: Store = parser.parse_triples(data).unwrap().into_iter().collect();
        (BackwardEngine::new(&rules, &BuiltinRegistry::global()).unwrap(), facts)
    }

    fn goal(src: &str) -> Goal {
        RuleParser::new().parse_goal(src).unwrap()
    }

    fn sorted(triples: Vec<Triple>) -> Vec<String> {
        let mut out: Vec<String> = triples.iter().map(ToString::to_string).collect();
        out.sort();
        out
    }

    fn expect(triples: &str) -> Vec<String> {
        sorted(RuleParser::new().parse_triples(triples).unwrap())
    }

    #[test]
    fn test_tabled_transitive_closure() {
        let (mut engine, facts) = setup("[r1: (?a p ?c) <- (?a p ?b), (?b p ?c)]", "(a p b) (b p c) (b p d)");
        engine.set_tabled(Node::uri("p"));
        let answers = engine.solve(&goal("(?x p ?y)"), &facts).unwrap();
        assert_eq!(answers.len(), 5);
        assert_eq!(sorted(answers), expect("(a p b) (b p c) (a p c) (b p d) (a p d)"));
        assert!(engine.table_count() >= 2);
    }

    #[test]
    fn test_completed_table_is_reused() {
        let (mut engine, facts) = setup("[r1: (?a p ?c) <- (?a p ?b), (?b p ?c)]", "(a p b) (b p c)");
        engine.set_tabled(Node::uri("p"));
        let first = engine.solve(&goal("(a p ?y)"), &facts).unwrap();
        let fired = engine.rules_fired();
        let second = engine.solve(&goal("(a p ?y)"), &facts).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.rules_fired(), fired);
    }

    #[test]
    fn test_backtracking_alternatives() {
        let (mut engine, facts) = setup(
            "[r1: (?x r C1) <- (?x p b)] [r2: (?x r C2) <- (?x p b)] [r3: (?x r C3) <- (?x p b)]",
            "(a p b)",
        );
        let answers = engine.solve(&goal("(a r ?y)"), &facts).unwrap();
        assert_eq!(sorted(answers), expect("(a r C1) (a r C2) (a r C3)"));
    }

    #[test]
    fn test_clause_order() {
        let (mut engine, facts) = setup(
            "[r1: (?x r C1) <- (?x p b)] [r1: (?x r C2) <- (?x p b)] [r2: (?x r C3) <- (?x r C3) (?x p b)]",
            "(a p b)",
        );
        let mut query = engine.start(&goal("(* r *)"));
        let first = engine.next(&mut query, &facts).unwrap();
        assert_eq!(first.map(|t| t.to_string()), Some("(a r C1)".to_string()));
        engine.abandon(&query);
    }

    #[test]
    fn test_builtins_in_body() {
        let (mut engine, facts) = setup("[r1: (?x r ?y) <- (?x p ?v), sum(?v 2 ?y)]", "(a p 3) (b p 4)");
        assert_eq!(sorted(engine.solve(&goal("(* r *)"), &facts).unwrap()), expect("(a r 5) (b r 6)"));

        let (mut engine, facts) = setup("[r1: (?x r C1) <- (?x p ?v), lessThan(?v 3)]", "(a p 1) (b p 2) (c p 3)");
        assert_eq!(sorted(engine.solve(&goal("(* r *)"), &facts).unwrap()), expect("(a r C1) (b r C1)"));
    }

    #[test]
    fn test_functor_objects() {
        let (mut engine, facts) = setup(
            "[r1: (?x s ?y) <- (?x p foo(?z ?y))]",
            "(a p foo(C1 C2)) (a p bar(C1 D1)) (b p foo(C1 C2)) (a p foo(C1 C3)) (a p D1)",
        );
        assert_eq!(
            sorted(engine.solve(&goal("(* s *)"), &facts).unwrap()),
            expect("(a s C2) (b s C2) (a s C3)")
        );

        let (mut engine, facts) = setup(
            "[r1: (?x r foo(?y ?z)) <- (?x p ?y), (?x q ?z)] [r2: (?x s ?y) <- (?x r foo(?z ?y))]",
            "(a p C1) (a p C3) (a q C2) (b p D1) (b q D2) (b q D3)",
        );
        assert_eq!(
            sorted(engine.solve(&goal("(* s *)"), &facts).unwrap()),
            expect("(a s C2) (b s D2) (b s D3)")
        );
    }

    #[test]
    fn test_wildcard_predicate_in_head() {
        let (mut engine, facts) = setup("[r1: (a ?p ?x) <- (b ?p ?x)]", "(b p C1) (b q C2) (b q C3) (c q d)");
        assert_eq!(
            sorted(engine.solve(&goal("(a * *)"), &facts).unwrap()),
            expect("(a p C1) (a q C2) (a q C3)")
        );
    }

    #[test]
    fn test_head_bound_before_body() {
        let (mut engine, facts) = setup(
            "[r1: (?x r bound) <- bound(?x), (?x p ?y)] [r2: (?x r free) <- unbound(?x), (?x p ?y)]",
            "(a p b)",
        );
        assert_eq!(sorted(engine.solve(&goal("(a r *)"), &facts).unwrap()), expect("(a r bound)"));
        assert_eq!(sorted(engine.solve(&goal("(* r *)"), &facts).unwrap()), expect("(a r free)"));
    }

    #[test]
    fn test_untabled_recursion_hits_step_limit() {
        let (mut engine, facts) = setup("[r1: (?a p ?c) <- (?a p ?b), (?b p ?c)]", "(a p b) (b p c)");
        engine.set_max_steps(500);
        let err = engine.solve(&goal("(* p *)"), &facts).unwrap_err();
        assert_eq!(err.code, ErrorCode::StepLimitExceeded);

        engine.set_tabled(Node::uri("p"));
        assert_eq!(engine.solve(&goal("(* p *)"), &facts).unwrap().len(), 3);
    }

    #[test]
    fn test_reset_makes_query_stale() {
        let (mut engine, facts) = setup("[r1: (?x r ?y) <- (?x p ?y)]", "(a p b) (a p c)");
        let mut query = engine.start(&goal("(a r *)"));
        assert!(engine.next(&mut query, &facts).unwrap().is_some());
        engine.reset();
        let err = engine.next(&mut query, &facts).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);
    }

    #[test]
    fn test_derivation_trace() {
        let (mut engine, facts) = setup(
            "[testRule1: (C2 p ?a) <- (C1 p ?a)] \
             [testRule2: (C2 q ?a) <- (C1 q ?a)] \
             [testRule3: (a p ?a) <- (C2 p ?a), (C2 q ?a)]",
            "(C1 p C3) (C1 q C3)",
        );
        engine.set_derivation_logging(true);
        let answers = engine.solve(&goal("(a p *)"), &facts).unwrap();
        assert_eq!(sorted(answers), expect("(a p C3)"));

        let target = Triple::new(Node::uri("a"), Node::uri("p"), Node::uri("C3"));
        let store = engine.derivations();
        let found = store.get(&target);
        assert_eq!(found.len(), 1);
        let lookup = |t: &Triple| store.get(t);
        let expected = "Rule testRule3 concluded (a p C3) <-\n\
                        \x20   Rule testRule1 concluded (C2 p C3) <-\n\
                        \x20       Fact (C1 p C3)\n\
                        \x20   Rule testRule2 concluded (C2 q C3) <-\n\
                        \x20       Fact (C1 q C3)\n";
        assert_eq!(found[0].trace(&lookup), expected);
    }

    #[test]
    fn test_abandon_leaves_other_queries_running() {
        let (mut engine, facts) = setup(
            "[r1: (?x s ?y) <- (?x r ?y)] [r2: (?x r ?y) <- (?x p ?y)]",
            "(a p b) (a p c) (d p e)",
        );
        let mut outer = engine.start(&goal("(a s *)"));
        let first = engine.next(&mut outer, &facts).unwrap();
        assert!(first.is_some());

        let mut inner = engine.start(&goal("(* r *)"));
        assert!(engine.next(&mut inner, &facts).unwrap().is_some());
        engine.abandon(&inner);
        assert_eq!(engine.next(&mut inner, &facts).unwrap(), None);

        let mut rest = vec![first.unwrap()];
        while let Some(answer) = engine.next(&mut outer, &facts).unwrap() {
            rest.push(answer);
        }
        assert_eq!(sorted(rest), expect("(a s b) (a s c)"));
        assert_eq!(engine.open_queries(), 0);
    }

    #[test]
    fn test_abandoned_table_resumes() {
        let (mut engine, facts) = setup("[r1: (?a p ?c) <- (?a p ?b), (?b p ?c)]", "(a p b) (b p c) (c p d)");
        engine.set_tabled(Node::uri("p"));
        let mut query = engine.start(&goal("(a p *)"));
        assert!(engine.next(&mut query, &facts).unwrap().is_some());
        engine.abandon(&query);

        let answers = engine.solve(&goal("(a p *)"), &facts).unwrap();
        assert_eq!(sorted(answers), expect("(a p b) (a p c) (a p d)"));
        assert_eq!(engine.solve(&goal("(* p *)"), &facts).unwrap().len(), 6);
    }

    #[test]
    fn test_step_limit_spares_other_queries() {
        let (mut engine, facts) = setup(
            "[r1: (?a p ?c) <- (?a p ?b), (?b p ?c)] [r2: (?x s ?y) <- (?x q ?y)]",
            "(a p b) (b p c) (a q b) (a q c)",
        );
        engine.set_max_steps(300);
        let mut other = engine.start(&goal("(a s *)"));
        assert!(engine.next(&mut other, &facts).unwrap().is_some());

        let err = engine.solve(&goal("(* p *)"), &facts).unwrap_err();
        assert_eq!(err.code, ErrorCode::StepLimitExceeded);

        assert!(engine.next(&mut other, &facts).unwrap().is_some());
        assert_eq!(engine.next(&mut other, &facts).unwrap(), None);
    }
}
