//! Inference graph facade
//!
//! A [`Reasoner`] holds a rule set, the builtin registry it resolves
//! against and the engine configuration. Binding it to base data yields an
//! [`InfGraph`]: forward rules are materialized eagerly by the RETE engine,
//! backward rules answer queries on demand over the base data plus the
//! forward deductions.
//!
//! Queries return a [`FindIter`], a lazy pull sequence. Every mutation of
//! the graph bumps a generation counter; an open iterator that sees a newer
//! generation yields a `ConcurrentModification` error instead of answers
//! from a changed graph. Closing the iterator turns the check off.
//!
//! A reasoner may be pre-bound to schema data with
//! [`Reasoner::bind_schema`]; every graph bound from it then starts from the
//! schema's forward closure as well as its own data.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info};

use crate::backward::{BackwardEngine, Query};
use crate::builtins::BuiltinRegistry;
use crate::config::{EngineConfig, ReasoningConfig};
use crate::derivation::Derivation;
use crate::error::{RuleError, RuleResult};
use crate::forward::ForwardEngine;
use crate::rule::{Rule, RuleParser};
use crate::store::{Store, TripleStore};
use crate::term::{Goal, Node, Triple};

/// A rule set ready to bind to data
#[derive(Debug, Clone)]
pub struct Reasoner {
    rules: Vec<Arc<Rule>>,
    registry: Arc<BuiltinRegistry>,
    config: EngineConfig,
    tabled: Vec<Node>,
    schema: Option<Arc<Store>>,
}

impl Reasoner {
    /// Reason with `rules`, the default builtins and default configuration
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        Reasoner {
            rules: rules.into_iter().map(Arc::new).collect(),
            registry: BuiltinRegistry::global(),
            config: EngineConfig::default(),
            tabled: Vec::new(),
            schema: None,
        }
    }

    /// Parse rule text with the default prefixes
    pub fn from_text(source: &str) -> RuleResult<Self> {
        Ok(Self::new(RuleParser::new().parse_rules(source)?))
    }

    /// Resolve builtins through `registry` instead of the default
    pub fn with_registry(mut self, registry: Arc<BuiltinRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Table a predicate in every graph bound from now on
    pub fn set_tabled(&mut self, predicate: Node) {
        self.tabled.push(predicate);
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A reasoner whose graphs also contain `schema` and what it entails
    ///
    /// The schema's forward closure is computed once, here.
    pub fn bind_schema(&self, schema: Store) -> RuleResult<Reasoner> {
        let closure: Store = self.bind(schema)?.materialized().into_iter().collect();
        debug!(triples = closure.len(), "schema bound");
        let mut bound = self.clone();
        bound.schema = Some(Arc::new(closure));
        Ok(bound)
    }

    pub fn schema(&self) -> Option<&Store> {
        self.schema.as_deref()
    }

    /// Compile the rules and materialize the forward closure of `data`
    pub fn bind(&self, data: Store) -> RuleResult<InfGraph> {
        let (backward, forward): (Vec<Arc<Rule>>, Vec<Arc<Rule>>) =
            self.rules.iter().cloned().partition(|r| r.is_backward());
        let settings = self.config.reasoning.clone();

        let mut forward = ForwardEngine::new(&forward, &self.registry)?;
        forward.set_derivation_logging(settings.derivation_logging);
        forward.set_trace(settings.trace);
        forward.set_max_steps(settings.max_steps);

        let mut backward = BackwardEngine::new(&backward, &self.registry)?;
        backward.set_derivation_logging(settings.derivation_logging);
        backward.set_trace(settings.trace);
        backward.set_max_steps(settings.max_steps);
        backward.set_table_all(settings.table_all);
        for predicate in &self.tabled {
            backward.set_tabled(predicate.clone());
        }

        let schema = self.schema.clone();
        let mut state = GraphState { forward, backward, generation: 0, settings, schema };
        let base = state.with_schema(data);
        state.forward.prepare(base)?;
        state.sync_tables();
        info!(
            forward = state.forward.stats().rules_fired,
            facts = state.forward.facts().len(),
            backward_rules = state.backward.len(),
            "graph bound"
        );
        Ok(InfGraph { state: Rc::new(RefCell::new(state)) })
    }
}

#[derive(Debug)]
struct GraphState {
    forward: ForwardEngine,
    backward: BackwardEngine,
    generation: u64,
    settings: ReasoningConfig,
    schema: Option<Arc<Store>>,
}

impl GraphState {
    /// Schema closure first, then `data`
    fn with_schema(&self, data: Store) -> Store {
        match &self.schema {
            Some(schema) => schema.iter().cloned().chain(data.iter().cloned()).collect(),
            None => data,
        }
    }

    /// Carry tabling directives fired by forward axioms over to the backward engine
    fn sync_tables(&mut self) {
        let tabled: Vec<Node> = self.forward.tabled().cloned().collect();
        for predicate in tabled {
            self.backward.set_tabled(predicate);
        }
        if self.forward.tables_all() {
            self.backward.set_table_all(true);
        }
    }

    /// Record a change to the data: open iterators go stale, tables are dropped
    ///
    /// Backward derivations whose premises still hold are kept.
    fn changed(&mut self) {
        self.generation += 1;
        let GraphState { forward, backward, .. } = &mut *self;
        backward.reset();
        backward.prune_derivations(|t| forward.facts().contains(t));
        self.sync_tables();
    }

    fn derivations(&self, triple: &Triple) -> Vec<Arc<Derivation>> {
        let found = self.backward.derivations().get(triple);
        if found.is_empty() {
            self.forward.derivations().get(triple)
        } else {
            found
        }
    }
}

/// A graph of base facts plus everything the rules infer from them
#[derive(Debug)]
pub struct InfGraph {
    state: Rc<RefCell<GraphState>>,
}

impl InfGraph {
    /// Every visible triple matching `goal`
    pub fn find(&self, goal: &Goal) -> FindIter {
        let mut state = self.state.borrow_mut();
        let source = if state.backward.is_empty() {
            Source::Facts(state.forward.facts().find(goal).into_iter())
        } else {
            Source::Query(state.backward.start(goal))
        };
        FindIter {
            state: Rc::clone(&self.state),
            source,
            generation: state.generation,
            checked: true,
            hide_functors: state.settings.hide_functor_triples,
            done: false,
        }
    }

    /// Run a query to exhaustion
    pub fn find_all(&self, goal: &Goal) -> RuleResult<Vec<Triple>> {
        self.find(goal).collect()
    }

    pub fn contains(&self, triple: &Triple) -> RuleResult<bool> {
        let mut iter = self.find(&Goal::from(triple));
        let found = iter.next().transpose()?.is_some();
        iter.close();
        Ok(found)
    }

    /// Add a base fact and propagate it
    pub fn add(&mut self, triple: Triple) -> RuleResult<()> {
        let mut state = self.state.borrow_mut();
        let result = state.forward.add(triple);
        state.changed();
        result
    }

    /// Remove a base fact and retract what depended on it
    pub fn remove(&mut self, triple: &Triple) -> RuleResult<()> {
        let mut state = self.state.borrow_mut();
        let result = state.forward.remove(triple);
        state.changed();
        result
    }

    /// Replace the base data, discarding every deduction and table
    ///
    /// A bound schema stays in place.
    pub fn rebind(&mut self, data: Store) -> RuleResult<()> {
        let mut state = self.state.borrow_mut();
        debug!(triples = data.len(), "rebinding");
        let base = state.with_schema(data);
        let result = state.forward.prepare(base);
        state.backward.clear_derivations();
        state.changed();
        result
    }

    /// Discard derived state and recompute it from the current base data
    pub fn reset(&mut self) -> RuleResult<()> {
        let mut state = self.state.borrow_mut();
        let base = state.forward.base().clone();
        let result = state.forward.prepare(base);
        state.backward.clear_derivations();
        state.changed();
        result
    }

    pub fn set_tabled(&mut self, predicate: Node) {
        let mut state = self.state.borrow_mut();
        state.backward.set_tabled(predicate);
        state.changed();
    }

    /// Record derivations from now on; existing facts get none retroactively
    pub fn set_derivation_logging(&mut self, enabled: bool) {
        let mut state = self.state.borrow_mut();
        state.settings.derivation_logging = enabled;
        state.forward.set_derivation_logging(enabled);
        state.backward.set_derivation_logging(enabled);
    }

    pub fn set_trace(&mut self, enabled: bool) {
        let mut state = self.state.borrow_mut();
        state.settings.trace = enabled;
        state.forward.set_trace(enabled);
        state.backward.set_trace(enabled);
    }

    /// Every recorded derivation of a triple
    pub fn get_derivation(&self, triple: &Triple) -> Vec<Arc<Derivation>> {
        self.state.borrow().derivations(triple)
    }

    /// Indented proof tree of the first derivation of a triple
    pub fn explain(&self, triple: &Triple) -> Option<String> {
        let state = self.state.borrow();
        let lookup = |t: &Triple| state.derivations(t);
        state.derivations(triple).first().map(|d| d.trace(&lookup))
    }

    /// Proof tree of the first derivation as JSON
    pub fn explain_json(&self, triple: &Triple) -> Option<String> {
        let state = self.state.borrow();
        let lookup = |t: &Triple| state.derivations(t);
        state.derivations(triple).first().map(|d| d.to_json(&lookup))
    }

    /// Rule firings in both engines
    pub fn n_rules_fired(&self) -> usize {
        let state = self.state.borrow();
        state.forward.stats().rules_fired + state.backward.rules_fired()
    }

    /// Facts concluded by forward rules
    pub fn deductions(&self) -> Vec<Triple> {
        self.state.borrow().forward.deductions()
    }

    /// Base facts plus forward deductions
    pub fn materialized(&self) -> Vec<Triple> {
        self.state.borrow().forward.facts().iter().cloned().collect()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }
}

#[derive(Debug)]
enum Source {
    Facts(std::vec::IntoIter<Triple>),
    Query(Query),
}

/// Lazy answers to one `find`
#[derive(Debug)]
pub struct FindIter {
    state: Rc<RefCell<GraphState>>,
    source: Source,
    generation: u64,
    checked: bool,
    hide_functors: bool,
    done: bool,
}

impl FindIter {
    /// Stop the iterator and release pending work; later mutations are not reported
    pub fn close(&mut self) {
        self.checked = false;
        self.release();
    }

    fn release(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Source::Query(query) = &self.source {
            if let Ok(mut state) = self.state.try_borrow_mut() {
                if state.generation == self.generation {
                    state.backward.abandon(query);
                }
            }
        }
    }

    fn pull(&mut self) -> RuleResult<Option<Triple>> {
        let mut state = self.state.borrow_mut();
        if self.checked && state.generation != self.generation {
            return Err(RuleError::concurrent_modification());
        }
        loop {
            let next = match &mut self.source {
                Source::Facts(iter) => iter.next(),
                Source::Query(query) => {
                    let GraphState { forward, backward, .. } = &mut *state;
                    backward.next(query, forward.facts())?
                }
            };
            match next {
                Some(triple) if self.hide_functors && triple.has_functor_object() => continue,
                Some(triple) if state.forward.is_hidden(&triple) => continue,
                other => return Ok(other),
            }
        }
    }
}

impl Iterator for FindIter {
    type Item = RuleResult<Triple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.pull() {
            Ok(Some(triple)) => Some(Ok(triple)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for FindIter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{helpers, Builtin, RuleContext};
    use crate::error::ErrorCode;
    use crate::term::uri::ns;
    use crate::term::Term;

    fn data(src: &str) -> Store {
        RuleParser::new().parse_triples(src).unwrap().into_iter().collect()
    }

    fn bind(rules: &str, triples: &str) -> InfGraph {
        Reasoner::from_text(rules).unwrap().bind(data(triples)).unwrap()
    }

    fn goal(src: &str) -> Goal {
        RuleParser::new().parse_goal(src).unwrap()
    }

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Node::uri(s), Node::uri(p), Node::uri(o))
    }

    fn sorted(triples: Vec<Triple>) -> Vec<String> {
        let mut out: Vec<String> = triples.iter().map(ToString::to_string).collect();
        out.sort();
        out
    }

    #[test]
    fn test_concurrent_modification() {
        let mut graph = bind("[r1: (?x r ?y) <- (?x p ?y)]", "(a p b) (a p c)");
        let mut iter = graph.find(&goal("(a r *)"));
        assert!(iter.next().unwrap().is_ok());

        graph.add(t("a", "p", "d")).unwrap();
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);
        assert!(iter.next().is_none());

        let fresh = graph.find_all(&goal("(a r *)")).unwrap();
        assert_eq!(sorted(fresh), vec!["(a r b)", "(a r c)", "(a r d)"]);
    }

    #[test]
    fn test_close_disables_check() {
        let mut graph = bind("[r1: (?x q ?y) -> (?y q ?x)]", "(a q b)");
        let mut iter = graph.find(&goal("(* q *)"));
        assert!(iter.next().unwrap().is_ok());
        iter.close();
        graph.add(t("c", "q", "d")).unwrap();
        assert!(iter.next().is_none());
        assert_eq!(graph.find_all(&goal("(* q *)")).unwrap().len(), 4);
    }

    #[test]
    fn test_forward_retraction_through_graph() {
        let mut graph = bind(
            "[r1: (?a p ?b) -> (?a q ?b)] [r2: (?a s ?b) -> (?a q ?b)]",
            "(x p y) (x s y) (u p v)",
        );
        assert!(graph.contains(&t("x", "q", "y")).unwrap());
        graph.remove(&t("x", "p", "y")).unwrap();
        assert!(graph.contains(&t("x", "q", "y")).unwrap());
        graph.remove(&t("u", "p", "v")).unwrap();
        assert!(!graph.contains(&t("u", "q", "v")).unwrap());
        assert_eq!(sorted(graph.deductions()), vec!["(x q y)"]);
    }

    #[test]
    fn test_rebind_discards_old_state() {
        let mut graph = bind("[r1: (?a p ?b) -> (?a q ?b)]", "(a p b)");
        assert!(graph.contains(&t("a", "q", "b")).unwrap());
        graph.rebind(data("(c p d)")).unwrap();
        assert!(!graph.contains(&t("a", "q", "b")).unwrap());
        assert!(graph.contains(&t("c", "q", "d")).unwrap());
        assert_eq!(graph.materialized().len(), 2);
    }

    #[test]
    fn test_hybrid_rules() {
        let graph = bind(
            "[f1: (?a p ?b) -> (?a q ?b)] [b1: (?x r ?y) <- (?x q ?y)]",
            "(a p b) (c p d)",
        );
        assert_eq!(sorted(graph.find_all(&goal("(* r *)")).unwrap()), vec!["(a r b)", "(c r d)"]);
        assert_eq!(graph.deductions().len(), 2);
    }

    #[test]
    fn test_table_axiom_terminates_recursion() {
        let graph = bind(
            "[-> table(p)] [r1: (?a p ?c) <- (?a p ?b), (?b p ?c)]",
            "(a p b) (b p c) (b p d)",
        );
        let answers = graph.find_all(&goal("(* p *)")).unwrap();
        assert_eq!(sorted(answers), vec!["(a p b)", "(a p c)", "(a p d)", "(b p c)", "(b p d)"]);
    }

    #[test]
    fn test_axioms_appear_once() {
        let graph = bind(
            "[a1: -> (a r C1)] [a2: -> (a r C2)] [a3: (b r C1) <- ] [r1: (?x s ?y) <- (?x r ?y)]",
            "",
        );
        for _ in 0..2 {
            let answers = graph.find_all(&goal("(* s *)")).unwrap();
            assert_eq!(sorted(answers), vec!["(a s C1)", "(a s C2)", "(b s C1)"]);
        }
    }

    #[test]
    fn test_functor_triples_hidden() {
        let rules = "[r1: (?x r foo(?y ?z)) <- (?x p ?y), (?x q ?z)] [r2: (?x s ?y) <- (?x r foo(?z ?y))]";
        let triples = "(a p C1) (a p C3) (a q C2) (b p D1) (b q D2) (b q D3)";
        let graph = bind(rules, triples);
        assert!(graph.find_all(&goal("(* r *)")).unwrap().is_empty());
        assert_eq!(graph.find_all(&goal("(* s *)")).unwrap().len(), 3);

        let mut config = EngineConfig::default();
        config.reasoning.hide_functor_triples = false;
        let graph = Reasoner::from_text(rules).unwrap().with_config(config).bind(data(triples)).unwrap();
        assert_eq!(graph.find_all(&goal("(* r *)")).unwrap().len(), 4);
    }

    #[test]
    fn test_forward_derivations() {
        let mut config = EngineConfig::default();
        config.reasoning.derivation_logging = true;
        let graph = Reasoner::from_text(
            "[testRule1: (C1 p ?a) -> (C2 p ?a)] \
             [testRule2: (C1 q ?a) -> (C2 q ?a)] \
             [testRule3: (C2 p ?a), (C2 q ?a) -> (a p ?a)]",
        )
        .unwrap()
        .with_config(config)
        .bind(data("(C1 p C3) (C1 q C3)"))
        .unwrap();

        let derivations = graph.get_derivation(&t("a", "p", "C3"));
        assert_eq!(derivations.len(), 1);
        assert_eq!(derivations[0].rule().display_name(), "testRule3");
        assert_eq!(derivations[0].matches(), &[t("C2", "p", "C3"), t("C2", "q", "C3")]);
        let expected = "Rule testRule3 concluded (a p C3) <-\n\
                        \x20   Rule testRule1 concluded (C2 p C3) <-\n\
                        \x20       Fact (C1 p C3)\n\
                        \x20   Rule testRule2 concluded (C2 q C3) <-\n\
                        \x20       Fact (C1 q C3)\n";
        assert_eq!(graph.explain(&t("a", "p", "C3")).as_deref(), Some(expected));
        assert!(graph.explain(&t("C1", "p", "C3")).is_none());
    }

    #[test]
    fn test_derivation_logging_not_retroactive() {
        let mut graph = bind("[r1: (?a p ?b) -> (?a q ?b)]", "(a p b)");
        graph.set_derivation_logging(true);
        assert!(graph.get_derivation(&t("a", "q", "b")).is_empty());
        graph.add(t("c", "p", "d")).unwrap();
        assert_eq!(graph.get_derivation(&t("c", "q", "d")).len(), 1);
    }

    #[derive(Debug)]
    struct IsEven;

    impl Builtin for IsEven {
        fn name(&self) -> &str {
            "isEven"
        }

        fn arg_length(&self) -> Option<usize> {
            Some(1)
        }

        fn body_call(&self, args: &[Term], ctx: &mut dyn RuleContext) -> bool {
            helpers::get_int(args, 0, ctx).map_or(false, |n| n % 2 == 0)
        }
    }

    #[test]
    fn test_layered_registry() {
        let rules = "[r1: (?x v ?n) isEven(?n) -> (?x kind even)]";
        let err = Reasoner::from_text(rules).unwrap().bind(Store::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownBuiltin);

        let mut registry = BuiltinRegistry::layered(BuiltinRegistry::global());
        registry.register(IsEven);
        let graph = Reasoner::from_text(rules)
            .unwrap()
            .with_registry(Arc::new(registry))
            .bind(data("(a v 2) (b v 3) (c v 4)"))
            .unwrap();
        assert_eq!(sorted(graph.find_all(&goal("(* kind *)")).unwrap()), vec!["(a kind even)", "(c kind even)"]);
        assert!(!BuiltinRegistry::global().contains("isEven"));
    }

    #[test]
    fn test_step_limit_surfaces_from_iterator() {
        let mut config = EngineConfig::default();
        config.reasoning.max_steps = 200;
        let graph = Reasoner::from_text("[r1: (?a p ?c) <- (?a p ?b), (?b p ?c)]")
            .unwrap()
            .with_config(config)
            .bind(data("(a p b) (b p c)"))
            .unwrap();
        let err = graph.find_all(&goal("(* p *)")).unwrap_err();
        assert_eq!(err.code, ErrorCode::StepLimitExceeded);
    }

    #[test]
    fn test_set_tabled_after_bind() {
        let mut graph = bind("[r1: (?a p ?c) <- (?a p ?b), (?b p ?c)]", "(a p b) (b p c)");
        graph.set_tabled(Node::uri("p"));
        assert_eq!(graph.find_all(&goal("(a p *)")).unwrap().len(), 2);
        assert!(graph.generation() > 0);
        assert!(graph.n_rules_fired() > 0);
    }

    #[test]
    fn test_reset_recomputes() {
        let mut graph = bind("[r1: (?a p ?b) -> (?a q ?b)]", "(a p b)");
        let fired = graph.n_rules_fired();
        graph.reset().unwrap();
        assert_eq!(graph.n_rules_fired(), fired);
        assert!(graph.contains(&t("a", "q", "b")).unwrap());
    }

    #[test]
    fn test_interleaved_iterators() {
        let graph = bind(
            "[r1: (?x r ?y) <- (?x p ?y)] [r2: (?x r ?y) <- (?x q ?y)] [r3: (?x s ?y) <- (?x r ?y)]",
            "(a p b) (a p c) (a q d) (a q e) (b p x)",
        );
        let mut outer = graph.find(&goal("(a s *)"));
        let mut answers = vec![outer.next().unwrap().unwrap()];
        {
            let mut inner = graph.find(&goal("(* r *)"));
            assert!(inner.next().unwrap().is_ok());
        }
        for answer in outer {
            answers.push(answer.unwrap());
        }
        assert_eq!(sorted(answers), vec!["(a s b)", "(a s c)", "(a s d)", "(a s e)"]);
        assert_eq!(graph.find_all(&goal("(* r *)")).unwrap().len(), 5);
    }

    #[test]
    fn test_interleaved_iterators_over_shared_tables() {
        let graph = bind(
            "[-> table(p)] [r1: (?a p ?c) <- (?a p ?b), (?b p ?c)]",
            "(a p b) (b p c) (c p d)",
        );
        let mut outer = graph.find(&goal("(a p *)"));
        let mut answers = vec![outer.next().unwrap().unwrap()];
        let mut inner = graph.find(&goal("(* p *)"));
        assert!(inner.next().unwrap().is_ok());
        answers.push(outer.next().unwrap().unwrap());
        inner.close();
        for answer in outer {
            answers.push(answer.unwrap());
        }
        assert_eq!(sorted(answers), vec!["(a p b)", "(a p c)", "(a p d)"]);
        assert_eq!(graph.find_all(&goal("(* p *)")).unwrap().len(), 6);
    }

    #[test]
    fn test_value_matching_in_rule_bodies() {
        let graph = bind(
            "[f1: (?x age 3) -> (?x kind three)] \
             [f2: (?x v ?n) (?y w ?n) -> (?x fsame ?y)] \
             [b1: (?x bsame ?y) <- (?x v ?n), (?y w ?n)]",
            "(a age '3'^^xsd:long) (b age 3) (c age '3') (p v 2) (q w '2.0'^^xsd:double) (r w 5)",
        );
        assert_eq!(sorted(graph.find_all(&goal("(* kind *)")).unwrap()), vec!["(a kind three)", "(b kind three)"]);
        assert_eq!(sorted(graph.find_all(&goal("(* fsame *)")).unwrap()), vec!["(p fsame q)"]);
        assert_eq!(sorted(graph.find_all(&goal("(* bsame *)")).unwrap()), vec!["(p bsame q)"]);
        assert_eq!(graph.find_all(&goal("(* age 3)")).unwrap().len(), 2);
    }

    #[test]
    fn test_backward_derivation_survives_unrelated_add() {
        let mut config = EngineConfig::default();
        config.reasoning.derivation_logging = true;
        let mut graph = Reasoner::from_text("[b1: (?x r ?y) <- (?x p ?y)]")
            .unwrap()
            .with_config(config)
            .bind(data("(a p b)"))
            .unwrap();
        assert_eq!(graph.find_all(&goal("(a r *)")).unwrap().len(), 1);
        assert_eq!(graph.get_derivation(&t("a", "r", "b")).len(), 1);

        graph.add(t("c", "p", "d")).unwrap();
        let kept = graph.get_derivation(&t("a", "r", "b"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].matches(), &[t("a", "p", "b")]);

        graph.remove(&t("a", "p", "b")).unwrap();
        assert!(graph.get_derivation(&t("a", "r", "b")).is_empty());
    }

    #[test]
    fn test_schema_binding() {
        let reasoner = Reasoner::from_text(
            "[testRule1: (n1 p ?a) -> (n2 p ?a)] \
             [testRule2: (n1 q ?a) -> (n2 q ?a)] \
             [testRule3: (n2 p ?a), (n2 q ?a) -> (res p ?a)] \
             [testBRule4: (n3 p ?a) <- (n1 p ?a)]",
        )
        .unwrap();
        let bound = reasoner.bind_schema(data("(n1 p n3)")).unwrap();
        assert_eq!(bound.schema().map(TripleStore::len), Some(2));
        assert!(reasoner.schema().is_none());

        let mut graph = bound.bind(data("(n1 q n4) (n1 q n3)")).unwrap();
        let expected = vec![
            "(n1 p n3)",
            "(n1 q n3)",
            "(n1 q n4)",
            "(n2 p n3)",
            "(n2 q n3)",
            "(n2 q n4)",
            "(n3 p n3)",
            "(res p n3)",
        ];
        assert_eq!(sorted(graph.find_all(&Goal::any()).unwrap()), expected);

        graph.rebind(data("(n1 q n5)")).unwrap();
        assert!(graph.contains(&t("n2", "p", "n3")).unwrap());
        assert!(!graph.contains(&t("res", "p", "n3")).unwrap());
    }

    #[test]
    fn test_make_instance_from_backward_rules() {
        let graph = bind(
            "[r1: (?x p ?t) <- (?x rdf:type C1), makeInstance(?x p C2 ?t)] \
             [r2: (?t rdf:type C2) <- (?x rdf:type C1), makeInstance(?x p C2 ?t)]",
            "(a rdf:type C1)",
        );
        let first = graph.find_all(&goal("(a p *)")).unwrap();
        assert_eq!(first.len(), 1);
        let value = first[0].object.clone();
        assert!(value.is_blank());
        assert_eq!(graph.find_all(&goal("(a p *)")).unwrap()[0].object, value);

        let types = graph.find_all(&Goal::new(Some(value), Some(Node::uri(ns::rdf_type())), None)).unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].object, Node::uri("C2"));
    }

    #[test]
    fn test_skolem_values_in_forward_rules() {
        let rules = "[r1: (?n p ?x) (?n q ?y) makeSkolem(?s ?x ?y) -> (?n s ?s)]";
        let skolem = |triples: &str| {
            let found = bind(rules, triples).find_all(&goal("(n1 s *)")).unwrap();
            assert_eq!(found.len(), 1);
            found[0].object.clone()
        };
        let ab = skolem("(n1 p a) (n1 q b)");
        assert!(ab.is_blank());
        assert_eq!(ab, skolem("(n1 p a) (n1 q b)"));
        assert_ne!(ab, skolem("(n1 p b) (n1 q a)"));
        assert_ne!(ab, skolem("(n1 p a) (n1 q 'b')"));
    }

    #[test]
    fn test_hidden_nodes_filtered_from_find() {
        let graph = bind(
            "[-> hide(internal)] [r1: (?x p ?y) -> (?x internal ?y)] [r2: (?x internal ?y) -> (?x q ?y)]",
            "(a p b)",
        );
        assert!(graph.find_all(&goal("(* internal *)")).unwrap().is_empty());
        assert_eq!(sorted(graph.find_all(&Goal::any()).unwrap()), vec!["(a p b)", "(a q b)"]);
        assert_eq!(graph.materialized().len(), 3);
    }
}
