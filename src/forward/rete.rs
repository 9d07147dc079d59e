//! RETE network for forward rules
//!
//! Each forward rule compiles to a production: a chain of body nodes ending
//! in a terminal. Triple pattern nodes own an alpha memory (the facts that
//! match the pattern on its own); every body position owns a beta memory of
//! tokens, the partial matches of the body up to and including that
//! position. A token holds the rule's slot array and the facts matched so far.
//!
//! Alpha nodes are indexed by predicate so an injected fact only visits the
//! patterns that can match it. Injecting a fact joins it against the beta
//! memory to the left of each pattern it enters and pushes the new tokens
//! rightwards; a token that reaches the end of the chain becomes a
//! [`Firing`] for the agenda. Retracting a fact drops it from alpha memories
//! and every token built on it.

use std::sync::Arc;

use fnv::FnvHashMap;
use indexmap::IndexSet;
use tracing::debug;

use crate::binding::BindingEnvironment;
use crate::builtins::{Builtin, BuiltinRegistry, StoreContext};
use crate::error::RuleResult;
use crate::rule::{BuiltinCall, Clause, Rule};
use crate::store::Store;
use crate::term::{Node, Term, Triple, TriplePattern};
use crate::unify;

/// A partial match: bindings plus the facts matched by body patterns
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub slots: Vec<Option<Node>>,
    pub matched: Vec<Triple>,
}

impl Token {
    fn empty(size: usize) -> Self {
        Token {
            slots: vec![None; size],
            matched: Vec::new(),
        }
    }
}

/// A complete body match waiting on the agenda
#[derive(Clone, Debug)]
pub struct Firing {
    pub rule: usize,
    pub token: Token,
}

#[derive(Debug)]
enum BodyNode {
    Pattern(TriplePattern),
    Test(Arc<dyn Builtin>, BuiltinCall),
}

/// A compiled head clause
#[derive(Debug)]
pub enum HeadNode {
    Assert(TriplePattern),
    Action(Arc<dyn Builtin>, BuiltinCall),
}

#[derive(Debug)]
struct Production {
    rule: Arc<Rule>,
    body: Vec<BodyNode>,
    head: Vec<HeadNode>,
    alpha: Vec<IndexSet<Triple>>,
    beta: Vec<IndexSet<Token>>,
}

/// One production's memories, borrowed apart so joins can read alpha while writing beta
struct Join<'a> {
    index: usize,
    rule: &'a Rule,
    body: &'a [BodyNode],
    alpha: &'a [IndexSet<Triple>],
    beta: &'a mut [IndexSet<Token>],
    facts: &'a Store,
    out: &'a mut Vec<Firing>,
}

impl Join<'_> {
    /// Extend `token` with `triple` at pattern position `i`
    fn join_fact(&mut self, i: usize, token: Token, triple: &Triple) {
        let BodyNode::Pattern(pattern) = &self.body[i] else {
            return;
        };
        let mut env = BindingEnvironment::from_slots(token.slots);
        if !unify::match_pattern(pattern, triple, &mut env) {
            return;
        }
        let mut matched = token.matched;
        matched.push(triple.clone());
        self.accept(i, Token { slots: env.snapshot(), matched });
    }

    /// Store a token in the beta memory at `i` and push it onwards if new
    fn accept(&mut self, i: usize, token: Token) {
        if self.beta[i].insert(token.clone()) {
            self.advance(i + 1, token);
        }
    }

    /// Continue a token that satisfies every body node before `j`
    fn advance(&mut self, j: usize, token: Token) {
        let body = self.body;
        let Some(node) = body.get(j) else {
            self.out.push(Firing { rule: self.index, token });
            return;
        };
        match node {
            BodyNode::Pattern(_) => {
                let alpha = self.alpha;
                for fact in &alpha[j] {
                    self.join_fact(j, token.clone(), fact);
                }
            }
            BodyNode::Test(builtin, call) => {
                let env = BindingEnvironment::from_slots(token.slots);
                let mut ctx = StoreContext::new(env, self.rule, self.facts);
                if builtin.body_call(call.args(), &mut ctx) {
                    let slots = ctx.env.snapshot();
                    self.accept(j, Token { slots, matched: token.matched });
                }
            }
        }
    }
}

/// The compiled forward rule set and its memories
#[derive(Debug, Default)]
pub struct Network {
    productions: Vec<Production>,
    by_predicate: FnvHashMap<Node, Vec<(usize, usize)>>,
    any_predicate: Vec<(usize, usize)>,
}

impl Network {
    /// Compile forward rules, resolving every builtin through `registry`
    pub fn compile(rules: &[Arc<Rule>], registry: &BuiltinRegistry) -> RuleResult<Self> {
        let mut network = Network::default();
        for rule in rules {
            rule.validate()?;
            let index = network.productions.len();
            let mut body = Vec::with_capacity(rule.body().len());
            for (i, clause) in rule.body().iter().enumerate() {
                match clause {
                    Clause::Pattern(pattern) => {
                        match &pattern.predicate {
                            Term::Constant(p) => network.by_predicate.entry(p.clone()).or_default().push((index, i)),
                            _ => network.any_predicate.push((index, i)),
                        }
                        body.push(BodyNode::Pattern(pattern.clone()));
                    }
                    Clause::Builtin(call) => {
                        let builtin = registry
                            .resolve(call, false)
                            .map_err(|e| e.with_context("rule", rule.to_string()))?;
                        body.push(BodyNode::Test(builtin, call.clone()));
                    }
                }
            }
            let mut head = Vec::with_capacity(rule.head().len());
            for clause in rule.head() {
                match clause {
                    Clause::Pattern(pattern) => head.push(HeadNode::Assert(pattern.clone())),
                    Clause::Builtin(call) => {
                        let builtin = registry
                            .resolve(call, true)
                            .map_err(|e| e.with_context("rule", rule.to_string()))?;
                        head.push(HeadNode::Action(builtin, call.clone()));
                    }
                }
            }
            debug!(rule = rule.display_name(), nodes = body.len(), "compiled production");
            network.productions.push(Production {
                rule: rule.clone(),
                alpha: vec![IndexSet::new(); body.len()],
                beta: vec![IndexSet::new(); body.len()],
                body,
                head,
            });
        }
        Ok(network)
    }

    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    pub fn rule(&self, index: usize) -> Option<&Arc<Rule>> {
        self.productions.get(index).map(|p| &p.rule)
    }

    pub fn head(&self, index: usize) -> &[HeadNode] {
        match self.productions.get(index) {
            Some(production) => &production.head,
            None => &[],
        }
    }

    /// Run every production from an empty token
    ///
    /// Axioms fire here; leading builtin tests fill their beta memories.
    pub fn seed(&mut self, facts: &Store) -> Vec<Firing> {
        let mut out = Vec::new();
        for index in 0..self.productions.len() {
            let production = &mut self.productions[index];
            let size = production.rule.num_vars();
            let Production { rule, body, alpha, beta, .. } = production;
            let mut join = Join { index, rule: rule.as_ref(), body, alpha, beta, facts, out: &mut out };
            join.advance(0, Token::empty(size));
        }
        out
    }

    fn alpha_targets(&self, predicate: &Node) -> Vec<(usize, usize)> {
        let mut targets = self.by_predicate.get(predicate).cloned().unwrap_or_default();
        targets.extend_from_slice(&self.any_predicate);
        targets
    }

    /// Add a fact to the network, returning the firings it completes
    pub fn inject(&mut self, triple: &Triple, facts: &Store) -> Vec<Firing> {
        let mut entered = Vec::new();
        for (r, i) in self.alpha_targets(&triple.predicate) {
            let production = &mut self.productions[r];
            if let BodyNode::Pattern(pattern) = &production.body[i] {
                let mut env = BindingEnvironment::new(production.rule.num_vars());
                if unify::match_pattern(pattern, triple, &mut env) && production.alpha[i].insert(triple.clone()) {
                    entered.push((r, i));
                }
            }
        }

        let mut out = Vec::new();
        for (index, i) in entered {
            let production = &mut self.productions[index];
            let left: Vec<Token> = match i {
                0 => vec![Token::empty(production.rule.num_vars())],
                _ => production.beta[i - 1].iter().cloned().collect(),
            };
            let Production { rule, body, alpha, beta, .. } = production;
            let mut join = Join { index, rule: rule.as_ref(), body, alpha, beta, facts, out: &mut out };
            for token in left {
                join.join_fact(i, token, triple);
            }
        }
        out
    }

    /// Remove a fact and every partial match built on it
    pub fn retract(&mut self, triple: &Triple) {
        for (r, i) in self.alpha_targets(&triple.predicate) {
            let production = &mut self.productions[r];
            if production.alpha[i].shift_remove(triple) {
                for memory in &mut production.beta[i..] {
                    memory.retain(|token| !token.matched.contains(triple));
                }
            }
        }
    }

    /// Empty every memory, keeping the compiled rules
    pub fn clear(&mut self) {
        for production in &mut self.productions {
            production.alpha.iter_mut().for_each(IndexSet::clear);
            production.beta.iter_mut().for_each(IndexSet::clear);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parse_rules;
    use crate::store::TripleStore;

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Node::uri(s), Node::uri(p), Node::uri(o))
    }

    fn network(src: &str) -> Network {
        let rules: Vec<Arc<Rule>> = parse_rules(src).unwrap().into_iter().map(Arc::new).collect();
        Network::compile(&rules, &BuiltinRegistry::global()).unwrap()
    }

    #[test]
    fn test_join_completes_on_second_fact() {
        let mut net = network("[r: (?a p ?b) (?b p ?c) -> (?a q ?c)]");
        let mut facts = Store::new();

        facts.add(t("a", "p", "b"));
        let first = net.inject(&t("a", "p", "b"), &facts);
        assert!(first.is_empty());

        facts.add(t("b", "p", "c"));
        let second = net.inject(&t("b", "p", "c"), &facts);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].token.matched, vec![t("a", "p", "b"), t("b", "p", "c")]);
    }

    #[test]
    fn test_self_join_fires_once() {
        let mut net = network("[r: (?a p ?a) (?a p ?a) -> (?a q ?a)]");
        let mut facts = Store::new();
        facts.add(t("x", "p", "x"));
        assert_eq!(net.inject(&t("x", "p", "x"), &facts).len(), 1);
    }

    #[test]
    fn test_retract_drops_tokens() {
        let mut net = network("[r: (?a p ?b) (?b p ?c) -> (?a q ?c)]");
        let mut facts = Store::new();
        facts.add(t("a", "p", "b"));
        net.inject(&t("a", "p", "b"), &facts);
        net.retract(&t("a", "p", "b"));
        facts.remove(&t("a", "p", "b"));

        facts.add(t("b", "p", "c"));
        assert!(net.inject(&t("b", "p", "c"), &facts).is_empty());
    }

    #[test]
    fn test_axiom_fires_on_seed() {
        let mut net = network("[ax: -> (a p b)] [r: (?x p ?y) -> (?y p ?x)]");
        let firings = net.seed(&Store::new());
        assert_eq!(firings.len(), 1);
        assert_eq!(firings[0].rule, 0);
    }

    #[test]
    fn test_builtin_filter() {
        let mut net = network("[r: (?x v ?n) greaterThan(?n 2) -> (?x size big)]");
        let mut facts = Store::new();
        let small = Triple::new(Node::uri("a"), Node::uri("v"), Node::integer(1));
        let large = Triple::new(Node::uri("b"), Node::uri("v"), Node::integer(5));
        facts.add(small.clone());
        facts.add(large.clone());
        assert!(net.inject(&small, &facts).is_empty());
        assert_eq!(net.inject(&large, &facts).len(), 1);
    }
}
