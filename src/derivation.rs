//! Derivation records
//!
//! When derivation logging is on, each rule firing that concludes a triple
//! leaves a [`Derivation`]: the rule, the conclusion and the triples that
//! matched its body patterns, in body order. Premises are stored flat; the
//! proof tree is rebuilt on demand by looking each premise up again, so a
//! premise that was itself derived prints as a nested rule application and
//! anything with no record prints as a fact.
//!
//! # Example Output
//!
//! ```text
//! Rule testRule3 concluded (a p C3) <-
//!     Rule testRule1 concluded (C2 p C3) <-
//!         Fact (C1 p C3)
//!     Rule testRule2 concluded (C2 q C3) <-
//!         Fact (C1 q C3)
//! ```

use std::collections::HashSet;
use std::fmt::{self, Write};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::rule::Rule;
use crate::term::Triple;

/// One rule application
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Derivation {
    conclusion: Triple,
    rule: Arc<Rule>,
    matches: Vec<Triple>,
}

impl Derivation {
    pub fn new(conclusion: Triple, rule: Arc<Rule>, matches: Vec<Triple>) -> Self {
        Derivation { conclusion, rule, matches }
    }

    pub fn conclusion(&self) -> &Triple {
        &self.conclusion
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// The triples matched by the rule body, in body order
    pub fn matches(&self) -> &[Triple] {
        &self.matches
    }

    /// Write the indented proof tree
    ///
    /// `lookup` yields the recorded derivations of a premise. A premise
    /// already expanded on the current path is not expanded again.
    pub fn print_trace(&self, out: &mut dyn Write, lookup: &dyn Fn(&Triple) -> Vec<Arc<Derivation>>) -> fmt::Result {
        let mut seen = HashSet::new();
        seen.insert(self.conclusion.clone());
        self.write_level(out, lookup, 0, &mut seen)
    }

    /// The proof tree as a string
    pub fn trace(&self, lookup: &dyn Fn(&Triple) -> Vec<Arc<Derivation>>) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.print_trace(&mut out, lookup);
        out
    }

    fn write_level(
        &self,
        out: &mut dyn Write,
        lookup: &dyn Fn(&Triple) -> Vec<Arc<Derivation>>,
        depth: usize,
        seen: &mut HashSet<Triple>,
    ) -> fmt::Result {
        let pad = "    ".repeat(depth);
        writeln!(out, "{}Rule {} concluded {} <-", pad, self.rule.display_name(), self.conclusion)?;
        let inner = "    ".repeat(depth + 1);
        for premise in &self.matches {
            match lookup(premise).first() {
                None => writeln!(out, "{}Fact {}", inner, premise)?,
                Some(_) if seen.contains(premise) => writeln!(out, "{}Known {} - already shown", inner, premise)?,
                Some(sub) => {
                    seen.insert(premise.clone());
                    sub.write_level(out, lookup, depth + 1, seen)?;
                    seen.remove(premise);
                }
            }
        }
        Ok(())
    }

    /// The proof tree as JSON
    pub fn to_json(&self, lookup: &dyn Fn(&Triple) -> Vec<Arc<Derivation>>) -> String {
        let mut seen = HashSet::new();
        seen.insert(self.conclusion.clone());
        let tree = self.to_node(lookup, &mut seen);
        serde_json::to_string_pretty(&tree).unwrap_or_default()
    }

    fn to_node(&self, lookup: &dyn Fn(&Triple) -> Vec<Arc<Derivation>>, seen: &mut HashSet<Triple>) -> ProofNode {
        let premises = self
            .matches
            .iter()
            .map(|premise| match lookup(premise).first() {
                None => ProofNode::Fact { triple: premise.to_string() },
                Some(_) if seen.contains(premise) => ProofNode::Known { triple: premise.to_string() },
                Some(sub) => {
                    seen.insert(premise.clone());
                    let node = sub.to_node(lookup, seen);
                    seen.remove(premise);
                    node
                }
            })
            .collect();
        ProofNode::Rule {
            rule: self.rule.display_name().to_string(),
            conclusion: self.conclusion.to_string(),
            premises,
        }
    }
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Derivation({} by {} from {:?})", self.conclusion, self.rule.display_name(), self.matches)
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ProofNode {
    Rule {
        rule: String,
        conclusion: String,
        premises: Vec<ProofNode>,
    },
    Fact {
        triple: String,
    },
    Known {
        triple: String,
    },
}

/// Derivations indexed by conclusion
#[derive(Debug, Default)]
pub struct DerivationStore {
    by_conclusion: IndexMap<Triple, Vec<Arc<Derivation>>>,
}

impl DerivationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a derivation, ignoring exact repeats
    pub fn record(&mut self, derivation: Derivation) {
        let entry = self.by_conclusion.entry(derivation.conclusion.clone()).or_default();
        if !entry.iter().any(|d| **d == derivation) {
            entry.push(Arc::new(derivation));
        }
    }

    /// Every recorded derivation of a triple
    pub fn get(&self, triple: &Triple) -> Vec<Arc<Derivation>> {
        self.by_conclusion.get(triple).cloned().unwrap_or_default()
    }

    /// Drop the derivations of a retracted triple
    pub fn forget(&mut self, triple: &Triple) {
        self.by_conclusion.shift_remove(triple);
    }

    pub fn len(&self) -> usize {
        self.by_conclusion.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_conclusion.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_conclusion.clear();
    }

    /// Drop derivations that no longer rest on facts
    ///
    /// A derivation survives when each premise satisfies `is_fact` or is the
    /// conclusion of a surviving derivation. Returns how many were dropped.
    pub fn retain_grounded(&mut self, is_fact: impl Fn(&Triple) -> bool) -> usize {
        let all: Vec<Arc<Derivation>> = self.by_conclusion.values().flatten().cloned().collect();
        let mut kept = vec![false; all.len()];
        let mut supported: HashSet<Triple> = HashSet::new();
        loop {
            let mut grew = false;
            for (i, derivation) in all.iter().enumerate() {
                if kept[i] {
                    continue;
                }
                if derivation.matches.iter().all(|m| is_fact(m) || supported.contains(m)) {
                    kept[i] = true;
                    supported.insert(derivation.conclusion.clone());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let removed = kept.iter().filter(|k| !**k).count();
        if removed > 0 {
            self.by_conclusion.clear();
            for (derivation, _) in all.into_iter().zip(kept).filter(|(_, k)| *k) {
                self.by_conclusion.entry(derivation.conclusion.clone()).or_default().push(derivation);
            }
        }
        removed
    }
}
