//! ruleinf - rule inference over triple graphs
//!
//! A rule engine in the style of a logic-programming interpreter embedded
//! in a graph query system. Rules are read from text, bound to a base graph
//! and evaluated two ways:
//!
//! - forward rules (`body -> head`) run eagerly in a RETE network that keeps
//!   the deductions up to date as base facts are added and removed;
//! - backward rules (`head <- body`) answer `find` queries on demand through
//!   a tabled resolver, so recursive rule sets terminate.
//!
//! Either engine can record derivations that explain why a triple holds.
//!
//! # Architecture
//!
//! - [`term`] - ground nodes, rule terms, triples, patterns and goals
//! - [`rule`] - the rule model and its text parser
//! - [`binding`] and [`unify`] - slot bindings, matching and instantiation
//! - [`builtins`] - the builtin SPI and the layered registry
//! - [`store`] - the triple store collaborator
//! - [`forward`], [`backward`] - the two engines
//! - [`derivation`] - proof records and rendering
//! - [`graph`] - [`Reasoner`] and the [`InfGraph`] facade
//!
//! # Example
//!
//! ```rust
//! use ruleinf::{Goal, Node, Reasoner, RuleParser, Store};
//!
//! let reasoner = Reasoner::from_text(
//!     "[-> table(p)] [trans: (?a p ?c) <- (?a p ?b), (?b p ?c)]",
//! ).unwrap();
//! let data: Store = RuleParser::new()
//!     .parse_triples("(a p b) (b p c)")
//!     .unwrap()
//!     .into_iter()
//!     .collect();
//! let graph = reasoner.bind(data).unwrap();
//!
//! let goal = Goal::new(Some(Node::uri("a")), Some(Node::uri("p")), None);
//! let answers = graph.find_all(&goal).unwrap();
//! assert_eq!(answers.len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod term;
pub mod rule;
pub mod binding;
pub mod unify;
pub mod builtins;
pub mod store;
pub mod derivation;
pub mod forward;
pub mod backward;
pub mod graph;

// Re-export term types
pub use term::{Goal, Literal, Node, Term, Triple, TriplePattern, Variable};

// Re-export rule types
pub use rule::{parse_rules, BodyElement, BuiltinCall, Clause, Direction, HeadElement, Rule, RuleParser};

pub use binding::BindingEnvironment;

// Re-export builtin SPI
pub use builtins::{Builtin, BuiltinRegistry, RuleContext};

pub use store::{Store, TripleStore};

pub use derivation::{Derivation, DerivationStore};

// Re-export engines
pub use forward::{ForwardEngine, ForwardStats};
pub use backward::{BackwardEngine, Query};

// Re-export the graph facade
pub use graph::{FindIter, InfGraph, Reasoner};

// Re-export configuration types
pub use config::{ConfigError, EngineConfig, GeneralConfig, LogLevel, ReasoningConfig};

// Re-export error types
pub use error::{ErrorCode, ErrorContext, RuleError, RuleResult};
