//! Rule text parser
//!
//! Accepts the bracketed rule syntax
//!
//! ```text
//! @prefix eg: <http://example.org/>.
//! # comment
//! [r1: (?a eg:p ?b), (?b eg:p ?c) -> (?a eg:p ?c)]
//! [r2: (?x r C1) <- (?x p ?v), lessThan(?v 3)]
//! [-> table(eg:p)]
//! (?a q 1) <- (?a p 0).
//! ```
//!
//! Tokens are recognized with nom combinators; the rule structure is walked
//! by [`RuleParser`], which owns the prefix table and assigns variable slots
//! per rule in order of first appearance. Errors carry `line:column` and the
//! text at the point of failure.

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace1},
    combinator::{opt, recognize, value},
    multi::many0,
    sequence::{pair, preceded, tuple},
    IResult,
};
use tracing::debug;

use super::{BuiltinCall, Clause, Direction, Rule};
use crate::error::{ErrorCode, RuleError, RuleResult};
use crate::term::uri::ns;
use crate::term::{Goal, Node, Term, Triple, TriplePattern};

// ============================================================================
// Token parsers
// ============================================================================

/// Skip whitespace, `#` comments and `//` comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), preceded(char('#'), take_while(|c| c != '\n'))),
            value((), preceded(tag("//"), take_while(|c| c != '\n'))),
        ))),
    )(input)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// A bare name: `p`, `C1`, `lessThan`, `eg-thing`
fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic()),
        take_while(is_name_char),
    ))(input)
}

/// A rule label, which may also contain dots
fn rule_label(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| is_name_char(c) || c == '.')(input)
}

/// `<...>`
fn iri_ref(input: &str) -> IResult<&str, &str> {
    let (input, _) = char('<')(input)?;
    let (input, iri) = take_while(|c: char| c != '>' && !c.is_whitespace())(input)?;
    let (input, _) = char('>')(input)?;
    Ok((input, iri))
}

/// `?name`, or `?*` for an anonymous variable
fn variable(input: &str) -> IResult<&str, &str> {
    preceded(
        char('?'),
        alt((tag("*"), take_while1(|c: char| c.is_alphanumeric() || c == '_'))),
    )(input)
}

/// `_label`
fn blank(input: &str) -> IResult<&str, &str> {
    preceded(char('_'), take_while1(is_name_char))(input)
}

/// `-12`, `3`, `1.5`
fn number(input: &str) -> IResult<&str, &str> {
    recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1)))))(input)
}

/// A single- or double-quoted string with backslash escapes
fn quoted(input: &str) -> IResult<&str, String> {
    let quote = match input.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char))),
    };
    let mut out = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&input[i + c.len_utf8()..], out));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Eof)))
}

/// `@en`, `@en-GB`
fn lang_tag(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_while1(|c: char| c.is_alphanumeric() || c == '-'))(input)
}

/// Everything up to the next delimiter, used for unprefixed scheme URIs such as `http://x/y`
fn uri_tail(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| !c.is_whitespace() && !"()[],'\"".contains(c))(input)
}

// ============================================================================
// Cursor with source positions
// ============================================================================

struct Cursor<'a> {
    source: &'a str,
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Cursor { source, rest: source }
    }

    fn skip_ws(&mut self) {
        if let Ok((rest, _)) = ws(self.rest) {
            self.rest = rest;
        }
    }

    /// Skip whitespace and optional comma separators
    fn skip_separators(&mut self) {
        loop {
            self.skip_ws();
            match self.rest.strip_prefix(',') {
                Some(rest) => self.rest = rest,
                None => break,
            }
        }
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn run<T>(&mut self, parser: impl FnOnce(&'a str) -> IResult<&'a str, T>) -> Option<T> {
        match parser(self.rest) {
            Ok((rest, out)) => {
                self.rest = rest;
                Some(out)
            }
            Err(_) => None,
        }
    }

    fn location(&self) -> String {
        let offset = self.source.len() - self.rest.len();
        let consumed = &self.source[..offset];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
        format!("{}:{}", line, column)
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>) -> RuleError {
        let near: String = self.rest.lines().next().unwrap_or("").chars().take(40).collect();
        let err = RuleError::new(code, message).at(self.location());
        if near.is_empty() {
            err
        } else {
            err.with_context("near", near)
        }
    }

    fn expect(&mut self, token: &str) -> RuleResult<()> {
        if self.eat(token) {
            Ok(())
        } else if self.at_end() {
            Err(self.error(ErrorCode::UnexpectedEof, format!("expected '{}' but the input ended", token)))
        } else {
            Err(self.error(ErrorCode::RuleParse, format!("expected '{}'", token)))
        }
    }
}

// ============================================================================
// Variable scope
// ============================================================================

/// Assigns slots to variable names in order of first appearance
#[derive(Default)]
struct VarScope {
    slots: IndexMap<String, usize>,
    anonymous: usize,
    /// Reject variables (data files)
    closed: bool,
}

impl VarScope {
    fn open() -> Self {
        VarScope::default()
    }

    fn closed() -> Self {
        VarScope { closed: true, ..Default::default() }
    }

    fn variable(&mut self, name: &str) -> Term {
        let next = self.slots.len() + self.anonymous;
        if name == "*" {
            self.anonymous += 1;
            return Term::var("*", next);
        }
        let slot = *self.slots.entry(name.to_string()).or_insert(next);
        Term::var(name, slot)
    }
}

/// Where a clause list stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Arrow(Direction),
    Bracket,
    Dot,
    End,
}

/// Build a functor term, folding fully ground functors into constant nodes
fn make_functor(name: &str, args: Vec<Term>) -> Term {
    if args.iter().all(|a| matches!(a, Term::Constant(_))) {
        let nodes = args
            .into_iter()
            .filter_map(|a| match a {
                Term::Constant(n) => Some(n),
                _ => None,
            })
            .collect();
        Term::Constant(Node::functor(name, nodes))
    } else {
        Term::functor(name, args)
    }
}

// ============================================================================
// Rule parser
// ============================================================================

/// Parser for rule text, holding the prefix table
#[derive(Debug, Clone)]
pub struct RuleParser {
    prefixes: IndexMap<String, String>,
}

impl Default for RuleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleParser {
    /// Create a parser with the default prefixes (rdf, rdfs, owl, xsd)
    pub fn new() -> Self {
        RuleParser {
            prefixes: ns::default_prefixes(),
        }
    }

    /// Create a parser with additional prefixes
    pub fn with_prefixes<'p>(extra: impl IntoIterator<Item = (&'p String, &'p String)>) -> Self {
        let mut parser = Self::new();
        for (prefix, namespace) in extra {
            parser.add_prefix(prefix, namespace);
        }
        parser
    }

    pub fn add_prefix(&mut self, prefix: &str, namespace: &str) {
        self.prefixes.insert(prefix.to_string(), namespace.to_string());
    }

    pub fn prefixes(&self) -> &IndexMap<String, String> {
        &self.prefixes
    }

    /// Parse a complete rule document
    ///
    /// Either every rule parses or an error is returned; no partial result.
    pub fn parse_rules(&mut self, input: &str) -> RuleResult<Vec<Rule>> {
        let mut cur = Cursor::new(input);
        let mut rules = Vec::new();
        loop {
            cur.skip_ws();
            if cur.at_end() {
                break;
            }
            if cur.rest.starts_with("@prefix") {
                self.prefix_directive(&mut cur)?;
                continue;
            }
            rules.push(self.rule(&mut cur)?);
        }
        debug!(count = rules.len(), "parsed rules");
        Ok(rules)
    }

    /// Parse ground `(s p o)` clauses, the data file format
    pub fn parse_triples(&mut self, input: &str) -> RuleResult<Vec<Triple>> {
        let mut cur = Cursor::new(input);
        let mut scope = VarScope::closed();
        let mut triples = Vec::new();
        loop {
            cur.skip_separators();
            while cur.eat(".") {
                cur.skip_separators();
            }
            if cur.at_end() {
                break;
            }
            if cur.rest.starts_with("@prefix") {
                self.prefix_directive(&mut cur)?;
                continue;
            }
            if cur.peek() != Some('(') {
                return Err(cur.error(ErrorCode::MalformedTriple, "expected a triple '(s p o)'"));
            }
            let pattern = self.pattern(&mut cur, &mut scope)?;
            let node = |t: Term| match t {
                Term::Constant(n) => Some(n),
                _ => None,
            };
            match (node(pattern.subject), node(pattern.predicate), node(pattern.object)) {
                (Some(s), Some(p), Some(o)) => triples.push(Triple::new(s, p, o)),
                _ => return Err(cur.error(ErrorCode::MalformedTriple, "data triples must be ground")),
            }
        }
        Ok(triples)
    }

    /// Parse a query pattern `(s p o)` where `?x` or `*` is a wildcard
    pub fn parse_goal(&mut self, input: &str) -> RuleResult<Goal> {
        let mut cur = Cursor::new(input);
        cur.skip_ws();
        cur.expect("(")?;
        let mut slots: Vec<Option<Node>> = Vec::with_capacity(3);
        let mut scope = VarScope::open();
        loop {
            cur.skip_separators();
            if cur.eat(")") {
                break;
            }
            if cur.eat("*") {
                slots.push(None);
                continue;
            }
            match self.term(&mut cur, &mut scope)? {
                Term::Constant(n) => slots.push(Some(n)),
                Term::Variable(_) => slots.push(None),
                Term::Functor(_) => {
                    return Err(cur.error(ErrorCode::MalformedTriple, "query positions must be ground or wildcards"))
                }
            }
        }
        cur.skip_ws();
        if slots.len() != 3 || !cur.at_end() {
            return Err(cur.error(ErrorCode::MalformedTriple, "a query is exactly one '(s p o)' pattern"));
        }
        let mut it = slots.into_iter();
        Ok(Goal::new(it.next().flatten(), it.next().flatten(), it.next().flatten()))
    }

    /// `@prefix eg: <http://example.org/>.`
    fn prefix_directive(&mut self, cur: &mut Cursor<'_>) -> RuleResult<()> {
        cur.expect("@prefix")?;
        cur.skip_ws();
        let prefix = cur.run(take_while(is_name_char)).unwrap_or("");
        cur.expect(":")?;
        cur.skip_ws();
        let namespace = cur
            .run(iri_ref)
            .ok_or_else(|| cur.error(ErrorCode::RuleParse, "expected <namespace> in @prefix"))?;
        cur.skip_ws();
        cur.expect(".")?;
        self.add_prefix(prefix, namespace);
        Ok(())
    }

    fn rule(&self, cur: &mut Cursor<'_>) -> RuleResult<Rule> {
        let mut scope = VarScope::open();
        if cur.eat("[") {
            cur.skip_ws();
            let name = self.rule_name(cur);
            let (first, stop) = self.clauses(cur, &mut scope)?;
            let direction = match stop {
                Stop::Arrow(direction) => direction,
                Stop::End => return Err(cur.error(ErrorCode::UnexpectedEof, "unterminated rule, expected ']'")),
                _ => return Err(cur.error(ErrorCode::RuleParse, "rule has no '->' or '<-'")),
            };
            let (second, stop) = self.clauses(cur, &mut scope)?;
            match stop {
                Stop::Bracket => {}
                Stop::End => return Err(cur.error(ErrorCode::UnexpectedEof, "unterminated rule, expected ']'")),
                _ => return Err(cur.error(ErrorCode::RuleParse, "expected ']' to close the rule")),
            }
            Ok(Self::assemble(name, first, second, direction))
        } else {
            let (first, stop) = self.clauses(cur, &mut scope)?;
            let direction = match stop {
                Stop::Arrow(direction) => direction,
                _ => return Err(cur.error(ErrorCode::RuleParse, "expected '->' or '<-'")),
            };
            let (second, stop) = self.clauses(cur, &mut scope)?;
            match stop {
                Stop::Dot => Ok(Self::assemble(None, first, second, direction)),
                Stop::End => Err(cur.error(ErrorCode::UnexpectedEof, "unterminated rule, expected '.'")),
                _ => Err(cur.error(ErrorCode::RuleParse, "expected '.' after rule")),
            }
        }
    }

    fn assemble(name: Option<String>, first: Vec<Clause>, second: Vec<Clause>, direction: Direction) -> Rule {
        match direction {
            Direction::Forward => Rule::new(name, first, second, direction),
            Direction::Backward => Rule::new(name, second, first, direction),
        }
    }

    /// `name:` at the start of a bracketed rule
    fn rule_name(&self, cur: &mut Cursor<'_>) -> Option<String> {
        let mut ahead = Cursor { source: cur.source, rest: cur.rest };
        let label = ahead.run(rule_label)?;
        if !ahead.eat(":") {
            return None;
        }
        match ahead.peek() {
            Some(c) if !c.is_whitespace() && c != '(' && c != '[' => return None,
            _ => {}
        }
        cur.rest = ahead.rest;
        cur.skip_ws();
        Some(label.to_string())
    }

    /// Read clauses up to an arrow, `]`, a terminating `.`, or the end of input
    fn clauses(&self, cur: &mut Cursor<'_>, scope: &mut VarScope) -> RuleResult<(Vec<Clause>, Stop)> {
        let mut clauses = Vec::new();
        loop {
            cur.skip_separators();
            if cur.at_end() {
                return Ok((clauses, Stop::End));
            }
            if cur.eat("->") {
                return Ok((clauses, Stop::Arrow(Direction::Forward)));
            }
            if cur.eat("<-") {
                return Ok((clauses, Stop::Arrow(Direction::Backward)));
            }
            if cur.eat("]") {
                return Ok((clauses, Stop::Bracket));
            }
            if cur.eat(".") {
                return Ok((clauses, Stop::Dot));
            }
            if cur.peek() == Some('(') {
                clauses.push(Clause::Pattern(self.pattern(cur, scope)?));
                continue;
            }
            let call_name = match cur.run(name) {
                Some(n) => n,
                None => return Err(cur.error(ErrorCode::RuleParse, "expected a triple pattern or builtin call")),
            };
            cur.skip_ws();
            if cur.peek() != Some('(') {
                return Err(cur.error(ErrorCode::RuleParse, format!("expected '(' after builtin name '{}'", call_name)));
            }
            let args = self.arguments(cur, scope)?;
            clauses.push(Clause::Builtin(BuiltinCall::new(call_name, args)));
        }
    }

    /// `(s p o)` with optional commas
    fn pattern(&self, cur: &mut Cursor<'_>, scope: &mut VarScope) -> RuleResult<TriplePattern> {
        cur.expect("(")?;
        let mut terms = Vec::with_capacity(3);
        loop {
            cur.skip_separators();
            if cur.eat(")") {
                break;
            }
            if cur.at_end() {
                return Err(cur.error(ErrorCode::UnexpectedEof, "unterminated triple pattern"));
            }
            terms.push(self.term(cur, scope)?);
        }
        if terms.len() != 3 {
            return Err(cur.error(
                ErrorCode::MalformedTriple,
                format!("triple pattern has {} terms, expected 3", terms.len()),
            ));
        }
        let mut it = terms.into_iter();
        match (it.next(), it.next(), it.next()) {
            (Some(s), Some(p), Some(o)) => Ok(TriplePattern::new(s, p, o)),
            _ => Err(cur.error(ErrorCode::MalformedTriple, "triple pattern needs three terms")),
        }
    }

    /// `(arg arg ...)` for builtins and functors
    fn arguments(&self, cur: &mut Cursor<'_>, scope: &mut VarScope) -> RuleResult<Vec<Term>> {
        cur.expect("(")?;
        let mut args = Vec::new();
        loop {
            cur.skip_separators();
            if cur.eat(")") {
                return Ok(args);
            }
            if cur.at_end() {
                return Err(cur.error(ErrorCode::UnexpectedEof, "unterminated argument list"));
            }
            args.push(self.term(cur, scope)?);
        }
    }

    fn term(&self, cur: &mut Cursor<'_>, scope: &mut VarScope) -> RuleResult<Term> {
        match cur.peek() {
            Some('?') => {
                let var_name = cur
                    .run(variable)
                    .ok_or_else(|| cur.error(ErrorCode::RuleParse, "malformed variable"))?;
                if scope.closed {
                    return Err(cur.error(ErrorCode::MalformedTriple, "variables are not allowed here"));
                }
                Ok(scope.variable(var_name))
            }
            Some('<') => {
                let iri = cur.run(iri_ref).ok_or_else(|| cur.error(ErrorCode::RuleParse, "malformed <uri>"))?;
                Ok(Term::uri(iri))
            }
            Some('\'') | Some('"') => self.literal(cur),
            Some('_') => {
                let label = cur.run(blank).ok_or_else(|| cur.error(ErrorCode::RuleParse, "malformed blank node"))?;
                Ok(Term::Constant(Node::blank(label)))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let text = cur.run(number).ok_or_else(|| cur.error(ErrorCode::RuleParse, "malformed number"))?;
                Ok(Term::Constant(Self::number_node(text)))
            }
            Some(c) if c.is_alphabetic() => self.named_term(cur, scope),
            Some(_) => Err(cur.error(ErrorCode::RuleParse, "unexpected character")),
            None => Err(cur.error(ErrorCode::UnexpectedEof, "expected a term")),
        }
    }

    fn number_node(text: &str) -> Node {
        if text.contains('.') {
            Node::typed_literal(text, ns::xsd("float"))
        } else {
            match text.parse::<i64>() {
                Ok(n) => Node::integer(n),
                Err(_) => Node::typed_literal(text, ns::xsd("integer")),
            }
        }
    }

    /// Bare names, qnames and functors
    fn named_term(&self, cur: &mut Cursor<'_>, scope: &mut VarScope) -> RuleResult<Term> {
        let start = cur.rest;
        let token = cur.run(name).ok_or_else(|| cur.error(ErrorCode::RuleParse, "expected a name"))?;
        if cur.peek() == Some('(') {
            let args = self.arguments(cur, scope)?;
            return Ok(make_functor(token, args));
        }
        if !cur.eat(":") {
            return Ok(Term::uri(token));
        }
        if let Some(namespace) = self.prefixes.get(token) {
            let local = cur.run(take_while(is_name_char)).unwrap_or("");
            return Ok(Term::uri(format!("{}{}", namespace, local)));
        }
        if ns::URI_SCHEMES.contains(&token) {
            let tail = cur.run(uri_tail).unwrap_or("");
            let tail = match tail.strip_suffix('.') {
                Some(trimmed) => {
                    cur.rest = &start[token.len() + 1 + trimmed.len()..];
                    trimmed
                }
                None => tail,
            };
            return Ok(Term::uri(format!("{}:{}", token, tail)));
        }
        cur.rest = start;
        Err(cur.error(ErrorCode::UnknownPrefix, format!("undeclared prefix '{}'", token)))
    }

    /// `'lex'`, `'lex'@lang`, `'lex'^^type`
    fn literal(&self, cur: &mut Cursor<'_>) -> RuleResult<Term> {
        let lex = cur
            .run(quoted)
            .ok_or_else(|| cur.error(ErrorCode::UnexpectedEof, "unterminated string literal"))?;
        if let Some(lang) = cur.run(lang_tag) {
            return Ok(Term::Constant(Node::lang_literal(lex, lang)));
        }
        if cur.eat("^^") {
            let datatype = match cur.peek() {
                Some('<') => cur.run(iri_ref).map(str::to_string),
                _ => {
                    let prefix = cur.run(name).unwrap_or("");
                    cur.expect(":")?;
                    let local = cur.run(take_while(is_name_char)).unwrap_or("");
                    match self.prefixes.get(prefix) {
                        Some(namespace) => Some(format!("{}{}", namespace, local)),
                        None => {
                            return Err(cur.error(ErrorCode::UnknownPrefix, format!("undeclared prefix '{}'", prefix)))
                        }
                    }
                }
            };
            let datatype = datatype.ok_or_else(|| cur.error(ErrorCode::RuleParse, "malformed datatype"))?;
            return Ok(Term::Constant(Node::typed_literal(lex, datatype)));
        }
        Ok(Term::Constant(Node::literal(lex)))
    }
}

/// Parse a rule document with the default prefixes
pub fn parse_rules(input: &str) -> RuleResult<Vec<Rule>> {
    RuleParser::new().parse_rules(input)
}

/// Parse exactly one rule
pub fn parse_rule(input: &str) -> RuleResult<Rule> {
    let mut rules = parse_rules(input)?;
    match rules.len() {
        1 => Ok(rules.remove(0)),
        n => Err(RuleError::parse(format!("expected one rule, found {}", n))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backward_rule() {
        let rule = parse_rule("[r1: (?a r ?c) <- (?a p ?b), (?b p ?c)]").unwrap();
        assert_eq!(rule.name(), Some("r1"));
        assert!(rule.is_backward());
        assert_eq!(rule.head().len(), 1);
        assert_eq!(rule.body().len(), 2);
        assert_eq!(rule.num_vars(), 3);
        assert_eq!(rule.to_string(), "[ r1: (?a r ?c) <- (?a p ?b) (?b p ?c) ]");
    }

    #[test]
    fn test_parse_forward_rule_with_builtin() {
        let rule = parse_rule("[r1: (n1 p ?x), addOne(?x, ?y) -> (n1 q ?y)]").unwrap();
        assert_eq!(rule.direction(), Direction::Forward);
        let call = rule.body()[1].as_builtin().unwrap();
        assert_eq!(call.name(), "addOne");
        assert_eq!(call.args().len(), 2);
    }

    #[test]
    fn test_parse_axiom_and_directive() {
        let rules = parse_rules("[axiom1: -> (n1 p n3)] [ -> table(p)]").unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].is_axiom());
        assert_eq!(rules[1].head()[0].as_builtin().unwrap().name(), "table");
    }

    #[test]
    fn test_parse_unbracketed_rules() {
        let rules = parse_rules("(?a p 1) <- (?a p 0). (?a p 2) <- (?a p 0).").unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].name().is_none());
        assert_eq!(rules[1].to_string(), "[ (?a p 2) <- (?a p 0) ]");
    }

    #[test]
    fn test_parse_literals() {
        let rule = parse_rule("[r: (?x p 'hello') (?x q 'hi'@en) (?x s '3'^^xsd:long) (?x t 1.5) -> (?x r -3)]").unwrap();
        let objs: Vec<String> = rule.body_patterns().map(|p| p.object.to_string()).collect();
        assert_eq!(objs, vec!["'hello'", "'hi'@en", "'3'^^xsd:long", "1.5"]);
        let head = rule.head_patterns().next().unwrap();
        let lit = head.object.as_node().unwrap().as_literal().unwrap();
        assert_eq!(lit.value(), "-3");
        assert_eq!(lit.xsd_type(), Some("int"));
    }

    #[test]
    fn test_parse_prefixes_and_comments() {
        let text = "@prefix eg: <http://example.org/>.\n\
                    # a comment\n\
                    // another\n\
                    [r: (?x rdf:type eg:C) -> (?x eg:p <http://other.org/x>)]";
        let rule = parse_rule(text).unwrap();
        let body = rule.body_patterns().next().unwrap();
        assert_eq!(body.predicate, Term::uri(ns::rdf_type()));
        assert_eq!(body.object, Term::uri("http://example.org/C"));
    }

    #[test]
    fn test_parse_functors() {
        let rule = parse_rule("[r1: (?x s ?y) <- (?x p foo(?z, ?y))]").unwrap();
        let body = rule.body_patterns().next().unwrap();
        assert!(body.object.is_functor());
        assert_eq!(body.object.to_string(), "foo(?z ?y)");

        let ground = parse_rule("[ -> (a p f(b 1))]").unwrap();
        let head = ground.head_patterns().next().unwrap();
        assert!(head.object.as_node().unwrap().is_functor());
    }

    #[test]
    fn test_slots_by_first_appearance() {
        let rule = parse_rule("[r: (?b p ?a) -> (?a q ?b)]").unwrap();
        let body = rule.body_patterns().next().unwrap();
        match (&body.subject, &body.object) {
            (Term::Variable(b), Term::Variable(a)) => {
                assert_eq!(b.slot(), 0);
                assert_eq!(a.slot(), 1);
            }
            _ => panic!("expected variables"),
        }
    }

    #[test]
    fn test_round_trip() {
        let texts = [
            "[r1: (?a r ?c) <- (?a p ?b), (?b p ?c)]",
            "[r2: (n1 p ?x), lessThan(?x, 3) -> (n2 q ?x)]",
            "[r3: (?x r foo(?y,?z)) <- (?x p ?y), (?x q ?z)]",
            "[r4: (?x p 'it\\'s'@en) (?x q '2020-01-01'^^xsd:date) -> print(?x 'done') (?x s _b1)]",
            "[ -> (<http://example.org/a?b=1> p 1.25)]",
        ];
        for text in texts {
            let rule = parse_rule(text).unwrap();
            let again = parse_rule(&rule.to_string()).unwrap();
            assert_eq!(rule, again, "round trip of {}", text);
            assert_eq!(rule.to_string(), again.to_string());
        }
    }

    #[test]
    fn test_unknown_prefix() {
        let err = parse_rules("[r: (?x foo:bar ?y) -> (?y p ?x)]").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownPrefix);
        assert_eq!(err.location(), Some("1:9"));
    }

    #[test]
    fn test_scheme_uri_without_prefix() {
        let rule = parse_rule("[r: (?x http://example.org/p ?y) -> (?y q ?x)]").unwrap();
        let body = rule.body_patterns().next().unwrap();
        assert_eq!(body.predicate, Term::uri("http://example.org/p"));
    }

    #[test]
    fn test_parse_errors_report_location() {
        let err = parse_rules("[r1: (?a p ?b) -> (?a q)]").unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedTriple);
        assert!(err.location().is_some());

        let err = parse_rules("[r1: (?a p ?b) -> (?a q ?b)").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedEof);

        let err = parse_rules("[r1: (?a p ?b) (?a q ?b)]").unwrap_err();
        assert_eq!(err.code, ErrorCode::RuleParse);
    }

    #[test]
    fn test_parse_triples() {
        let mut parser = RuleParser::new();
        let triples = parser.parse_triples("(a p b). (b p c)\n(c q 'x')").unwrap();
        assert_eq!(triples.len(), 3);
        assert_eq!(triples[2].to_string(), "(c q 'x')");
        assert!(parser.parse_triples("(a p ?x)").is_err());
    }

    #[test]
    fn test_parse_goal() {
        let mut parser = RuleParser::new();
        let goal = parser.parse_goal("(a p ?x)").unwrap();
        assert_eq!(goal, Goal::new(Some(Node::uri("a")), Some(Node::uri("p")), None));
        let goal = parser.parse_goal("(* * *)").unwrap();
        assert_eq!(goal, Goal::any());
    }
}
