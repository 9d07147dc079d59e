//! Literals: a lexical form plus an optional language tag or datatype
//!
//! Equality is by lexical form and tag. Value-based comparison across
//! numeric subtypes and dates lives in `builtins::value`; pattern matching
//! and binding checks go through it.

use std::fmt;

use super::uri::ns;

/// What qualifies the lexical form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralTag {
    Simple,
    Lang(String),
    /// Full datatype URI
    Datatype(String),
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    lexical: String,
    tag: LiteralTag,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            tag: LiteralTag::Simple,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            tag: LiteralTag::Datatype(datatype.into()),
        }
    }

    /// Language tags compare case-insensitively, so they are stored lowercased
    pub fn with_language(lexical: impl Into<String>, lang: impl AsRef<str>) -> Self {
        Literal {
            lexical: lexical.into(),
            tag: LiteralTag::Lang(lang.as_ref().to_ascii_lowercase()),
        }
    }

    pub fn value(&self) -> &str {
        &self.lexical
    }

    pub fn tag(&self) -> &LiteralTag {
        &self.tag
    }

    pub fn language(&self) -> Option<&str> {
        match &self.tag {
            LiteralTag::Lang(lang) => Some(lang),
            _ => None,
        }
    }

    pub fn datatype(&self) -> Option<&str> {
        match &self.tag {
            LiteralTag::Datatype(uri) => Some(uri),
            _ => None,
        }
    }

    /// Local name of an XML Schema datatype (`int`, `dateTime`, ...)
    pub fn xsd_type(&self) -> Option<&str> {
        self.datatype().and_then(|dt| dt.strip_prefix(ns::XSD))
    }

    pub fn parse_i64(&self) -> Option<i64> {
        self.lexical.trim().parse().ok()
    }

    pub fn parse_f64(&self) -> Option<f64> {
        self.lexical.trim().parse().ok()
    }

    /// True when the rule parser would read the bare lexical form back as this literal
    fn prints_bare(&self) -> bool {
        let starts_numeric = |s: &str| {
            let digits = s.strip_prefix('-').unwrap_or(s);
            digits.chars().next().map_or(false, |c| c.is_ascii_digit())
        };
        if !starts_numeric(&self.lexical) {
            return false;
        }
        match self.xsd_type() {
            Some("int") => !self.lexical.contains('.') && self.parse_i64().is_some(),
            Some("float") => self.lexical.contains('.') && self.parse_f64().is_some(),
            _ => false,
        }
    }
}

fn quoted(lexical: &str) -> String {
    format!("'{}'", lexical.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Literal({:?}, {:?})", self.lexical, self.tag)
    }
}

/// Rule-text form: bare numbers for `xsd:int`/`xsd:float`, otherwise quoted
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prints_bare() {
            return f.write_str(&self.lexical);
        }
        match &self.tag {
            LiteralTag::Simple => f.write_str(&quoted(&self.lexical)),
            LiteralTag::Lang(lang) => write!(f, "{}@{}", quoted(&self.lexical), lang),
            LiteralTag::Datatype(dt) => write!(f, "{}^^{}", quoted(&self.lexical), ns::compact(dt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_literal_prints_quoted() {
        let lit = Literal::plain("hello");
        assert_eq!(lit.tag(), &LiteralTag::Simple);
        assert_eq!(lit.to_string(), "'hello'");
    }

    #[test]
    fn test_numeric_literals_print_bare() {
        let int = Literal::typed("42", ns::xsd("int"));
        assert_eq!(int.parse_i64(), Some(42));
        assert_eq!(int.to_string(), "42");

        let float = Literal::typed("2.5", ns::xsd("float"));
        assert_eq!(float.to_string(), "2.5");

        let long = Literal::typed("42", ns::xsd("long"));
        assert_eq!(long.to_string(), "'42'^^xsd:long");

        let odd = Literal::typed("abc", ns::xsd("int"));
        assert_eq!(odd.to_string(), "'abc'^^xsd:int");
    }

    #[test]
    fn test_language_tag_lowercased() {
        let lit = Literal::with_language("hello", "EN");
        assert_eq!(lit.language(), Some("en"));
        assert_eq!(lit, Literal::with_language("hello", "en"));
        assert_eq!(lit.to_string(), "'hello'@en");
    }

    #[test]
    fn test_quote_escaping() {
        assert_eq!(Literal::plain("it's").to_string(), "'it\\'s'");
    }
}
