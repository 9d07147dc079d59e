//! URI (IRI) representation and prefix handling

use std::fmt;

use indexmap::IndexMap;

/// A URI reference
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri {
    value: String,
}

impl Uri {
    /// Create a new URI
    pub fn new(value: String) -> Self {
        Uri { value }
    }

    /// Get the URI as a string slice
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Get the namespace (everything up to and including the last # or /)
    pub fn namespace(&self) -> &str {
        if let Some(pos) = self.value.rfind('#') {
            &self.value[..=pos]
        } else if let Some(pos) = self.value.rfind('/') {
            &self.value[..=pos]
        } else {
            ""
        }
    }

    /// Get the local name (fragment or last path segment)
    pub fn local_name(&self) -> &str {
        &self.value[self.namespace().len()..]
    }

    /// True for URIs written as a bare token in rule text (`p`, `C1`, `eg-thing`)
    pub fn is_bare(&self) -> bool {
        is_bare_token(&self.value)
    }
}

/// Check whether a string can be written without quoting or angle brackets
pub(crate) fn is_bare_token(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ns::compact(&self.value))
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Uri::new(s.to_string())
    }
}

impl From<String> for Uri {
    fn from(s: String) -> Self {
        Uri::new(s)
    }
}

/// Well-known namespace URIs and the prefix table shared by the parser and printer
pub mod ns {
    use super::{is_bare_token, IndexMap};

    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const OWL: &str = "http://www.w3.org/2002/07/owl#";

    /// URI schemes accepted in rule text without a prefix declaration
    pub const URI_SCHEMES: &[&str] = &["http", "https", "urn", "file", "ftp", "mailto"];

    pub fn rdf_type() -> String { format!("{}type", RDF) }
    pub fn rdf_nil() -> String { format!("{}nil", RDF) }
    pub fn xsd(local: &str) -> String { format!("{}{}", XSD, local) }

    /// The default prefix table
    pub fn default_prefixes() -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        map.insert("rdf".to_string(), RDF.to_string());
        map.insert("rdfs".to_string(), RDFS.to_string());
        map.insert("owl".to_string(), OWL.to_string());
        map.insert("xsd".to_string(), XSD.to_string());
        map
    }

    /// Expand a `prefix:local` name against a prefix table
    pub fn expand(qname: &str, prefixes: &IndexMap<String, String>) -> Option<String> {
        let (prefix, local) = qname.split_once(':')?;
        prefixes.get(prefix).map(|base| format!("{}{}", base, local))
    }

    /// Render a URI in the shortest form that parses back to the same URI
    pub fn compact(uri: &str) -> String {
        compact_with(uri, &default_prefixes())
    }

    pub fn compact_with(uri: &str, prefixes: &IndexMap<String, String>) -> String {
        for (prefix, base) in prefixes {
            if let Some(local) = uri.strip_prefix(base.as_str()) {
                if !local.is_empty() && local.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                    return format!("{}:{}", prefix, local);
                }
            }
        }
        if is_bare_token(uri) {
            uri.to_string()
        } else {
            format!("<{}>", uri)
        }
    }
}
