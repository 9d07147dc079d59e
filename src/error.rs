//! Structured error handling for the rule engine
//!
//! Every fallible engine operation returns [`RuleResult`]. A [`RuleError`]
//! carries a numeric [`ErrorCode`], a message and optionally the source
//! location and offending rule text, and serializes to JSON for tooling.
//!
//! # Error Categories
//!
//! - Parse errors (1xxx): malformed rule text
//! - Compile errors (2xxx): structurally invalid rules, rejected at bind time
//! - Runtime errors (3xxx): unbound variables, concurrent modification, step limits
//! - Config errors (7xxx)
//! - Internal errors (9xxx)
//!
//! A builtin returning `false` is ordinary backtracking and never surfaces here.
//!
//! # Example
//!
//! ```rust,ignore
//! use ruleinf::error::{RuleError, ErrorCode};
//!
//! fn check(text: &str) -> Result<(), RuleError> {
//!     if text.is_empty() {
//!         return Err(RuleError::parse("empty rule text").at("1:1"));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};

// ============================================================================
// Error Codes
// ============================================================================

/// Numeric error codes, grouped by thousands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Parse errors (1xxx)
    /// Malformed rule syntax
    RuleParse = 1000,
    /// Qname with an undeclared prefix
    UnknownPrefix = 1001,
    /// Triple pattern with the wrong shape
    MalformedTriple = 1002,
    /// Rule text ended inside a rule
    UnexpectedEof = 1003,

    // Compile errors (2xxx)
    /// Structurally invalid rule
    RuleCompilation = 2000,
    /// Head variable never bound by the body
    UnboundHeadVariable = 2001,
    /// Rule calls a builtin nobody registered
    UnknownBuiltin = 2002,
    /// Builtin called with the wrong number of arguments
    BuiltinArity = 2003,

    // Runtime errors (3xxx)
    /// Instantiation reached a variable with no binding
    UnboundVariable = 3000,
    /// Graph changed under an open iterator
    ConcurrentModification = 3001,
    /// Resolution or propagation step budget exhausted
    StepLimitExceeded = 3002,
    /// Unwind or commit without a matching push
    BindingStackUnderflow = 3003,
    /// Builtin head action failed
    BuiltinFailed = 3004,

    // Config errors (7xxx)
    /// Unreadable or unwritable config file
    ConfigError = 7000,
    /// Config file is not valid TOML for the schema
    InvalidConfigSyntax = 7001,

    // Internal errors (9xxx)
    InternalError = 9000,
}

impl ErrorCode {
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Short human label, used by `Display`
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::RuleParse => "Rule parse error",
            ErrorCode::UnknownPrefix => "Unknown prefix",
            ErrorCode::MalformedTriple => "Malformed triple pattern",
            ErrorCode::UnexpectedEof => "Unexpected end of rule text",

            ErrorCode::RuleCompilation => "Rule compilation error",
            ErrorCode::UnboundHeadVariable => "Head variable not bound by body",
            ErrorCode::UnknownBuiltin => "Unknown builtin",
            ErrorCode::BuiltinArity => "Wrong builtin arity",

            ErrorCode::UnboundVariable => "Unbound variable",
            ErrorCode::ConcurrentModification => "Concurrent modification",
            ErrorCode::StepLimitExceeded => "Step limit exceeded",
            ErrorCode::BindingStackUnderflow => "Binding stack underflow",
            ErrorCode::BuiltinFailed => "Builtin failed",

            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",

            ErrorCode::InternalError => "Internal error",
        }
    }

    /// Parse errors are reported with source location
    pub fn is_parse(&self) -> bool {
        (1000..2000).contains(&self.code())
    }

    pub fn is_compilation(&self) -> bool {
        (2000..3000).contains(&self.code())
    }

    /// Fatal conditions signal an engine or rule bug rather than a query outcome
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorCode::UnboundVariable | ErrorCode::BindingStackUnderflow | ErrorCode::InternalError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Where an error happened and what it was looking at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Named details such as `rule` or `near`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
    /// `line:column` for rule text, `file:line` for engine faults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// ============================================================================
// Main Error Type
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// What the caller can do about it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl RuleError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    // ========================================================================
    // Factory methods
    // ========================================================================

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RuleParse, message)
    }

    pub fn compilation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RuleCompilation, message)
    }

    /// Instantiation met a variable nothing bound; always an engine or rule bug
    pub fn unbound_variable(name: &str) -> Self {
        Self::new(
            ErrorCode::UnboundVariable,
            format!("variable ?{} has no binding at instantiation", name),
        )
    }

    /// Raised by an open iterator after the graph changed
    pub fn concurrent_modification() -> Self {
        Self::new(
            ErrorCode::ConcurrentModification,
            "graph was modified while a find iterator was open",
        )
        .with_hint("close the iterator and re-issue the query")
    }

    pub fn step_limit(steps: usize, limit: usize) -> Self {
        Self::new(
            ErrorCode::StepLimitExceeded,
            format!("Inference stopped after {} steps (limit: {})", steps, limit),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Attach a named detail
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Record where the error happened
    pub fn at(mut self, location: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.location = Some(location.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn location(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.location.as_deref())
    }

    /// Look up a context field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.fields.get(key)).map(String::as_str)
    }

    /// JSON record for tooling; falls back to code and message alone
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!(r#"{{"code":{},"message":{:?}}}"#, self.code.code(), self.message))
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(ref ctx) = self.context {
            if let Some(ref loc) = ctx.location {
                write!(f, " at {}", loc)?;
            }
            if let Some(rule) = ctx.fields.get("rule") {
                write!(f, "\n  in rule: {}", rule)?;
            }
            if let Some(near) = ctx.fields.get("near") {
                write!(f, "\n  near: '{}'", near)?;
            }
        }

        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for RuleError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for RuleError {
    fn from(err: std::io::Error) -> Self {
        RuleError::new(ErrorCode::InternalError, err.to_string()).with_context("source", "io")
    }
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        RuleError::internal(err.to_string()).with_context("format", "JSON")
    }
}

impl From<toml::de::Error> for RuleError {
    fn from(err: toml::de::Error) -> Self {
        RuleError::new(ErrorCode::InvalidConfigSyntax, err.to_string())
    }
}

// ============================================================================
// Result type alias
// ============================================================================

pub type RuleResult<T> = Result<T, RuleError>;

// ============================================================================
// Macros for convenient error creation
// ============================================================================

/// Build a [`RuleError`] stamped with the calling `file:line`
#[macro_export]
macro_rules! rule_error {
    ($code:expr, $msg:expr) => {
        $crate::error::RuleError::new($code, $msg)
            .at(format!("{}:{}", file!(), line!()))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::RuleError::new($code, format!($fmt, $($arg)*))
            .at(format!("{}:{}", file!(), line!()))
    };
}

#[macro_export]
macro_rules! rule_bail {
    ($code:expr, $msg:expr) => {
        return Err($crate::rule_error!($code, $msg))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::rule_error!($code, $fmt, $($arg)*))
    };
}

/// Return early with an error unless the condition holds
#[macro_export]
macro_rules! rule_ensure {
    ($cond:expr, $code:expr, $msg:expr) => {
        if !$cond {
            $crate::rule_bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::rule_bail!($code, $fmt, $($arg)*);
        }
    };
}

// ============================================================================
// Tests
// ============================================================================
