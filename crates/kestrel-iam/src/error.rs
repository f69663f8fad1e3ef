//! Error types for policy parsing

use thiserror::Error;

/// Error returned when a policy document cannot be parsed
///
/// Each variant names the field or value that was rejected so that callers
/// can surface the failure against the role it came from. Parse errors are
/// fatal to the one policy, never to a whole scan.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not well-formed JSON
    #[error("unable to parse policy document from JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The `Statement` block is neither an object nor an array of objects
    #[error("invalid statement block: {0}")]
    InvalidStatement(String),

    /// A statement has no `Effect` field
    #[error("statement is missing an Effect")]
    MissingEffect,

    /// A statement's `Effect` is neither allow nor deny
    #[error("invalid effect: {0}")]
    InvalidEffect(String),

    /// The `Principal` block is neither the literal `"*"` nor an object
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    /// A principal type key is not one of aws, federated, service,
    /// canonicaluser
    #[error("invalid principal type: {0}")]
    UnknownPrincipalType(String),

    /// A string-or-array position holds a number, bool, object, or null
    #[error("{field}: expected a string or an array of strings")]
    ExpectedStrings {
        /// The field the rejected value was found in
        field: String,
    },

    /// A statement has no `Action`, or its action array is empty
    #[error("statement has an empty Action list")]
    EmptyActions,

    /// A `Condition` block is not an object of operator to key/value maps
    #[error("invalid condition block: {0}")]
    InvalidCondition(String),
}

impl ParseError {
    /// Create an [`ParseError::ExpectedStrings`] for the given field
    pub(crate) fn expected_strings(field: impl Into<String>) -> Self {
        Self::ExpectedStrings {
            field: field.into(),
        }
    }
}
