//! Condition clauses and the operator registry
//!
//! A condition constrains a statement on one context key under one operator.
//! Operators are plain `fn(context_value, allowed_value) -> bool` entries in
//! an [`OperatorRegistry`]; adding an operator is a map insertion and needs
//! no evaluator changes.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::authorization::AuthorizationContext;

/// Comparator applied to `(context value, allowed value)`
pub type OperatorFn = fn(&str, &str) -> bool;

/// Registry of condition operators, looked up case-insensitively
#[derive(Debug, Clone)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorFn>,
}

impl OperatorRegistry {
    /// An empty registry with no operators
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// The built-in operators: `StringEquals` and `StringLike`
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("stringequals", |value, allowed| value == allowed);
        registry.register("stringlike", |value, allowed| {
            crate::pattern::wildcard_match(allowed, value)
        });
        registry
    }

    /// Register an operator under a case-insensitive name
    pub fn register(&mut self, name: impl AsRef<str>, operator: OperatorFn) {
        self.operators
            .insert(name.as_ref().to_lowercase(), operator);
    }

    /// Look up an operator by name, ignoring case
    pub fn get(&self, name: &str) -> Option<OperatorFn> {
        self.operators.get(&name.to_lowercase()).copied()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The shared built-in registry used by the `authorize` entry points
pub(crate) static BUILTIN_OPERATORS: LazyLock<OperatorRegistry> =
    LazyLock::new(OperatorRegistry::builtin);

/// One condition clause: operator, context key, allowed values
///
/// Operator and key keep their original casing for display; both are
/// compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Operator name as written in the policy, e.g. `StringEquals`
    pub operator: String,
    /// Context key as written in the policy, e.g. `oidc.example.com:sub`
    pub key: String,
    /// Allowed values, OR'ed together
    pub values: Vec<String>,
}

impl Condition {
    /// Create a condition clause
    pub fn new(
        operator: impl Into<String>,
        key: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            operator: operator.into(),
            key: key.into(),
            values,
        }
    }

    /// Whether the condition holds for the given context
    ///
    /// Uses the built-in operator registry.
    pub fn matches(&self, context: &AuthorizationContext) -> bool {
        self.matches_with(context, &BUILTIN_OPERATORS)
    }

    /// Whether the condition holds, using a caller-supplied registry
    ///
    /// A missing context key never matches. An operator the registry does
    /// not know never matches; the statement then fails conservatively
    /// rather than allowing.
    pub fn matches_with(
        &self,
        context: &AuthorizationContext,
        registry: &OperatorRegistry,
    ) -> bool {
        let Some(operator) = registry.get(&self.operator) else {
            return false;
        };
        let Some(context_value) = context.context_key(&self.key) else {
            return false;
        };
        self.values
            .iter()
            .any(|allowed| operator(context_value, allowed))
    }
}
