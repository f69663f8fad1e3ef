//! Policies: ordered statement lists and policy-level evaluation
//!
//! Policy-level evaluation collapses the three statement-level outcomes to
//! two: any matching deny statement denies the request outright, any
//! matching allow statement (with no deny) allows it, and a policy nothing
//! matches denies implicitly. Statement order never changes the outcome.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::authorization::{AuthorizationContext, Decision, PrincipalKind};
use crate::condition::{OperatorRegistry, BUILTIN_OPERATORS};
use crate::statement::{Effect, Statement};

/// A parsed IAM policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// The document's `Version` field, if present
    pub version: Option<String>,
    /// Statements in document order
    pub statements: Vec<Statement>,
}

impl Policy {
    /// An empty policy, which denies every request
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the policy against a context
    ///
    /// Explicit deny short-circuits regardless of any allow statements and
    /// of statement order; with no matching statement the policy denies
    /// implicitly.
    pub fn authorize(&self, context: &AuthorizationContext) -> Decision {
        self.authorize_with(context, &BUILTIN_OPERATORS)
    }

    /// Evaluate the policy using a caller-supplied operator registry
    pub fn authorize_with(
        &self,
        context: &AuthorizationContext,
        registry: &OperatorRegistry,
    ) -> Decision {
        let mut allowed = false;
        for statement in &self.statements {
            match statement.authorize_with(context, registry) {
                Some(Decision::Deny) => return Decision::Deny,
                Some(Decision::Allow) => allowed = true,
                None => {}
            }
        }
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    /// Concatenate another policy's statements onto this one
    ///
    /// Used for identity-based privilege checks that span several attached
    /// policies. Merging is associative; because explicit deny dominates,
    /// the merge order cannot change any decision.
    pub fn merge(mut self, other: Policy) -> Policy {
        self.statements.extend(other.statements);
        self
    }

    /// Render the canonical JSON form of the policy
    ///
    /// Every string-or-array position becomes an array, principals are
    /// regrouped by type, and conditions are regrouped by operator then key
    /// in sorted order. Parsing the canonical form yields the same AST, so
    /// parse-serialize-parse is idempotent.
    pub fn to_json(&self) -> Value {
        let statements: Vec<Value> = self.statements.iter().map(statement_json).collect();
        let mut document = serde_json::Map::new();
        if let Some(version) = &self.version {
            document.insert("Version".into(), json!(version));
        }
        document.insert("Statement".into(), Value::Array(statements));
        Value::Object(document)
    }
}

fn statement_json(statement: &Statement) -> Value {
    let mut object = serde_json::Map::new();
    object.insert(
        "Effect".into(),
        json!(match statement.effect {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }),
    );

    if !statement.principals.is_empty() {
        object.insert("Principal".into(), principals_json(statement));
    }
    object.insert("Action".into(), json!(statement.actions));
    if !statement.resources.is_empty() {
        object.insert("Resource".into(), json!(statement.resources));
    }
    if !statement.conditions.is_empty() {
        object.insert("Condition".into(), conditions_json(statement));
    }
    Value::Object(object)
}

fn principals_json(statement: &Statement) -> Value {
    // The wildcard principal only ever appears alone; it round-trips
    // through the raw string form
    if statement
        .principals
        .iter()
        .any(|p| p.kind == PrincipalKind::Any)
    {
        return json!("*");
    }

    let mut by_type: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for principal in &statement.principals {
        let type_name = match principal.kind {
            PrincipalKind::Aws => "AWS",
            PrincipalKind::Federated => "Federated",
            PrincipalKind::Service => "Service",
            PrincipalKind::CanonicalUser => "CanonicalUser",
            PrincipalKind::Any => unreachable!("handled above"),
        };
        by_type.entry(type_name).or_default().push(&principal.id);
    }
    json!(by_type)
}

fn conditions_json(statement: &Statement) -> Value {
    let mut by_operator: BTreeMap<&str, BTreeMap<&str, &Vec<String>>> = BTreeMap::new();
    for condition in &statement.conditions {
        by_operator
            .entry(&condition.operator)
            .or_default()
            .insert(&condition.key, &condition.values);
    }
    json!(by_operator)
}
