//! Policy statements and their matching rules
//!
//! A statement matches a context when its action, principal, resource, and
//! every condition all match. A matching statement yields its effect as the
//! decision; a non-matching statement yields no decision at all.

use crate::authorization::{AuthorizationContext, Decision, Principal, PrincipalKind};
use crate::condition::{Condition, OperatorRegistry, BUILTIN_OPERATORS};
use crate::pattern::wildcard_match;

/// The effect a matching statement has on the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// `"Effect": "Allow"`
    Allow,
    /// `"Effect": "Deny"`
    Deny,
}

impl Effect {
    fn decision(self) -> Decision {
        match self {
            Effect::Allow => Decision::Allow,
            Effect::Deny => Decision::Deny,
        }
    }
}

/// A single allow/deny rule within a policy
///
/// Empty `principals` and `resources` lists match vacuously: trust policies
/// carry principals but no resources, identity policies the reverse. The
/// action list is guaranteed non-empty by the parser; a hand-built statement
/// with no actions never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Whether a match allows or denies the request
    pub effect: Effect,
    /// Principals allowed to match, OR'ed; ids are wildcard patterns
    pub principals: Vec<Principal>,
    /// Action patterns, OR'ed, matched case-insensitively
    pub actions: Vec<String>,
    /// Resource patterns, OR'ed
    pub resources: Vec<String>,
    /// Conditions, all of which must hold
    pub conditions: Vec<Condition>,
}

impl Statement {
    /// Evaluate the statement against a context
    ///
    /// Returns `None` when the statement does not match (no decision),
    /// otherwise the decision corresponding to the statement's effect.
    pub fn authorize(&self, context: &AuthorizationContext) -> Option<Decision> {
        self.authorize_with(context, &BUILTIN_OPERATORS)
    }

    /// Evaluate the statement using a caller-supplied operator registry
    pub fn authorize_with(
        &self,
        context: &AuthorizationContext,
        registry: &OperatorRegistry,
    ) -> Option<Decision> {
        if !self.matches(context, registry) {
            return None;
        }
        Some(self.effect.decision())
    }

    fn matches(&self, context: &AuthorizationContext, registry: &OperatorRegistry) -> bool {
        self.action_matches(&context.action)
            && self.principal_matches(context.principal.as_ref())
            && self.resource_matches(context.resource.as_deref())
            && self.conditions_match(context, registry)
    }

    /// Action patterns compare case-folded, per the IAM grammar
    fn action_matches(&self, action: &str) -> bool {
        let action = action.to_lowercase();
        self.actions
            .iter()
            .any(|pattern| wildcard_match(&pattern.to_lowercase(), &action))
    }

    fn principal_matches(&self, principal: Option<&Principal>) -> bool {
        if self.principals.is_empty() {
            return true;
        }
        let Some(principal) = principal else {
            return false;
        };
        self.principals.iter().any(|allowed| {
            allowed.kind == PrincipalKind::Any
                || (allowed.kind == principal.kind && wildcard_match(&allowed.id, &principal.id))
        })
    }

    fn resource_matches(&self, resource: Option<&str>) -> bool {
        if self.resources.is_empty() {
            return true;
        }
        let Some(resource) = resource else {
            return false;
        };
        self.resources
            .iter()
            .any(|pattern| wildcard_match(pattern, resource))
    }

    fn conditions_match(
        &self,
        context: &AuthorizationContext,
        registry: &OperatorRegistry,
    ) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.matches_with(context, registry))
    }
}
