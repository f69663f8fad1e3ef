//! Authorization requests and decisions
//!
//! An [`AuthorizationContext`] describes one request to be evaluated against
//! a policy: the action, the requesting principal, an optional resource, and
//! the request's context keys. Contexts are immutable once built and cheap
//! to construct per (role, identity) pair.

use crate::keymap::CaseInsensitiveMap;

/// Outcome of a policy-level authorization
///
/// Statement-level evaluation additionally has a no-decision outcome,
/// modeled as `Option<Decision>`; the policy level collapses it to
/// [`Decision::Deny`] (implicit deny).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request is allowed
    Allow,
    /// The request is denied, explicitly or implicitly
    Deny,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow => write!(f, "ALLOW"),
            Decision::Deny => write!(f, "DENY"),
        }
    }
}

/// The kind of principal a statement allows or a context carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    /// The wildcard principal (`"Principal": "*"`); matches every requester
    Any,
    /// An AWS account, user, or role
    Aws,
    /// A federated identity provider (OIDC or SAML)
    Federated,
    /// An AWS service
    Service,
    /// An S3 canonical user
    CanonicalUser,
}

/// An identity, either allowed by a statement or attempting a request
///
/// The `id` of an allowed principal is a wildcard pattern; the `id` of a
/// context principal is a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// What kind of identity this is
    pub kind: PrincipalKind,
    /// Identifier, usually an ARN
    pub id: String,
}

impl Principal {
    /// Create a principal of the given kind
    pub fn new(kind: PrincipalKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// The wildcard principal, as parsed from a raw `"Principal": "*"`
    pub fn any() -> Self {
        Self::new(PrincipalKind::Any, "*")
    }

    /// A federated identity, e.g. an OIDC provider ARN
    pub fn federated(id: impl Into<String>) -> Self {
        Self::new(PrincipalKind::Federated, id)
    }
}

/// One authorization request: who is doing what to which resource
#[derive(Debug, Clone, Default)]
pub struct AuthorizationContext {
    /// The action being attempted, e.g. `sts:AssumeRoleWithWebIdentity`
    pub action: String,
    /// The requesting identity; absent for identity-based policy queries
    pub principal: Option<Principal>,
    /// The resource being acted on; absent for trust-policy queries
    pub resource: Option<String>,
    context_keys: CaseInsensitiveMap<String>,
}

impl AuthorizationContext {
    /// Create a context for the given action
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Set the requesting principal
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Set the target resource
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Add a context key; lookups are case-insensitive
    pub fn with_context_key(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.context_keys.insert(key, value.into());
        self
    }

    /// Look up a context key, ignoring case
    pub fn context_key(&self, key: &str) -> Option<&str> {
        self.context_keys.get(key).map(String::as_str)
    }
}
