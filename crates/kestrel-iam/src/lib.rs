//! IAM policy parsing and authorization evaluation
//!
//! Implements the subset of the AWS IAM policy language needed to decide
//! whether a principal may perform an action, most notably
//! `sts:AssumeRoleWithWebIdentity` against a role trust policy.
//!
//! The crate has two halves:
//!
//! - [`parse_policy`] - a tolerant reader for the IAM JSON shape, where
//!   nearly every field accepts either a single value or an array, operator
//!   and type names are case-insensitive, and principal blocks are
//!   polymorphic.
//! - [`Policy::authorize`] - a deterministic evaluator applying the
//!   published IAM rules: explicit deny wins, implicit deny by default,
//!   conditions AND'ed together, values within a condition OR'ed.
//!
//! Evaluation is pure and reentrant: no IO, no locks, no shared mutable
//! state. Parsing returns a typed [`ParseError`] naming the offending field;
//! evaluation never fails.
//!
//! # Example
//!
//! ```
//! use kestrel_iam::{parse_policy, AuthorizationContext, Decision, Principal};
//!
//! let policy = parse_policy(r#"{
//!     "Statement": [{
//!         "Effect": "Allow",
//!         "Principal": { "Federated": "arn:aws:iam::012345678901:oidc-provider/oidc.example.com" },
//!         "Action": "sts:AssumeRoleWithWebIdentity"
//!     }]
//! }"#).unwrap();
//!
//! let ctx = AuthorizationContext::new("sts:AssumeRoleWithWebIdentity")
//!     .with_principal(Principal::federated("arn:aws:iam::012345678901:oidc-provider/oidc.example.com"));
//! assert_eq!(policy.authorize(&ctx), Decision::Allow);
//! ```

#![deny(missing_docs)]

mod authorization;
mod condition;
mod error;
mod keymap;
mod parser;
mod pattern;
mod policy;
mod statement;

pub use authorization::{AuthorizationContext, Decision, Principal, PrincipalKind};
pub use condition::{Condition, OperatorRegistry};
pub use error::ParseError;
pub use keymap::CaseInsensitiveMap;
pub use parser::parse_policy;
pub use pattern::wildcard_match;
pub use policy::Policy;
pub use statement::{Effect, Statement};

/// Result type alias for policy parsing
pub type Result<T> = std::result::Result<T, ParseError>;
