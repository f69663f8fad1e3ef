//! Kestrel - audits which Kubernetes workloads can assume which cloud IAM roles
//!
//! A managed cluster federates its workload identities into the cloud IAM
//! system two ways: OIDC web-identity federation (a projected service-account
//! token exchanged via `sts:AssumeRoleWithWebIdentity`, gated by each role's
//! trust policy) and pod-identity associations (a direct binding between a
//! (namespace, service-account) pair and a role). Kestrel enumerates both
//! sides, evaluates every role's trust policy against every workload
//! identity, and reports the resulting service-account-to-role edges.
//!
//! # Modules
//!
//! - [`model`] - The immutable cluster model the audit produces
//! - [`provider`] - Data-provider contracts for the cluster and IAM APIs,
//!   plus a kube-rs backed workload enumeration adapter
//! - [`resolver`] - The phase-driven resolver that builds the model
//! - [`version`] - Kubernetes version parsing for the pod-identity gate
//! - [`error`] - Error types for the audit pipeline
//!
//! Policy parsing and evaluation live in the `kestrel-iam` crate; the
//! resolver only builds authorization contexts and consumes decisions.

#![deny(missing_docs)]

pub mod error;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod version;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Audience carried by projected workload-identity tokens and asserted in
/// trust-policy `:aud` conditions
pub const FEDERATION_AUDIENCE: &str = "sts.amazonaws.com";

/// The action a web-identity federation decides
pub const ASSUME_ROLE_WITH_WEB_IDENTITY: &str = "sts:AssumeRoleWithWebIdentity";

/// Service-account annotation naming the role a workload intends to assume
///
/// Informational in the model: the trust policy, not the annotation, is what
/// grants assumption.
pub const ROLE_ARN_ANNOTATION: &str = "eks.amazonaws.com/role-arn";
