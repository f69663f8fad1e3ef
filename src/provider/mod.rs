//! Data-provider abstraction layer
//!
//! The resolver never talks to the cloud or the cluster directly: it drives
//! these two contracts, which adapters implement over whatever client stack
//! is available. Providers own pagination and retry/backoff internally and
//! surface materialized lists; the resolver retries nothing itself. Provider
//! clients are not assumed thread-safe beyond `Send + Sync`.
//!
//! [`KubeWorkloadProvider`] is the in-tree adapter for the workload side.

mod kube;

pub use kube::KubeWorkloadProvider;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::model::{Pod, ServiceAccount};
use crate::Result;

/// Control-plane facts needed before enumeration starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    /// The cluster ARN; the account id is extracted from it
    pub arn: String,
    /// OIDC issuer URL including scheme, e.g.
    /// `https://oidc.eks.us-east-1.amazonaws.com/id/1234`; `None` when the
    /// cluster has no OIDC identity provider
    pub oidc_issuer_url: Option<String>,
    /// Kubernetes version string as reported by the control plane
    pub kubernetes_version: String,
}

/// One IAM role as returned by role enumeration
///
/// The trust-policy document is still percent-encoded, exactly as the IAM
/// API returns it; the resolver decodes once before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleListing {
    /// Role ARN
    pub arn: String,
    /// Percent-encoded trust-policy JSON document
    pub trust_policy_document: String,
}

/// A pod-identity association id, as returned by the list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSummary {
    /// Association id, usable with
    /// [`IamProvider::describe_pod_identity_association`]
    pub id: String,
}

/// A described pod-identity association: the (namespace, service-account)
/// pair it binds and the role it grants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodIdentityAssociation {
    /// Namespace the association applies to
    pub namespace: String,
    /// Service account name the association applies to
    pub service_account: String,
    /// ARN of the granted role
    pub role_arn: String,
}

/// Access to the cluster side: control-plane description and workload
/// enumeration
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Describe the cluster's control plane
    ///
    /// A failure here aborts the scan; nothing downstream can proceed
    /// without the account id and issuer.
    async fn describe_cluster(&self, name: &str) -> Result<ClusterInfo>;

    /// List service accounts across all namespaces
    async fn list_service_accounts(&self) -> Result<Vec<ServiceAccount>>;

    /// List pods across all namespaces
    ///
    /// Implementations populate [`Pod::mounts_federation_token`] from the
    /// pod spec's projected volumes.
    async fn list_pods(&self) -> Result<Vec<Pod>>;
}

/// Access to the IAM side: role enumeration and pod-identity associations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IamProvider: Send + Sync {
    /// List every role in the account with its trust-policy document
    ///
    /// A failure here aborts the scan.
    async fn list_roles(&self) -> Result<Vec<RoleListing>>;

    /// List the pod-identity associations configured for a cluster
    async fn list_pod_identity_associations(
        &self,
        cluster_name: &str,
    ) -> Result<Vec<AssociationSummary>>;

    /// Describe one pod-identity association
    ///
    /// A failure here skips the one association, not the scan.
    async fn describe_pod_identity_association(
        &self,
        association_id: &str,
    ) -> Result<PodIdentityAssociation>;
}
