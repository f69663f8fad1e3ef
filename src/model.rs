//! The cluster model produced by an audit
//!
//! All entities are immutable after the resolver constructs them; consumers
//! receive the [`Cluster`] snapshot and read it without synchronisation.
//! Relations are one-way by name (pod to service account, edge to role) and
//! resolved by lookup, so the graph carries no cyclic references.

use std::collections::BTreeMap;

use kestrel_iam::Policy;

use crate::ROLE_ARN_ANNOTATION;

/// The audited cluster and everything discovered in it
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Cluster name as given to the resolver
    pub name: String,
    /// Cloud account id, extracted from the cluster ARN
    pub account_id: String,
    /// OIDC issuer with the `https://` scheme stripped; `None` when the
    /// cluster has no OIDC identity provider configured
    pub oidc_issuer: Option<String>,
    /// Kubernetes version string as reported by the control plane
    pub kubernetes_version: String,
    /// Service accounts across all namespaces
    pub service_accounts: Vec<ServiceAccount>,
    /// Pods across all namespaces
    pub pods: Vec<Pod>,
    /// IAM roles whose trust policy parsed successfully
    pub roles: Vec<IamRole>,
    /// Discovered service-account-to-role edges, sorted by
    /// (namespace, service account, role ARN, mechanism)
    pub edges: Vec<RoleEdge>,
}

impl Cluster {
    /// Look up a service account by namespace and name
    pub fn service_account(&self, namespace: &str, name: &str) -> Option<&ServiceAccount> {
        self.service_accounts
            .iter()
            .find(|sa| sa.namespace == namespace && sa.name == name)
    }

    /// Resolve a pod's service-account link
    pub fn pod_service_account(&self, pod: &Pod) -> Option<&ServiceAccount> {
        let name = pod.service_account.as_deref()?;
        self.service_account(&pod.namespace, name)
    }

    /// Edges granted to one (namespace, service-account) identity
    pub fn edges_for<'a>(
        &'a self,
        namespace: &'a str,
        service_account: &'a str,
    ) -> impl Iterator<Item = &'a RoleEdge> {
        self.edges
            .iter()
            .filter(move |edge| edge.namespace == namespace && edge.service_account == service_account)
    }
}

/// A Kubernetes service account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    /// Object name
    pub name: String,
    /// Namespace the account lives in
    pub namespace: String,
    /// Object annotations, verbatim
    pub annotations: BTreeMap<String, String>,
}

impl ServiceAccount {
    /// The role ARN the account is annotated with, if any
    ///
    /// Purely informational: web-identity assumption is decided by trust
    /// policies, and a role may be assumable without any annotation present.
    pub fn role_arn_annotation(&self) -> Option<&str> {
        self.annotations.get(ROLE_ARN_ANNOTATION).map(String::as_str)
    }
}

/// A pod and its workload-identity posture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    /// Object name
    pub name: String,
    /// Namespace the pod runs in
    pub namespace: String,
    /// Name of the service account the pod runs as, if set; resolved
    /// against the same namespace
    pub service_account: Option<String>,
    /// Whether the pod mounts a projected service-account token whose
    /// audience is the federation audience
    pub mounts_federation_token: bool,
}

/// An IAM role with its parsed trust policy
#[derive(Debug, Clone)]
pub struct IamRole {
    /// Role ARN
    pub arn: String,
    /// The role's trust policy (its resource-based assume-role policy)
    pub trust_policy: Policy,
}

/// How a service account came to be able to assume a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mechanism {
    /// OIDC web-identity federation through the role's trust policy
    WebIdentity,
    /// A pod-identity association; the association itself is the grant
    PodIdentity,
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mechanism::WebIdentity => write!(f, "oidc-web-identity"),
            Mechanism::PodIdentity => write!(f, "pod-identity"),
        }
    }
}

/// One discovered grant: a service account can assume a role
///
/// Field order gives the derived ordering the resolver sorts edges by:
/// namespace, then service account, then role ARN, then mechanism.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoleEdge {
    /// Namespace of the service account
    pub namespace: String,
    /// Service account name
    pub service_account: String,
    /// ARN of the assumable role
    pub role_arn: String,
    /// The federation mechanism that enabled the grant
    pub mechanism: Mechanism,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cluster() -> Cluster {
        Cluster {
            name: "test".into(),
            account_id: "012345678901".into(),
            oidc_issuer: Some("oidc.example.com/id/1234".into()),
            kubernetes_version: "1.29".into(),
            service_accounts: vec![ServiceAccount {
                name: "my-sa".into(),
                namespace: "my-ns".into(),
                annotations: BTreeMap::from([(
                    ROLE_ARN_ANNOTATION.to_string(),
                    "arn:aws:iam::012345678901:role/my-role".to_string(),
                )]),
            }],
            pods: vec![
                Pod {
                    name: "api-0".into(),
                    namespace: "my-ns".into(),
                    service_account: Some("my-sa".into()),
                    mounts_federation_token: true,
                },
                Pod {
                    name: "orphan".into(),
                    namespace: "my-ns".into(),
                    service_account: Some("deleted-sa".into()),
                    mounts_federation_token: false,
                },
            ],
            roles: vec![],
            edges: vec![
                RoleEdge {
                    namespace: "my-ns".into(),
                    service_account: "my-sa".into(),
                    role_arn: "arn:aws:iam::012345678901:role/my-role".into(),
                    mechanism: Mechanism::WebIdentity,
                },
                RoleEdge {
                    namespace: "other-ns".into(),
                    service_account: "my-sa".into(),
                    role_arn: "arn:aws:iam::012345678901:role/my-role".into(),
                    mechanism: Mechanism::PodIdentity,
                },
            ],
        }
    }

    #[test]
    fn pod_links_resolve_within_the_namespace() {
        let cluster = sample_cluster();
        let linked = cluster.pod_service_account(&cluster.pods[0]);
        assert_eq!(linked.map(|sa| sa.name.as_str()), Some("my-sa"));

        // A dangling link resolves to nothing rather than erroring
        assert!(cluster.pod_service_account(&cluster.pods[1]).is_none());
    }

    #[test]
    fn edges_for_filters_by_identity() {
        let cluster = sample_cluster();
        let edges: Vec<_> = cluster.edges_for("my-ns", "my-sa").collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].mechanism, Mechanism::WebIdentity);
    }

    #[test]
    fn role_annotation_helper_reads_the_eks_annotation() {
        let cluster = sample_cluster();
        assert_eq!(
            cluster.service_accounts[0].role_arn_annotation(),
            Some("arn:aws:iam::012345678901:role/my-role")
        );
    }

    #[test]
    fn edge_ordering_follows_field_order() {
        let mut edges = sample_cluster().edges;
        edges.reverse();
        edges.sort();
        assert_eq!(edges[0].namespace, "my-ns");
        assert_eq!(edges[1].namespace, "other-ns");
    }

    #[test]
    fn mechanism_display_names_are_stable() {
        assert_eq!(Mechanism::WebIdentity.to_string(), "oidc-web-identity");
        assert_eq!(Mechanism::PodIdentity.to_string(), "pod-identity");
    }
}
