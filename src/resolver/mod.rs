//! Workload-to-role relationship resolution
//!
//! The resolver drives the data providers through five phases: cluster
//! discovery, workload enumeration, role enumeration, web-identity analysis,
//! and pod-identity analysis. The first three are sequential; the last two
//! are independent and run concurrently. Policy evaluation itself is pure,
//! so the role list is shared read-only across analysis without
//! synchronisation.
//!
//! The resolver owns the model it builds and publishes it once; the emitted
//! edge set is sorted, making output deterministic regardless of provider
//! enumeration order.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kestrel_iam::{parse_policy, AuthorizationContext, Decision, Principal};

use crate::error::Error;
use crate::model::{Cluster, IamRole, Mechanism, Pod, RoleEdge, ServiceAccount};
use crate::provider::{ClusterProvider, IamProvider, RoleListing};
use crate::version::{KubernetesVersion, MIN_POD_IDENTITY_VERSION};
use crate::{Result, ASSUME_ROLE_WITH_WEB_IDENTITY, FEDERATION_AUDIENCE};

/// Tunables for a resolution run
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Audience expected in `:aud` conditions and projected tokens
    pub federation_audience: String,
    /// Minimum cluster version for pod-identity associations
    pub min_pod_identity_version: KubernetesVersion,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            federation_audience: FEDERATION_AUDIENCE.to_string(),
            min_pod_identity_version: MIN_POD_IDENTITY_VERSION,
        }
    }
}

/// Resolves which service accounts can assume which IAM roles
///
/// Construct with the two data providers, then call [`resolve`] once per
/// cluster. The resolver holds no mutable state; a single instance may run
/// any number of scans.
///
/// [`resolve`]: RoleResolver::resolve
pub struct RoleResolver<C, I> {
    cluster_provider: C,
    iam_provider: I,
    config: ResolverConfig,
}

impl<C, I> RoleResolver<C, I>
where
    C: ClusterProvider,
    I: IamProvider,
{
    /// Create a resolver with the default configuration
    pub fn new(cluster_provider: C, iam_provider: I) -> Self {
        Self {
            cluster_provider,
            iam_provider,
            config: ResolverConfig::default(),
        }
    }

    /// Replace the resolver configuration
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Run a full scan of the named cluster
    ///
    /// Cancelling the token makes the scan return [`Error::Cancelled`]
    /// promptly, discarding partial results. Per-role trust-policy failures
    /// are logged and skipped; a failure that precludes a whole phase aborts
    /// the scan.
    pub async fn resolve(
        &self,
        cluster_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Cluster> {
        // Phase 1: cluster discovery
        info!(cluster = cluster_name, "retrieving cluster identity");
        let cluster_info = self.cluster_provider.describe_cluster(cluster_name).await?;
        let account_id = account_id_from_arn(&cluster_info.arn)?;
        let oidc_issuer = cluster_info.oidc_issuer_url.as_deref().map(strip_scheme);
        if oidc_issuer.is_none() {
            info!(
                cluster = cluster_name,
                "cluster has no OIDC provider, web-identity analysis will be skipped"
            );
        }
        ensure_active(cancel)?;

        // Phase 2: workload enumeration
        info!("listing service accounts in all namespaces");
        let service_accounts = self.cluster_provider.list_service_accounts().await?;
        info!("listing pods in all namespaces");
        let pods = self.cluster_provider.list_pods().await?;
        ensure_active(cancel)?;

        // Phase 3: role enumeration
        info!(account = %account_id, "listing IAM roles in the account");
        let listings = self.iam_provider.list_roles().await?;
        let roles = parse_trust_policies(listings, cancel)?;
        info!(roles = roles.len(), "parsed role trust policies");
        ensure_active(cancel)?;

        // Phases 4 and 5 are independent: web-identity analysis is pure
        // evaluation over the role list, pod-identity analysis does
        // provider IO
        let (web_edges, pod_edges) = tokio::try_join!(
            self.web_identity_edges(
                &account_id,
                oidc_issuer.as_deref(),
                &roles,
                &service_accounts,
                cancel,
            ),
            self.pod_identity_edges(
                cluster_name,
                &cluster_info.kubernetes_version,
                &pods,
                cancel,
            ),
        )?;

        let mut edges: Vec<RoleEdge> = web_edges;
        edges.extend(pod_edges);
        edges.sort();
        edges.dedup();

        Ok(Cluster {
            name: cluster_name.to_string(),
            account_id,
            oidc_issuer,
            kubernetes_version: cluster_info.kubernetes_version,
            service_accounts,
            pods,
            roles,
            edges,
        })
    }

    /// Phase 4: evaluate every role's trust policy against every
    /// (namespace, service-account) identity
    async fn web_identity_edges(
        &self,
        account_id: &str,
        oidc_issuer: Option<&str>,
        roles: &[IamRole],
        service_accounts: &[ServiceAccount],
        cancel: &CancellationToken,
    ) -> Result<Vec<RoleEdge>> {
        let Some(issuer) = oidc_issuer else {
            return Ok(Vec::new());
        };

        info!(
            roles = roles.len(),
            service_accounts = service_accounts.len(),
            "analyzing trust policies against workload identities"
        );
        let provider_arn = format!("arn:aws:iam::{account_id}:oidc-provider/{issuer}");

        let mut edges = Vec::new();
        for role in roles {
            ensure_active(cancel)?;
            for service_account in service_accounts {
                let context = self.web_identity_context(issuer, &provider_arn, service_account);
                if role.trust_policy.authorize(&context) == Decision::Allow {
                    debug!(
                        role = %role.arn,
                        namespace = %service_account.namespace,
                        service_account = %service_account.name,
                        "trust policy allows web-identity assumption"
                    );
                    edges.push(RoleEdge {
                        namespace: service_account.namespace.clone(),
                        service_account: service_account.name.clone(),
                        role_arn: role.arn.clone(),
                        mechanism: Mechanism::WebIdentity,
                    });
                }
            }
        }
        Ok(edges)
    }

    /// The authorization context representing one workload identity
    /// presenting its projected token to the token service
    fn web_identity_context(
        &self,
        issuer: &str,
        provider_arn: &str,
        service_account: &ServiceAccount,
    ) -> AuthorizationContext {
        let subject = format!(
            "system:serviceaccount:{}:{}",
            service_account.namespace, service_account.name
        );
        AuthorizationContext::new(ASSUME_ROLE_WITH_WEB_IDENTITY)
            .with_principal(Principal::federated(provider_arn))
            .with_context_key(format!("{issuer}:sub"), subject)
            .with_context_key(format!("{issuer}:aud"), &self.config.federation_audience)
    }

    /// Phase 5: map pod-identity associations onto the pods that use them
    ///
    /// Associations grant directly; no trust policy is consulted.
    async fn pod_identity_edges(
        &self,
        cluster_name: &str,
        kubernetes_version: &str,
        pods: &[Pod],
        cancel: &CancellationToken,
    ) -> Result<Vec<RoleEdge>> {
        match KubernetesVersion::parse(kubernetes_version) {
            Some(version) if version < self.config.min_pod_identity_version => {
                info!(
                    version = kubernetes_version,
                    minimum = %self.config.min_pod_identity_version,
                    "cluster predates pod-identity associations, skipping analysis"
                );
                return Ok(Vec::new());
            }
            None => {
                warn!(
                    version = kubernetes_version,
                    "unable to parse cluster version, assuming pod-identity associations are supported"
                );
            }
            Some(_) => {}
        }

        info!("listing pod-identity associations");
        let summaries = self
            .iam_provider
            .list_pod_identity_associations(cluster_name)
            .await?;

        let mut edges = Vec::new();
        for summary in summaries {
            ensure_active(cancel)?;
            let association = match self
                .iam_provider
                .describe_pod_identity_association(&summary.id)
                .await
            {
                Ok(association) => association,
                Err(error) => {
                    warn!(
                        association = %summary.id,
                        error = %error,
                        "unable to describe pod-identity association, skipping it"
                    );
                    continue;
                }
            };

            let in_use = pods.iter().any(|pod| {
                pod.namespace == association.namespace
                    && pod.service_account.as_deref() == Some(association.service_account.as_str())
            });
            if in_use {
                edges.push(RoleEdge {
                    namespace: association.namespace,
                    service_account: association.service_account,
                    role_arn: association.role_arn,
                    mechanism: Mechanism::PodIdentity,
                });
            }
        }
        Ok(edges)
    }
}

/// Decode and parse trust policies, dropping roles whose documents are
/// malformed
fn parse_trust_policies(
    listings: Vec<RoleListing>,
    cancel: &CancellationToken,
) -> Result<Vec<IamRole>> {
    let mut roles = Vec::with_capacity(listings.len());
    for listing in listings {
        ensure_active(cancel)?;
        let document = match urlencoding::decode(&listing.trust_policy_document) {
            Ok(document) => document,
            Err(error) => {
                warn!(
                    role = %listing.arn,
                    error = %error,
                    "unable to decode trust policy, skipping role"
                );
                continue;
            }
        };
        match parse_policy(&document) {
            Ok(trust_policy) => roles.push(IamRole {
                arn: listing.arn,
                trust_policy,
            }),
            Err(error) => {
                warn!(
                    role = %listing.arn,
                    error = %error,
                    "unable to parse trust policy, skipping role"
                );
            }
        }
    }
    Ok(roles)
}

/// Extract the account id from a cluster ARN
/// (`arn:aws:eks:region:account:cluster/name`)
fn account_id_from_arn(arn: &str) -> Result<String> {
    let account = arn.split(':').nth(4).unwrap_or_default();
    if !arn.starts_with("arn:") || account.is_empty() || !account.chars().all(|c| c.is_ascii_digit())
    {
        return Err(Error::InvalidClusterArn {
            arn: arn.to_string(),
        });
    }
    Ok(account.to_string())
}

/// Strip the scheme from an issuer URL; the bare host/path form is what
/// appears in provider ARNs and condition keys
fn strip_scheme(issuer_url: &str) -> String {
    issuer_url
        .strip_prefix("https://")
        .unwrap_or(issuer_url)
        .to_string()
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}
