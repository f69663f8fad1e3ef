//! Kubernetes-backed workload enumeration
//!
//! Implements the cluster side of the provider contract over a kube client.
//! Control-plane facts (ARN, issuer, version) come from the cloud API, which
//! this adapter does not speak; the caller fetches them once and hands them
//! in at construction, and enumeration happens live against the cluster.

use k8s_openapi::api::core::v1::{Pod as KubePod, ServiceAccount as KubeServiceAccount};
use kube::api::ListParams;
use kube::{Api, Client};

use super::{ClusterInfo, ClusterProvider};
use crate::model::{Pod, ServiceAccount};
use crate::{Result, FEDERATION_AUDIENCE};

/// A [`ClusterProvider`] over a kube client, bound to one cluster
pub struct KubeWorkloadProvider {
    client: Client,
    info: ClusterInfo,
    audience: String,
}

impl KubeWorkloadProvider {
    /// Create a provider for the cluster described by `info`
    pub fn new(client: Client, info: ClusterInfo) -> Self {
        Self {
            client,
            info,
            audience: FEDERATION_AUDIENCE.to_string(),
        }
    }

    /// Override the token audience used to detect workload-identity mounts
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }
}

#[async_trait::async_trait]
impl ClusterProvider for KubeWorkloadProvider {
    async fn describe_cluster(&self, _name: &str) -> Result<ClusterInfo> {
        Ok(self.info.clone())
    }

    async fn list_service_accounts(&self) -> Result<Vec<ServiceAccount>> {
        let api: Api<KubeServiceAccount> = Api::all(self.client.clone());
        let accounts = api.list(&ListParams::default()).await?;

        Ok(accounts
            .items
            .into_iter()
            .map(|sa| ServiceAccount {
                name: sa.metadata.name.unwrap_or_default(),
                namespace: sa.metadata.namespace.unwrap_or_default(),
                annotations: sa.metadata.annotations.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_pods(&self) -> Result<Vec<Pod>> {
        let api: Api<KubePod> = Api::all(self.client.clone());
        let pods = api.list(&ListParams::default()).await?;

        Ok(pods
            .items
            .into_iter()
            .map(|pod| {
                let mounts_federation_token = mounts_token_for_audience(&pod, &self.audience);
                Pod {
                    name: pod.metadata.name.unwrap_or_default(),
                    namespace: pod.metadata.namespace.unwrap_or_default(),
                    service_account: pod.spec.and_then(|spec| spec.service_account_name),
                    mounts_federation_token,
                }
            })
            .collect())
    }
}

/// Whether a pod projects a service-account token for the given audience
///
/// This is what the web-identity webhook injects: a projected volume with a
/// `serviceAccountToken` source whose audience is the federation audience.
/// Its presence means the pod holds a token the cloud token service will
/// exchange.
fn mounts_token_for_audience(pod: &KubePod, audience: &str) -> bool {
    let Some(volumes) = pod.spec.as_ref().and_then(|spec| spec.volumes.as_ref()) else {
        return false;
    };
    volumes
        .iter()
        .filter_map(|volume| volume.projected.as_ref())
        .filter_map(|projected| projected.sources.as_ref())
        .flatten()
        .filter_map(|source| source.service_account_token.as_ref())
        .any(|token| token.audience.as_deref() == Some(audience))
}
