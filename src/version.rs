//! Kubernetes version parsing for feature gating
//!
//! Managed control planes report versions like `1.24`, `v1.28.3`, or
//! `1.30+`; only the major and minor components matter for deciding whether
//! the pod-identity association feature can exist on the cluster.

/// A Kubernetes control-plane version, reduced to major.minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KubernetesVersion {
    /// Major version, practically always 1
    pub major: u32,
    /// Minor version
    pub minor: u32,
}

/// The first Kubernetes version on which pod-identity associations are
/// available
pub const MIN_POD_IDENTITY_VERSION: KubernetesVersion = KubernetesVersion {
    major: 1,
    minor: 24,
};

impl KubernetesVersion {
    /// Parse a version string, tolerating a `v` prefix and provider suffixes
    /// (`1.24+`, `1.27.3-gke.100`)
    ///
    /// Returns `None` when no numeric major.minor pair can be extracted; the
    /// caller decides how to degrade.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = raw.trim();
        let cleaned = cleaned.strip_prefix('v').unwrap_or(cleaned);
        let mut parts = cleaned.split('.');

        let major = numeric_prefix(parts.next()?)?;
        let minor = numeric_prefix(parts.next()?)?;
        Some(Self { major, minor })
    }
}

/// Parse the leading digits of a version segment, so `24+` reads as 24
fn numeric_prefix(segment: &str) -> Option<u32> {
    let digits: &str = segment
        .split_once(|c: char| !c.is_ascii_digit())
        .map_or(segment, |(prefix, _)| prefix);
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

impl std::fmt::Display for KubernetesVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
