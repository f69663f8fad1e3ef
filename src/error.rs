//! Error types for the audit pipeline
//!
//! Per-item failures (one role's trust policy, one association describe) are
//! downgraded to warnings inside the resolver and never surface here; these
//! errors mean a whole phase could not complete.

use thiserror::Error;

/// Main error type for audit operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// A data provider failed in a way that precludes a phase
    #[error("provider error [{component}] during {operation}: {message}")]
    Provider {
        /// Which provider failed ("cluster" or "iam")
        component: String,
        /// The operation that failed, e.g. "list_roles"
        operation: String,
        /// Description of what went wrong
        message: String,
    },

    /// The cluster ARN did not carry an account id
    #[error("invalid cluster ARN: {arn}")]
    InvalidClusterArn {
        /// The ARN as returned by the cluster provider
        arn: String,
    },

    /// The scan was interrupted; partial results are discarded
    #[error("audit cancelled")]
    Cancelled,
}

impl Error {
    /// Create a provider error for the cluster provider
    pub fn cluster_provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            component: "cluster".to_string(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a provider error for the IAM provider
    pub fn iam_provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            component: "iam".to_string(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}
