//! Error types
//!
//! `OperationError` is the recoverable per-operation failure that the metrics
//! accumulator turns into a failed sample. `BenchError` covers everything that
//! stops a replication or a run.

use thiserror::Error;

use crate::dlt_interface::{Network, ReplicationSeed};

/// A single submitted operation failed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OperationError {
    /// The ledger rejected the operation
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// The task running the operation panicked or was cancelled
    #[error("operation task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read environment overrides: {0}")]
    Env(#[from] envy::Error),

    /// A second seed was installed while another seed scope was still active
    #[error("seed {seed} requested while another seed scope is active")]
    SeedScopeActive { seed: ReplicationSeed },

    #[error("{network} backend unavailable: {reason}")]
    BackendUnavailable { network: Network, reason: String },
}
