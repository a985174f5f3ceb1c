use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::params::Params;
use super::types::{NodeKind, Outputs};
use crate::media::MediaError;
use crate::providers::ProviderError;

/// Failure category of a node call.
///
/// Every category is reported to callers through the same error envelope;
/// the kind exists so Rust callers can branch without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingInput,
    NotFound,
    InvalidFormat,
    InvalidParameter,
    ExternalFailure,
    WriteFailure,
    Internal,
}

/// Node handler errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{0}")]
    MissingInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("{0}")]
    InvalidParameter(String),
    #[error("{0}")]
    External(String),
    #[error("{0}")]
    WriteFailure(String),
    #[error("{0}")]
    Internal(String),
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::MissingInput(_) => ErrorKind::MissingInput,
            NodeError::NotFound(_) => ErrorKind::NotFound,
            NodeError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            NodeError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            NodeError::External(_) => ErrorKind::ExternalFailure,
            NodeError::WriteFailure(_) => ErrorKind::WriteFailure,
            NodeError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<MediaError> for NodeError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::TooLarge { .. } => NodeError::InvalidParameter(err.to_string()),
            _ => NodeError::External(err.to_string()),
        }
    }
}

impl From<ProviderError> for NodeError {
    fn from(err: ProviderError) -> Self {
        NodeError::External(err.to_string())
    }
}

impl From<tokio::task::JoinError> for NodeError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            NodeError::Internal("node task panicked".to_string())
        } else {
            NodeError::Internal(format!("node task failed: {err}"))
        }
    }
}

/// A single media/AI operation behind the uniform call contract.
///
/// Implementations are constructed once and shared; they keep no mutable
/// state between calls. `run` must validate every precondition before it
/// touches its backend, so a rejected call never reaches the delegate.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    fn kind(&self) -> NodeKind;

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError>;
}
