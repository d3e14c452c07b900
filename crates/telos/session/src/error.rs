//! Session manager errors.

use telos_engine::EngineError;
use telos_guard::GuardError;
use telos_store::StoreError;
use telos_types::{ModelError, SessionId, SessionStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// Neither the store nor the caller supplied an initial population.
    #[error("no seed genomes available for agent '{0}'")]
    NoSeeds(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("session {id} is {status}, not running")]
    NotRunning { id: SessionId, status: SessionStatus },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("pattern book error: {0}")]
    Guard(#[from] GuardError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Errors the run must not absorb: invariant breaks and undecodable
    /// payloads.
    pub fn is_hard_failure(&self) -> bool {
        match self {
            Self::Model(e) => e.is_hard_failure(),
            Self::Engine(e) => e.is_hard_failure(),
            Self::Store(StoreError::Payload(e)) => e.is_hard_failure(),
            _ => false,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
