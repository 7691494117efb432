use thiserror::Error;

/// Errors raised when loading a session into a replay
///
/// Per-frame operations never fail; they degrade instead.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("session has no telemetry samples")]
    EmptySession,

    #[error("unknown data provider: {0}")]
    UnknownProvider(String),

    #[error("failed to fetch race data: {0:#}")]
    Fetch(#[from] anyhow::Error),
}
