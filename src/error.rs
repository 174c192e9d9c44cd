//! Error taxonomy for the alert core.
//!
//! Only [`AlertError`] ever reaches a caller of the policy engine or the
//! dispatcher. [`ChannelError`] is produced by delivery transports and is
//! folded into a [`crate::dispatch::DispatchResult`] instead of being raised.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::models::SensorKind;

// ---

/// Errors surfaced by the policy engine, the dispatcher and the edit boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    /// A reading that cannot be evaluated (non-finite, or routed to the
    /// engine of another sensor kind). No state is mutated.
    #[error("invalid {kind} reading: {reason}")]
    InvalidReading { kind: SensorKind, reason: String },

    /// Threshold edit rejected at the settings boundary. The engine itself
    /// never raises this; it falls back to "always abnormal".
    #[error("invalid threshold configuration: {0}")]
    InvalidThresholdConfig(String),

    /// A sensor kind name that is neither pH nor water level.
    #[error("unknown sensor kind: {0:?}")]
    UnknownKind(String),

    /// A decision that could not have come from the policy engine.
    #[error("malformed alert decision {id}: {reason}")]
    MalformedDecision { id: Uuid, reason: String },
}

/// Failure of a single delivery on a single channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered but refused the message.
    #[error("rejected by provider (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl ChannelError {
    /// Classify a `reqwest` failure, keeping timeouts distinct so they show up
    /// as such in dispatch results.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        // ---
        if err.is_timeout() {
            ChannelError::Timeout(timeout)
        } else {
            ChannelError::Transport(err.to_string())
        }
    }
}

impl From<sqlx::Error> for ChannelError {
    fn from(err: sqlx::Error) -> Self {
        ChannelError::Storage(err.to_string())
    }
}
