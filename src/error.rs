//! Gateway error taxonomy.
//!
//! Three failure classes, all surfaced synchronously to the caller of the
//! operation in which they occur. No layer retries; "key not found" is a
//! valid empty state and never reaches this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or empty required caller input, rejected before any side effect.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The answer backend call did not succeed. Any user message already
    /// appended for this query is retained; there is no rollback.
    #[error("upstream query failed: {0:#}")]
    Backend(anyhow::Error),

    /// The transcript store is unreachable or an operation errored.
    #[error("transcript store failure: {0:#}")]
    Store(anyhow::Error),
}
