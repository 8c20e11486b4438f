//! Telemetry errors

use thiserror::Error;

/// Failures inside the ingestion layer.
///
/// These never escape a connector's public operations: they drive the
/// reconnection state machine and surface to observers solely as
/// `connected: false` snapshots, keeping the observer contract uniform
/// across sources.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Positioning permission denied by the platform. Terminal for the
    /// current `connect()` call; no automatic retry.
    #[error("positioning permission denied")]
    PermissionDenied,

    /// The continuous position watch could not be opened.
    #[error("failed to open position watch: {0}")]
    WatchFailed(String),

    /// No fix arrived within the per-fix timeout.
    #[error("no position fix within the per-fix timeout")]
    FixTimeout,

    /// Diagnostics transport failure (socket open, read, close).
    #[error("diagnostics transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The host diagnostics bridge refused to start or went away.
    #[error("diagnostics bridge unavailable: {0}")]
    BridgeUnavailable(String),
}
