//! Platform positioning boundary.
//!
//! The connector never talks to positioning hardware directly; the
//! host shell injects an implementation of [`PositioningService`] at
//! construction, which keeps the connector testable in isolation.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TelemetryError;

/// One positioning sample as delivered by the platform.
///
/// Fixes are transient: each one either produces a snapshot, updates
/// the retained "last good fix", or is discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFix {
    /// Latitude in degrees.
    pub latitude_deg: f64,
    /// Longitude in degrees.
    pub longitude_deg: f64,
    /// Estimated horizontal accuracy in metres.
    pub accuracy_m: f64,
    /// Platform-reported ground speed in m/s, when available.
    pub speed_mps: Option<f64>,
    /// Fix timestamp in milliseconds since the epoch.
    pub timestamp_ms: u64,
}

/// Permission state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Positioning may be used.
    Granted,
    /// The user refused; terminal for the current `connect()`.
    Denied,
    /// Not yet decided; a request prompt is needed.
    Prompt,
}

/// Options passed when opening a continuous watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Prefer the high-accuracy positioning source.
    pub high_accuracy: bool,
    /// How long to wait for each individual fix.
    pub fix_timeout: Duration,
    /// Maximum age of a cached fix the platform may hand back.
    pub max_fix_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            fix_timeout: Duration::from_secs(10),
            max_fix_age: Duration::from_secs(1),
        }
    }
}

/// A live continuous watch.
///
/// Dropping the watch is the clear-watch call: the provider observes
/// the closed channel and stops producing fixes.
pub struct PositionWatch {
    updates: mpsc::Receiver<Result<RawFix, TelemetryError>>,
}

impl PositionWatch {
    /// Wrap a provider-side update channel.
    pub fn new(updates: mpsc::Receiver<Result<RawFix, TelemetryError>>) -> Self {
        Self { updates }
    }

    /// Next fix or per-fix error; `None` once the provider side closed
    /// the watch.
    pub async fn next_fix(&mut self) -> Option<Result<RawFix, TelemetryError>> {
        self.updates.recv().await
    }
}

/// Host positioning service: permission handshake plus a continuous
/// watch delivering fixes (or per-fix errors) as they arrive.
#[async_trait]
pub trait PositioningService: Send + Sync {
    /// Current permission state without prompting.
    async fn check_permission(&self) -> PermissionStatus;

    /// Prompt the user for positioning permission.
    async fn request_permission(&self) -> PermissionStatus;

    /// Open a continuous watch.
    async fn watch(&self, options: WatchOptions) -> Result<PositionWatch, TelemetryError>;
}
