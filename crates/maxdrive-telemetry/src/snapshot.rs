//! Immutable telemetry values delivered to subscribers.

use serde::{Deserialize, Serialize};

/// Maximum plausible road speed in km/h. Position-delta estimates at or
/// above this are sensor noise and are discarded, not clamped.
pub const MAX_SPEED_KMH: f64 = 300.0;

/// One telemetry reading pushed to dashboard subscribers.
///
/// Full precision is kept inside the connectors; values are rounded to
/// 0.1 only when a snapshot is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Whether the source link is currently live.
    pub connected: bool,
    /// Vehicle speed in km/h, never negative.
    pub speed_kmh: f64,
    /// Engine speed in rev/min. The position connector never sets this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpm: Option<f64>,
}

impl TelemetrySnapshot {
    /// Build a snapshot, rounding values at the display boundary.
    pub fn new(connected: bool, speed_kmh: f64, rpm: Option<f64>) -> Self {
        Self {
            connected,
            speed_kmh: round_display(speed_kmh.max(0.0)),
            rpm: rpm.map(|r| round_display(r.max(0.0))),
        }
    }

    /// The snapshot emitted after teardown: zeroed and disconnected,
    /// so no stale reading lingers on the dashboard.
    pub fn disconnected() -> Self {
        Self::new(false, 0.0, None)
    }
}

fn round_display(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
