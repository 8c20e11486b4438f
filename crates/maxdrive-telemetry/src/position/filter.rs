//! Pure speed estimation from raw geodetic fixes.

use crate::position::provider::RawFix;
use crate::snapshot::MAX_SPEED_KMH;

/// Mean Earth radius in metres for the haversine distance.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Fixes with worse horizontal accuracy than this never anchor a
/// position delta.
pub const GOOD_ACCURACY_M: f64 = 50.0;

const MPS_TO_KMH: f64 = 3.6;

/// Great-circle distance between two lat/lon points, in metres.
pub fn haversine_m(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let phi1 = lat1_deg.to_radians();
    let phi2 = lat2_deg.to_radians();
    let d_phi = (lat2_deg - lat1_deg).to_radians();
    let d_lambda = (lon2_deg - lon1_deg).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Folds raw fixes into validated speed estimates.
///
/// A direct platform-reported speed always wins and bypasses the delta
/// path. Otherwise the speed is the haversine distance from the
/// retained last good fix (accuracy ≤ 50 m) over elapsed time; delta
/// results implying ≥ 300 km/h are discarded as sensor noise and the
/// prior speed persists.
#[derive(Debug, Default)]
pub struct FixFilter {
    last_good: Option<RawFix>,
}

impl FixFilter {
    /// Empty filter with no retained fix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fix; returns a new speed estimate in km/h, or `None`
    /// when this fix produces no usable estimate.
    pub fn apply(&mut self, fix: &RawFix) -> Option<f64> {
        if let Some(mps) = fix.speed_mps {
            if mps >= 0.0 {
                self.retain(fix);
                return Some(mps * MPS_TO_KMH);
            }
        }

        // Poor-accuracy fixes are ignored for delta purposes, but the
        // anchor fix stays in place for the next good one.
        if fix.accuracy_m > GOOD_ACCURACY_M {
            return None;
        }

        let prev = match self.last_good.replace(fix.clone()) {
            Some(prev) => prev,
            // The first fix after (re)connect has no predecessor.
            None => return None,
        };

        let elapsed_s = fix.timestamp_ms.saturating_sub(prev.timestamp_ms) as f64 / 1000.0;
        if elapsed_s <= 0.0 {
            return None;
        }

        let distance_m = haversine_m(
            prev.latitude_deg,
            prev.longitude_deg,
            fix.latitude_deg,
            fix.longitude_deg,
        );
        let speed_kmh = distance_m / elapsed_s * MPS_TO_KMH;
        if speed_kmh >= MAX_SPEED_KMH {
            return None;
        }

        Some(speed_kmh)
    }

    /// Forget the retained fix. Called across reconnects so the first
    /// fix of a new watch never pairs with a stale anchor.
    pub fn reset(&mut self) {
        self.last_good = None;
    }

    fn retain(&mut self, fix: &RawFix) {
        if fix.accuracy_m <= GOOD_ACCURACY_M {
            self.last_good = Some(fix.clone());
        }
    }
}
