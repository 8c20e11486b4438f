//! Simulation mode: synthetic stop-and-go traffic generator.
//!
//! Stands in for real diagnostics hardware during UI work; fully
//! self-contained, no network or hardware access.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_SIM_SPEED_KMH: f64 = 200.0;
const WALK_STEP_KMH: f64 = 7.5;
const JUMP_PROBABILITY: f64 = 0.2;
const JUMP_MAX_KMH: f64 = 60.0;
const IDLE_RPM: f64 = 800.0;
const RPM_PER_KMH: f64 = 20.0;
const RPM_NOISE: f64 = 50.0;

/// One simulated reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimReading {
    /// Simulated vehicle speed in km/h, within [0, 200].
    pub speed_kmh: f64,
    /// Simulated engine speed in rev/min, never negative.
    pub rpm: f64,
}

/// Bounded random walk over vehicle speed, with occasional jumps to a
/// low speed that model stop-and-go traffic. Engine speed is derived
/// from vehicle speed plus noise.
pub struct SpeedSimulator {
    speed_kmh: f64,
    rng: StdRng,
}

impl SpeedSimulator {
    /// Simulator seeded from entropy.
    pub fn new() -> Self {
        Self {
            speed_kmh: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic simulator for tests.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            speed_kmh: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Advance the walk by one tick.
    pub fn tick(&mut self) -> SimReading {
        let step = self.rng.gen_range(-WALK_STEP_KMH..=WALK_STEP_KMH);
        let mut speed = (self.speed_kmh + step).clamp(0.0, MAX_SIM_SPEED_KMH);

        if self.rng.gen::<f64>() < JUMP_PROBABILITY {
            speed = self.rng.gen_range(0.0..JUMP_MAX_KMH);
        }
        self.speed_kmh = speed;

        let rpm = (IDLE_RPM + RPM_PER_KMH * speed + self.rng.gen_range(-RPM_NOISE..RPM_NOISE))
            .max(0.0);

        SimReading {
            speed_kmh: speed,
            rpm,
        }
    }
}

impl Default for SpeedSimulator {
    fn default() -> Self {
        Self::new()
    }
}
