//! Position connector: wraps a continuous positioning watch and the
//! fix filter behind the shared connector contract.
//!
//! Failures here are usually one-time consent issues, so the retry
//! policy is bounded: three attempts with linear backoff, then
//! `Disconnected` until an external `connect()`.

mod filter;
mod provider;

pub use filter::{haversine_m, FixFilter, GOOD_ACCURACY_M};
pub use provider::{PermissionStatus, PositionWatch, PositioningService, RawFix, WatchOptions};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::bus::{EventBus, SnapshotCallback, SubscriptionId};
use crate::config::PositionConfig;
use crate::connector::{ConnectionState, ReconnectPolicy, TelemetryConnector};
use crate::error::TelemetryError;
use crate::snapshot::TelemetrySnapshot;

/// Speed estimator over a platform positioning watch.
pub struct PositionConnector {
    service: Arc<dyn PositioningService>,
    config: PositionConfig,
    bus: EventBus,
    shared: Arc<Mutex<Shared>>,
}

struct Shared {
    state: ConnectionState,
    speed_kmh: f64,
    /// Bumped on every connect/disconnect; emission checks it under
    /// this lock, so superseded tasks can never publish.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

enum WatchOutcome {
    Superseded,
    Transient(TelemetryError),
}

impl PositionConnector {
    /// Create a connector over an injected positioning service. The
    /// transport stays closed until `connect()`.
    pub fn new(service: Arc<dyn PositioningService>, config: PositionConfig) -> Self {
        Self {
            service,
            config,
            bus: EventBus::new(),
            shared: Arc::new(Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                speed_kmh: 0.0,
                generation: 0,
                task: None,
            })),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            high_accuracy: self.config.high_accuracy,
            fix_timeout: Duration::from_millis(self.config.fix_timeout_ms),
            max_fix_age: Duration::from_millis(self.config.max_fix_age_ms),
        }
    }
}

#[async_trait]
impl TelemetryConnector for PositionConnector {
    async fn connect(&self) {
        let (generation, previous) = {
            let mut s = self.shared.lock();
            s.generation += 1;
            s.state = ConnectionState::Connecting;
            s.speed_kmh = 0.0;
            (s.generation, s.task.take())
        };
        if let Some(task) = previous {
            task.abort();
        }

        let mut permission = self.service.check_permission().await;
        if permission != PermissionStatus::Granted {
            permission = self.service.request_permission().await;
        }
        if permission != PermissionStatus::Granted {
            debug!("positioning permission denied");
            transition(
                &self.shared,
                &self.bus,
                generation,
                ConnectionState::Disconnected,
            );
            return;
        }

        let handle = tokio::spawn(run_watch(
            Arc::clone(&self.service),
            self.watch_options(),
            ReconnectPolicy::Bounded {
                max_attempts: self.config.max_retries,
                step: Duration::from_millis(self.config.backoff_step_ms),
            },
            Arc::clone(&self.shared),
            self.bus.clone(),
            generation,
        ));

        let mut s = self.shared.lock();
        if s.generation == generation {
            s.task = Some(handle);
        } else {
            // A disconnect or newer connect won the race.
            handle.abort();
        }
    }

    async fn disconnect(&self) {
        let task = {
            let mut s = self.shared.lock();
            s.generation += 1;
            s.state = ConnectionState::Disconnected;
            s.speed_kmh = 0.0;
            s.task.take()
        };
        if let Some(task) = task {
            task.abort();
        }
        self.bus.publish(&TelemetrySnapshot::disconnected());
    }

    fn subscribe(&self, callback: SnapshotCallback) -> SubscriptionId {
        self.bus.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().state == ConnectionState::Connected
    }
}

/// Set `state` and publish the matching snapshot, unless `generation`
/// has been superseded. Entering `Connecting` is silent (no data yet,
/// nothing to show); every other transition publishes.
fn transition(
    shared: &Arc<Mutex<Shared>>,
    bus: &EventBus,
    generation: u64,
    state: ConnectionState,
) -> bool {
    let snapshot = {
        let mut s = shared.lock();
        if s.generation != generation {
            return false;
        }
        s.state = state;
        if state != ConnectionState::Connected {
            s.speed_kmh = 0.0;
        }
        TelemetrySnapshot::new(state == ConnectionState::Connected, s.speed_kmh, None)
    };
    bus.publish(&snapshot);
    true
}

async fn run_watch(
    service: Arc<dyn PositioningService>,
    options: WatchOptions,
    policy: ReconnectPolicy,
    shared: Arc<Mutex<Shared>>,
    bus: EventBus,
    generation: u64,
) {
    let mut filter = FixFilter::new();
    let mut attempt: u32 = 0;

    loop {
        match service.watch(options).await {
            Ok(mut watch) => {
                filter.reset();
                if !transition(&shared, &bus, generation, ConnectionState::Connected) {
                    return;
                }
                let outcome = drain_watch(
                    &mut watch,
                    &mut filter,
                    &shared,
                    &bus,
                    generation,
                    options.fix_timeout,
                    &mut attempt,
                )
                .await;
                match outcome {
                    WatchOutcome::Superseded => return,
                    WatchOutcome::Transient(err) => {
                        warn!(error = %err, "position watch interrupted");
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to open position watch");
            }
        }

        attempt += 1;
        let Some(delay) = policy.next_delay(attempt) else {
            debug!("position retries exhausted");
            transition(&shared, &bus, generation, ConnectionState::Disconnected);
            return;
        };
        if !transition(&shared, &bus, generation, ConnectionState::Retrying) {
            return;
        }
        sleep(delay).await;
    }
}

/// Pump fixes until the watch fails, times out, or is superseded.
/// Every fix publishes a snapshot, whether or not it changed the
/// estimate; the bus does not de-duplicate.
async fn drain_watch(
    watch: &mut PositionWatch,
    filter: &mut FixFilter,
    shared: &Arc<Mutex<Shared>>,
    bus: &EventBus,
    generation: u64,
    fix_timeout: Duration,
    attempt: &mut u32,
) -> WatchOutcome {
    loop {
        match timeout(fix_timeout, watch.next_fix()).await {
            Ok(Some(Ok(fix))) => {
                *attempt = 0;
                let estimate = filter.apply(&fix);
                let snapshot = {
                    let mut s = shared.lock();
                    if s.generation != generation {
                        return WatchOutcome::Superseded;
                    }
                    if let Some(speed_kmh) = estimate {
                        s.speed_kmh = speed_kmh;
                    }
                    TelemetrySnapshot::new(true, s.speed_kmh, None)
                };
                bus.publish(&snapshot);
            }
            Ok(Some(Err(err))) => return WatchOutcome::Transient(err),
            Ok(None) => {
                return WatchOutcome::Transient(TelemetryError::WatchFailed(
                    "watch stream closed".to_string(),
                ))
            }
            Err(_) => return WatchOutcome::Transient(TelemetryError::FixTimeout),
        }
    }
}
