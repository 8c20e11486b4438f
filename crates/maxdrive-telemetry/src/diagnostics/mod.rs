//! Diagnostics connector: engine speed and RPM from the vehicle
//! diagnostics port, behind the shared connector contract.
//!
//! The transport strategy is fixed at construction: a self-contained
//! simulator, a line-delimited stream socket, or an injected host
//! bridge. Hardware links drop transiently (cable reseated, device
//! power cycle), so reconnection is unbounded on a fixed delay until
//! an explicit `disconnect()`.

mod parse;
mod sim;
mod transport;

pub use parse::{parse_payload, ParsedPayload, PayloadFields};
pub use sim::{SimReading, SpeedSimulator};
pub use transport::DiagnosticsBridge;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, trace, warn};

use crate::bus::{EventBus, SnapshotCallback, SubscriptionId};
use crate::config::DiagnosticsConfig;
use crate::connector::{ConnectionState, ReconnectPolicy, TelemetryConnector};
use crate::snapshot::TelemetrySnapshot;

/// Transport selected once at construction.
enum Mode {
    Simulation,
    Socket,
    Bridge(Arc<dyn DiagnosticsBridge>),
}

/// Speed and engine RPM from the vehicle diagnostics port.
pub struct DiagnosticsConnector {
    mode: Mode,
    config: DiagnosticsConfig,
    bus: EventBus,
    shared: Arc<Mutex<Shared>>,
}

struct Shared {
    state: ConnectionState,
    speed_kmh: f64,
    rpm: Option<f64>,
    /// Bumped on every connect/disconnect; emission checks it under
    /// this lock, so superseded tasks can never publish.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl DiagnosticsConnector {
    /// Create a connector; the `simulate` flag in the config selects
    /// the self-contained simulator over the stream socket.
    pub fn new(config: DiagnosticsConfig) -> Self {
        let mode = if config.simulate {
            Mode::Simulation
        } else {
            Mode::Socket
        };
        Self::with_mode(mode, config)
    }

    /// Create a connector over an injected host diagnostics bridge.
    pub fn with_bridge(bridge: Arc<dyn DiagnosticsBridge>, config: DiagnosticsConfig) -> Self {
        Self::with_mode(Mode::Bridge(bridge), config)
    }

    fn with_mode(mode: Mode, config: DiagnosticsConfig) -> Self {
        Self {
            mode,
            config,
            bus: EventBus::new(),
            shared: Arc::new(Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                speed_kmh: 0.0,
                rpm: None,
                generation: 0,
                task: None,
            })),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.config.retry_delay_ms)
    }
}

#[async_trait]
impl TelemetryConnector for DiagnosticsConnector {
    async fn connect(&self) {
        let (generation, previous) = {
            let mut s = self.shared.lock();
            s.generation += 1;
            s.state = ConnectionState::Connecting;
            s.speed_kmh = 0.0;
            s.rpm = None;
            (s.generation, s.task.take())
        };
        if let Some(task) = previous {
            task.abort();
        }
        if let Mode::Bridge(bridge) = &self.mode {
            // Restart semantics: stop any earlier registration before
            // the new start call.
            bridge.stop().await;
        }

        let shared = Arc::clone(&self.shared);
        let bus = self.bus.clone();
        let handle = match &self.mode {
            Mode::Simulation => tokio::spawn(run_simulation(
                Duration::from_millis(self.config.sim_tick_ms),
                shared,
                bus,
                generation,
            )),
            Mode::Socket => tokio::spawn(run_socket(
                format!("{}:{}", self.config.host, self.config.port),
                self.retry_delay(),
                shared,
                bus,
                generation,
            )),
            Mode::Bridge(bridge) => tokio::spawn(run_bridge(
                Arc::clone(bridge),
                self.retry_delay(),
                shared,
                bus,
                generation,
            )),
        };

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
            s.rpm = None;
            s.task.take()
        };
        if let Some(task) = task {
            task.abort();
        }
        if let Mode::Bridge(bridge) = &self.mode {
            bridge.stop().await;
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
/// has been superseded.
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
            s.rpm = None;
        }
        TelemetrySnapshot::new(state == ConnectionState::Connected, s.speed_kmh, s.rpm)
    };
    bus.publish(&snapshot);
    true
}

/// State change without an emission, for the silent legs of a retry
/// cycle (the `Disconnected` snapshot was just delivered and carries
/// the same payload).
fn set_state_silent(shared: &Arc<Mutex<Shared>>, generation: u64, state: ConnectionState) -> bool {
    let mut s = shared.lock();
    if s.generation != generation {
        return false;
    }
    s.state = state;
    true
}

/// Fold freshly parsed fields into the retained values and publish.
fn apply_reading(
    shared: &Arc<Mutex<Shared>>,
    bus: &EventBus,
    generation: u64,
    speed_kmh: Option<f64>,
    rpm: Option<f64>,
) -> bool {
    let snapshot = {
        let mut s = shared.lock();
        if s.generation != generation {
            return false;
        }
        if let Some(speed_kmh) = speed_kmh {
            s.speed_kmh = speed_kmh;
        }
        if let Some(rpm) = rpm {
            s.rpm = Some(rpm);
        }
        TelemetrySnapshot::new(true, s.speed_kmh, s.rpm)
    };
    bus.publish(&snapshot);
    true
}

fn apply_line(shared: &Arc<Mutex<Shared>>, bus: &EventBus, generation: u64, line: &str) -> bool {
    let fields = match parse_payload(line) {
        ParsedPayload::Structured(fields) | ParsedPayload::PatternMatched(fields) => fields,
        ParsedPayload::Unrecognized => {
            trace!(payload = line, "dropping unparseable diagnostics payload");
            return true;
        }
    };
    apply_reading(shared, bus, generation, fields.speed_kmh, fields.rpm)
}

async fn run_simulation(
    tick: Duration,
    shared: Arc<Mutex<Shared>>,
    bus: EventBus,
    generation: u64,
) {
    if !transition(&shared, &bus, generation, ConnectionState::Connected) {
        return;
    }

    let mut simulator = SpeedSimulator::new();
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately; the Connected
    // transition above already emitted the initial snapshot.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let reading = simulator.tick();
        if !apply_reading(
            &shared,
            &bus,
            generation,
            Some(reading.speed_kmh),
            Some(reading.rpm),
        ) {
            return;
        }
    }
}

async fn run_socket(
    addr: String,
    retry_delay: Duration,
    shared: Arc<Mutex<Shared>>,
    bus: EventBus,
    generation: u64,
) {
    let policy = ReconnectPolicy::Unbounded { delay: retry_delay };
    let mut attempt: u32 = 0;

    loop {
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                debug!(%addr, "diagnostics socket open");
                attempt = 0;
                if !transition(&shared, &bus, generation, ConnectionState::Connected) {
                    return;
                }
                let mut lines = FramedRead::new(stream, LinesCodec::new());
                while let Some(next) = lines.next().await {
                    match next {
                        Ok(line) => {
                            if !apply_line(&shared, &bus, generation, &line) {
                                return;
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "diagnostics socket read failed");
                            break;
                        }
                    }
                }
                debug!(%addr, "diagnostics socket closed");
            }
            Err(err) => {
                debug!(error = %err, %addr, "diagnostics socket connect failed");
            }
        }

        if !transition(&shared, &bus, generation, ConnectionState::Disconnected) {
            return;
        }
        attempt += 1;
        let Some(delay) = policy.next_delay(attempt) else {
            return;
        };
        if !set_state_silent(&shared, generation, ConnectionState::Retrying) {
            return;
        }
        sleep(delay).await;
        if !set_state_silent(&shared, generation, ConnectionState::Connecting) {
            return;
        }
    }
}

async fn run_bridge(
    bridge: Arc<dyn DiagnosticsBridge>,
    retry_delay: Duration,
    shared: Arc<Mutex<Shared>>,
    bus: EventBus,
    generation: u64,
) {
    loop {
        match bridge.start().await {
            Ok(mut payloads) => {
                if !transition(&shared, &bus, generation, ConnectionState::Connected) {
                    return;
                }
                while let Some(raw) = payloads.recv().await {
                    if !apply_line(&shared, &bus, generation, &raw) {
                        return;
                    }
                }
                debug!("diagnostics bridge channel closed");
                bridge.stop().await;
            }
            Err(err) => {
                warn!(error = %err, "diagnostics bridge start failed");
            }
        }

        if !transition(&shared, &bus, generation, ConnectionState::Disconnected) {
            return;
        }
        if !set_state_silent(&shared, generation, ConnectionState::Retrying) {
            return;
        }
        sleep(retry_delay).await;
        if !set_state_silent(&shared, generation, ConnectionState::Connecting) {
            return;
        }
    }
}
