//! Shared connector contract and reconnection policy.
//!
//! Both concrete connectors implement [`TelemetryConnector`]
//! independently; they share no runtime state, only this contract and
//! the reconnection-state-machine shape:
//! `Disconnected → Connecting → {Connected | Retrying} → … → Disconnected`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bus::{SnapshotCallback, SubscriptionId};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected; (re)connection only via an external `connect()`.
    Disconnected,
    /// Handshake in progress (permission grant, socket open, bridge
    /// start call).
    Connecting,
    /// Live and emitting snapshots.
    Connected,
    /// Transport lost; waiting out a backoff delay before reopening.
    Retrying,
}

/// Uniform lifecycle exposed to the dashboard layer, regardless of
/// source.
///
/// Public operations never return errors: every failure surfaces as a
/// `connected: false` snapshot pushed through the embedded bus, so the
/// observer contract stays uniform across sources.
#[async_trait]
pub trait TelemetryConnector: Send + Sync {
    /// Open the underlying transport. Idempotent by restart: invoking
    /// while already active tears down and reopens. On success the
    /// connector moves to `Connected` and emits an immediate snapshot
    /// (zeros if no data has arrived yet); on failure its reconnection
    /// policy applies.
    async fn connect(&self);

    /// Deterministic scoped teardown of all owned resources (timers,
    /// sockets, registered callbacks). Emits a final
    /// `{connected: false, speed_kmh: 0}` snapshot; nothing is emitted
    /// after this returns, even for events already queued.
    async fn disconnect(&self);

    /// Register a callback receiving future snapshots only.
    fn subscribe(&self, callback: SnapshotCallback) -> SubscriptionId;

    /// Remove a previously registered callback.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Whether the connector is currently in the `Connected` state.
    fn is_connected(&self) -> bool;
}

/// Spacing between reconnection attempts.
///
/// The position source uses bounded retries: its failures are usually
/// one-time consent issues and blind retry wastes battery. Diagnostics
/// hardware links drop transiently (cable reseated, device power
/// cycle) and retry forever until an explicit disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Up to `max_attempts` retries with linearly growing backoff
    /// (`step × attempt`); terminal on exhaustion.
    Bounded {
        /// Retry attempts before giving up.
        max_attempts: u32,
        /// Backoff grows linearly in multiples of this step.
        step: Duration,
    },
    /// Retry forever on a fixed delay.
    Unbounded {
        /// Delay between attempts.
        delay: Duration,
    },
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based), or `None` when
    /// the policy is exhausted.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Bounded { max_attempts, step } => {
                if attempt >= 1 && attempt <= max_attempts {
                    Some(step * attempt)
                } else {
                    None
                }
            }
            ReconnectPolicy::Unbounded { delay } => Some(delay),
        }
    }
}
