//! Host diagnostics bridge boundary.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TelemetryError;

/// Host diagnostics service reached through the native bridge: one
/// start call, then raw text/JSON payloads pushed over a channel.
///
/// The strategy is chosen once at construction; a bridge-backed
/// connector never probes for host capabilities at runtime. `stop` is
/// issued from `disconnect` and when the push channel closes.
#[async_trait]
pub trait DiagnosticsBridge: Send + Sync {
    /// Start the host service and hand back its push channel.
    async fn start(&self) -> Result<mpsc::Receiver<String>, TelemetryError>;

    /// Stop the host service and drop the registered callback.
    async fn stop(&self);
}
