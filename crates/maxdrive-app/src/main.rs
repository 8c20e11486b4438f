//! Headless composition root for the MaxDrive telemetry backend.
//!
//! Builds the diagnostics connector from a settings file (simulation
//! or stream socket), subscribes, and logs every snapshot until
//! Ctrl-C. The position connector needs a platform positioning
//! service injected by the host shell, so it is not wired up here.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maxdrive_telemetry::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TelemetryConfig::from_file(&path)?,
        None => TelemetryConfig {
            diagnostics: DiagnosticsConfig {
                simulate: true,
                ..Default::default()
            },
            ..Default::default()
        },
    };

    info!(
        version = maxdrive_telemetry::VERSION,
        simulate = config.diagnostics.simulate,
        "starting telemetry backend"
    );

    let diagnostics = DiagnosticsConnector::new(config.diagnostics);
    diagnostics.subscribe(Arc::new(|snapshot| {
        info!(
            connected = snapshot.connected,
            speed_kmh = snapshot.speed_kmh,
            rpm = snapshot.rpm,
            "diagnostics"
        );
    }));
    diagnostics.connect().await;

    tokio::signal::ctrl_c().await?;
    diagnostics.disconnect().await;
    info!("telemetry backend stopped");

    Ok(())
}
