//! # MaxDrive Telemetry
//!
//! Telemetry ingestion layer for the MaxDrive vehicle dashboard.
//!
//! Two independently substitutable sources feed the dashboard through
//! one uniform contract:
//! - a satellite-positioning speed estimator ([`position`])
//! - a vehicle-diagnostics-port stream ([`diagnostics`])
//!
//! Each connector owns its transport, keeps a live fault-tolerant
//! connection to its source, and pushes immutable
//! [`TelemetrySnapshot`](snapshot::TelemetrySnapshot) values to
//! subscribers. All failures surface as `connected: false` snapshots;
//! connectors never raise out of their public operations.
//!
//! ## Example
//!
//! ```rust,ignore
//! use maxdrive_telemetry::prelude::*;
//!
//! let connector = DiagnosticsConnector::new(DiagnosticsConfig {
//!     simulate: true,
//!     ..Default::default()
//! });
//! connector.subscribe(std::sync::Arc::new(|snapshot| {
//!     println!("{} km/h", snapshot.speed_kmh);
//! }));
//! connector.connect().await;
//! ```

#![warn(missing_docs)]

pub mod bus;
pub mod config;
pub mod connector;
pub mod diagnostics;
pub mod error;
pub mod position;
pub mod snapshot;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bus::{EventBus, SnapshotCallback, SubscriptionId};
    pub use crate::config::{DiagnosticsConfig, PositionConfig, TelemetryConfig};
    pub use crate::connector::{ConnectionState, ReconnectPolicy, TelemetryConnector};
    pub use crate::diagnostics::{DiagnosticsBridge, DiagnosticsConnector, SpeedSimulator};
    pub use crate::error::TelemetryError;
    pub use crate::position::{
        PermissionStatus, PositionConnector, PositionWatch, PositioningService, RawFix,
        WatchOptions,
    };
    pub use crate::snapshot::TelemetrySnapshot;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
