//! Prometheus metrics and structured logging for strata.
//!
//! Every state machine in the workspace reports its transitions here:
//! - Structured logging with tracing (JSON in production)
//! - Prometheus counters for session, clearing and engine transitions
//! - Reconciliation and portfolio request outcomes

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
