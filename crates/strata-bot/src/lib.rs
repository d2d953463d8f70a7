//! Strata trading coordination core.
//!
//! Wires the processes together for a single trading day:
//! - Strategy activation with preflight position reconciliation
//! - Exchange session tracking from a decoded session record

pub mod app;
pub mod config;
pub mod error;
pub mod sources;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
