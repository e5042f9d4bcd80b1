//! Praxisbook — scheduling engine for a single-practitioner physio
//! practice.
//!
//! One calendar, two kinds of commitments (appointments and blockers),
//! one rule: active commitments never overlap. Patients book through an
//! atomic self-service path, the practice manages everything else
//! through best-effort admin operations, and a periodic sweep handles
//! expiry, reminders and retention. All civil time is Europe/Berlin;
//! storage keeps epoch-millisecond instants.

pub mod config;
pub mod error;
pub mod models;
pub mod db;
pub mod timezone;
pub mod overlap;
pub mod slots;
pub mod notes;
pub mod booking;
pub mod series;
pub mod lifecycle;
pub mod maintenance;
pub mod agenda;

use tracing_subscriber::EnvFilter;

pub use error::SchedulingError;

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// default filter.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
