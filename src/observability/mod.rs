//! Console logging for the `bq-lens` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary, configured from `[observability.logging]`.

#[cfg(feature = "cli")]
mod tracing_init;

#[cfg(feature = "cli")]
pub use tracing_init::*;
