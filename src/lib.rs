//! Aircraft trajectory optimization.
//!
//! The member crates hold the physics, the transcription and the solver;
//! this crate wires configuration, grid import and trajectory export around
//! them so several front-ends (the `optimize` and `sweep` binaries, tests)
//! share one path from inputs to results.

pub mod report;
pub mod scenario;

pub use flight_config as config;
pub use flight_core as core;
pub use flight_export as export;
pub use flight_field as field;
pub use flight_importer as importer;
pub use flight_planner as planner;

/// Library version, for smoke tests and `--version` banners.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
