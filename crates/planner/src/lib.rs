//! Trajectory optimization: phase expansion, objectives, collocation and assembly.

pub mod assemble;
pub mod collocation;
pub mod guess;
pub mod navigation;
pub mod objective;
pub mod phase;
pub mod problem;
pub mod sweep;

pub use facade::*;
pub use flight_dynamics as dynamics;
pub use flight_nlp as nlp;
pub use flight_performance as performance;

mod facade;
