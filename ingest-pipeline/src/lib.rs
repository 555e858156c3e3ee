#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Pipeline
//!
//! Task workers (§4.5) and the bounded [`Orchestrator`] that dispatches
//! them (§4.6). This crate knows nothing about the CLI surface — it is
//! driven by whichever command assembles a candidate list and picks a
//! vendor.

mod orchestrator;
pub mod status;
pub mod tasks;

pub use orchestrator::Orchestrator;
pub use status::{RunSummary, TaskStatus};
