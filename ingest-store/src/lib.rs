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

//! # Store
//!
//! Transactional, idempotent persistence with the selective-field merge
//! rule: upserting a partial record never clobbers columns absent from the
//! incoming payload (`spec.md` §4.3). [`selector`] computes the working set
//! for each command against the same freshness stamps this crate owns.

pub mod models;
pub mod selector;
mod store;

pub use selector::CandidateFilter;
pub use store::Store;
