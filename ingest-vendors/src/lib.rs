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

//! # Vendor Clients
//!
//! Typed adapters over external market-data vendor APIs. Every client
//! returns the vendor-neutral record shapes in [`model`]; decimal fields
//! are always [`rust_decimal::Decimal`], never `f64`, and dates are
//! date-only (`spec.md` §4.2).
//!
//! Capability is expressed as a set of narrow traits (`spec.md` §9 —
//! "a systems-language implementation should express vendor capabilities
//! as a set of narrow capability interfaces rather than one fat interface")
//! rather than a single abstract base class. Callers select a vendor by the
//! capability they need; not every vendor implements every trait.

pub mod error;
pub mod model;
pub mod traits;

pub mod eastmoney;
pub mod polygon;

pub use error::VendorError;
pub use traits::{
    DividendsSource, GroupedDailySource, HistoricalPricesSource, MarketStatusSource,
    SecurityInfoSource, SplitsSource,
};
