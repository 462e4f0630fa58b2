// Filter-and-aggregate core for the insurance sales performance dashboard.
//
// The binary (`dashboard`) is a thin interactive wrapper; everything that
// computes a number lives here so it can be tested without I/O.

pub mod breakdown;
pub mod config;
pub mod error;
pub mod filter;
pub mod indicator;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod ranking;
pub mod reports;
pub mod store;
pub mod types;
pub mod util;

pub use error::{DashboardError, Result};
