//! Membership dashboard engine: header resolution, cleaning, filtering and
//! aggregation over a member spreadsheet, plus the adapters that hand the
//! results to renderers.
pub mod config;
pub mod error;
pub mod filter;
pub mod headers;
pub mod loader;
pub mod options;
pub mod output;
pub mod reports;
pub mod sort;
pub mod state;
pub mod types;
pub mod util;

pub use error::{DashboardError, Result};
pub use state::{Dashboard, DashboardView};
