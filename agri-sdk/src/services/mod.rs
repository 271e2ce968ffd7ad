//! Service client implementations
//!
//! `agri` holds the backend client; `common` the HTTP client factory and
//! counters it shares with the resilience layer.

mod agri;
pub mod common;

pub use agri::AgriClient;
pub use common::{ClientMetrics, UserAgent};
