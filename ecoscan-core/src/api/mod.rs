//! HTTP access to the EcoScan backend.

pub mod account;
pub mod client;
pub mod error;
pub mod routes;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, ErrorBody};
pub use transport::{ScanTransport, SubmitResponse};

#[cfg(test)]
pub use transport::MockScanTransport;
