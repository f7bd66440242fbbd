//! Scan submission and job polling.

pub mod messages;
pub mod poller;
pub mod service;

pub use poller::{JobPoller, PollSettings, PollState};
pub use service::ScanService;
