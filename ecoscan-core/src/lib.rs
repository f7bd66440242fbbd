//! Client core for EcoScan product-label scanning.
//!
//! [`capture`] turns a camera frame or a picked file into the image to
//! upload, [`scan`] uploads it and follows the backend job, and [`api`]
//! carries the remaining account, profile, history and chat calls.
#![allow(missing_docs)]

pub mod api;
pub mod capture;
pub mod error;
pub mod scan;
pub mod time;

pub use api::{ApiClient, ApiError, ScanTransport, SubmitResponse};
pub use capture::{
    AspectRatio, CapturePipeline, CaptureState, CropRegion, DisplayRect,
    FinalImage, FrameSource, RawImage, SnapshotFrameSource,
};
pub use error::{CaptureError, CropError};
pub use scan::{JobPoller, PollSettings, PollState, ScanService};
pub use time::{SystemTimeProvider, TimeProvider, VirtualTimeProvider};

pub use ecoscan_model as model;
pub use tokio_util::sync::CancellationToken;
