pub mod config;
pub mod error;
pub mod extract;
pub mod json_blobs;
pub mod normalize;
pub mod paginate;
pub mod probe;
pub mod result;
pub mod traversal;

pub use config::CollectorConfig;
pub use error::ScanError;
pub use extract::extract_listing_links;
pub use paginate::PaginationMode;
pub use result::{CapturedPage, PageReport, ProbeReport, StopReason, TraversalResult};
pub use tokio_util::sync::CancellationToken;
pub use traversal::{Collector, PageCallback};
