//! Relays to the external services a submission depends on.
//!
//! - `gateway`: single-file uploads to the storage gateway
//! - `downstream`: submit/list calls to the system of record and response classification
//! - `retry`: bounded exponential backoff for read-only calls
//! - `remote_image`: authorized fetch of signature images referenced by URL
//! - `signature`: fetch plus chroma-key of the reporter's signature
//! - `submission`: the aggregator that drives all uploads of one submission

pub mod downstream;
pub mod gateway;
mod http;
pub mod remote_image;
pub mod retry;
pub mod signature;
pub mod submission;

pub use downstream::{classify_response, DownstreamClient};
pub use gateway::{parse_gateway_response, FileUploader, StorageGatewayClient};
pub use remote_image::{FetchError, RemoteImageFetcher, SourceAllowList};
pub use retry::{RetryPolicy, RetryingFetcher};
pub use signature::{extension_for, SignatureError, SignatureProcessor};
pub use submission::SubmissionAggregator;
