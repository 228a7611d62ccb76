pub mod backend;
pub mod chunker;
pub mod error;
pub mod fetch;
pub mod merger;
pub mod prometheus;
pub mod response;
pub mod sampler;
pub mod selector;

pub use backend::{QueryBackend, RangeQuery, create_backend_from_url};
pub use chunker::{TimeRangeChunker, incidents_time_ranges};
pub use error::{BackendErrorKind, QueryError};
pub use fetch::fetch_windows;
pub use merger::{SeriesMerger, merge_chunk_responses};
pub use prometheus::PrometheusBackend;
pub use response::{QueryData, QueryResponse, ResponseStatus};
pub use sampler::{AdaptiveSampler, SamplerDecision, SamplerSettings};
