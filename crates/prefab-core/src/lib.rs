#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod excludes;
mod fetch;
mod http;

pub use excludes::{run_exclusion_builder, write_exclusion_list};
pub use fetch::{fetch, ExecutionMode, FetchOutcome};
pub use http::build_http_client;
