#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod archive;
pub mod error;
pub mod platform;
pub mod toolchain;

pub use archive::{ArchiveRequest, ArchiveSpec, ArchiveType};
pub use error::ConfigError;
pub use platform::{Arch, Os, PlatformKey};
pub use toolchain::{resolve_toolchain, CompilerConfig, ToolHandle, ToolchainDescriptor};
