use serde::Serialize;

use crate::platform::PlatformKey;

/// A tool referenced by name. Paths are resolved by whoever runs the action,
/// never embedded in the descriptor, so a descriptor stays valid across
/// machines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ToolHandle {
    pub name: String,
}

impl ToolHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Caller overrides for toolchain resolution. Everything is optional;
/// defaults come from [`resolve_toolchain`].
#[derive(Clone, Debug, Default)]
pub struct CompilerConfig {
    pub compiler: Option<String>,
    pub rustdoc: Option<String>,
    pub default_edition: Option<String>,
    pub extern_doc_url_prefix: Option<String>,
    pub flags: Vec<String>,
}

/// Everything a compile action needs from configuration, resolved once per
/// build configuration and immutable afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct ToolchainDescriptor {
    pub compiler: ToolHandle,
    pub rustdoc: ToolHandle,
    pub default_edition: Option<String>,
    pub extern_doc_url_prefix: Option<String>,
    pub flags: Vec<String>,
    pub target_triple: &'static str,
    pub failure_filter: ToolHandle,
    pub doc_test_runner: ToolHandle,
}

/// Resolve a toolchain for `platform`, merging caller overrides with fixed
/// defaults for the auxiliary action handles. Pure aggregation: no I/O, no
/// retries. Unsupported platforms never reach this point; they are rejected
/// when the [`PlatformKey`] is parsed.
pub fn resolve_toolchain(platform: PlatformKey, config: CompilerConfig) -> ToolchainDescriptor {
    ToolchainDescriptor {
        compiler: ToolHandle::new(config.compiler.unwrap_or_else(|| "rustc".to_string())),
        rustdoc: ToolHandle::new(config.rustdoc.unwrap_or_else(|| "rustdoc".to_string())),
        default_edition: config.default_edition,
        extern_doc_url_prefix: config.extern_doc_url_prefix,
        flags: config.flags,
        target_triple: platform.target_triple(),
        failure_filter: ToolHandle::new("prefab-failure-filter"),
        doc_test_runner: ToolHandle::new("prefab-doc-test"),
    }
}
