use thiserror::Error;

/// Unsupported or malformed declarative inputs.
///
/// Every variant is detected before any network or process activity and
/// carries the offending value so the failed build step names what to fix.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no url given; exactly one archive url is required")]
    MissingUrl,

    #[error("multiple urls are not supported (got {count}): {}", urls.join(", "))]
    MultipleUrls { count: usize, urls: Vec<String> },

    #[error("invalid url {value:?}: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("strip_prefix is not supported (requested {value:?})")]
    StripPrefixUnsupported { value: String },

    #[error("unknown archive type {value:?}; expected one of tar.gz, tar.xz, tar.zst, zip")]
    UnknownArchiveType { value: String },

    #[error("exclusion patterns are only supported for tar archives, not zip: {}", patterns.join(", "))]
    ZipExcludes { patterns: Vec<String> },

    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid {kind} digest {value:?}: expected {expected_len} hex characters")]
    InvalidDigest {
        kind: &'static str,
        value: String,
        expected_len: usize,
    },

    #[error("unknown operating system {value:?}; expected linux, macos, or windows")]
    UnknownOs { value: String },

    #[error("unknown cpu architecture {value:?}; expected arm64 or x86_64")]
    UnknownArch { value: String },
}
