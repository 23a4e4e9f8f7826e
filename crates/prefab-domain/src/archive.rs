use std::fmt;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::error::ConfigError;

/// The compressed-container formats the fetch rule understands. Anything
/// else must be unpacked by a rule that knows its format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ArchiveType {
    TarGz,
    TarXz,
    TarZst,
    Zip,
}

impl ArchiveType {
    pub const ALL: [ArchiveType; 4] = [
        ArchiveType::TarGz,
        ArchiveType::TarXz,
        ArchiveType::TarZst,
        ArchiveType::Zip,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveType::TarGz => "tar.gz",
            ArchiveType::TarXz => "tar.xz",
            ArchiveType::TarZst => "tar.zst",
            ArchiveType::Zip => "zip",
        }
    }

    /// Parse an explicit caller override. Unknown names are a hard
    /// configuration error, never a silent default.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.extension() == value)
            .ok_or_else(|| ConfigError::UnknownArchiveType {
                value: value.to_string(),
            })
    }

    /// Infer the type from a url's path suffix, ignoring any `?query` part.
    /// The extension set is suffix-disjoint so at most one member matches.
    pub fn infer(url: &str) -> Option<Self> {
        let path = url.split('?').next().unwrap_or(url);
        Self::ALL
            .into_iter()
            .find(|ty| path.ends_with(&format!(".{}", ty.extension())))
    }

    pub fn infer_or_default(url: &str) -> Self {
        Self::infer(url).unwrap_or(ArchiveType::TarGz)
    }

    pub fn is_tar(self) -> bool {
        !matches!(self, ArchiveType::Zip)
    }

    /// The decompression flags handed to `tar`. `None` for zip, which is
    /// unpacked by `unzip` instead.
    pub fn tar_flags(self) -> Option<&'static [&'static str]> {
        match self {
            ArchiveType::TarGz => Some(&["-z"]),
            ArchiveType::TarXz => Some(&["-J"]),
            ArchiveType::TarZst => Some(&["--use-compress-program=unzstd"]),
            ArchiveType::Zip => None,
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Raw declarative inputs for one archive-fetch rule, exactly as the caller
/// wrote them. Turned into a validated [`ArchiveSpec`] before anything runs.
#[derive(Clone, Debug, Default)]
pub struct ArchiveRequest {
    pub urls: Vec<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub archive_type: Option<String>,
    pub strip_prefix: Option<String>,
    pub name: Option<String>,
    pub excludes: Vec<String>,
}

/// A validated fetch specification: one url, a known archive type, and
/// exclusion patterns that are guaranteed to compile and to target a tar
/// archive. Construction is the only validation point; downstream steps may
/// rely on these invariants.
#[derive(Clone, Debug)]
pub struct ArchiveSpec {
    pub url: String,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub archive_type: ArchiveType,
    pub name: Option<String>,
    pub excludes: Vec<String>,
}

impl ArchiveSpec {
    pub fn new(request: ArchiveRequest) -> Result<Self, ConfigError> {
        let url = match request.urls.len() {
            0 => return Err(ConfigError::MissingUrl),
            1 => request.urls.into_iter().next().unwrap_or_default(),
            count => {
                return Err(ConfigError::MultipleUrls {
                    count,
                    urls: request.urls,
                })
            }
        };
        Url::parse(&url).map_err(|source| ConfigError::InvalidUrl {
            value: url.clone(),
            source,
        })?;

        if let Some(prefix) = request.strip_prefix {
            return Err(ConfigError::StripPrefixUnsupported { value: prefix });
        }

        let archive_type = match request.archive_type.as_deref() {
            Some(value) => ArchiveType::parse(value)?,
            None => ArchiveType::infer_or_default(&url),
        };

        if !request.excludes.is_empty() && !archive_type.is_tar() {
            return Err(ConfigError::ZipExcludes {
                patterns: request.excludes,
            });
        }
        for pattern in &request.excludes {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidExcludePattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        let sha1 = validate_digest("sha1", request.sha1, 40)?;
        let sha256 = validate_digest("sha256", request.sha256, 64)?;

        Ok(Self {
            url,
            sha1,
            sha256,
            archive_type,
            name: request.name,
            excludes: request.excludes,
        })
    }

    /// Whether the download carries an integrity hash and may therefore be
    /// cached or distributed as trusted content.
    pub fn is_verified(&self) -> bool {
        self.sha1.is_some() || self.sha256.is_some()
    }
}

fn validate_digest(
    kind: &'static str,
    value: Option<String>,
    expected_len: usize,
) -> Result<Option<String>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.len() != expected_len || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidDigest {
            kind,
            value,
            expected_len,
        });
    }
    Ok(Some(value.to_ascii_lowercase()))
}
