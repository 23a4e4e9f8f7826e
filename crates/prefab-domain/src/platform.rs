use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Arm64,
    X86_64,
}

impl FromStr for Os {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" => Ok(Os::Macos),
            "windows" => Ok(Os::Windows),
            other => Err(ConfigError::UnknownOs {
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for Arch {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            other => Err(ConfigError::UnknownArch {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Arch::Arm64 => "arm64",
            Arch::X86_64 => "x86_64",
        };
        f.write_str(label)
    }
}

/// An (OS, CPU architecture) pair supplied by the caller or detected from the
/// host. The triple table below is the only place a pair turns into a
/// compiler target; anything outside the enumerated domain is rejected at the
/// string boundary in [`PlatformKey::from_labels`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PlatformKey {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformKey {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn from_labels(os: &str, arch: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            os: os.parse()?,
            arch: arch.parse()?,
        })
    }

    /// The host platform, when it falls inside the supported domain.
    pub fn host() -> Result<Self, ConfigError> {
        Self::from_labels(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn target_triple(self) -> &'static str {
        match (self.os, self.arch) {
            (Os::Linux, Arch::Arm64) => "aarch64-unknown-linux-gnu",
            (Os::Linux, Arch::X86_64) => "x86_64-unknown-linux-gnu",
            (Os::Macos, Arch::Arm64) => "aarch64-apple-darwin",
            (Os::Macos, Arch::X86_64) => "x86_64-apple-darwin",
            (Os::Windows, Arch::Arm64) => "aarch64-pc-windows-msvc",
            (Os::Windows, Arch::X86_64) => "x86_64-pc-windows-msvc",
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
