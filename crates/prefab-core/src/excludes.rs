use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use regex::Regex;

use prefab_domain::ArchiveType;

const EXCLUSIONS_BIN: &str = "prefab-exclusions";

/// List the members of a tar archive, keep the ones matching any exclusion
/// pattern, and write them to `out` one path per line. This is the whole job
/// of the `prefab-exclusions` executable.
pub fn write_exclusion_list(
    archive: &Path,
    tar_flags: &[String],
    patterns: &[String],
    out: &Path,
) -> Result<()> {
    let regexes = compile_patterns(patterns)?;

    let tar = which::which("tar").context("tar not found on PATH")?;
    let output = Command::new(tar)
        .args(tar_flags)
        .arg("-t")
        .arg("-f")
        .arg(archive)
        .output()
        .with_context(|| format!("failed to run tar -t on {}", archive.display()))?;
    if !output.status.success() {
        bail!(
            "tar -t failed for {} ({}): {}",
            archive.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    let excluded = filter_members(listing.lines(), &regexes);
    tracing::debug!(
        archive = %archive.display(),
        matched = excluded.len(),
        "computed exclusion list"
    );

    let mut body = excluded.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    std::fs::write(out, body)
        .with_context(|| format!("writing exclusion list to {}", out.display()))
}

/// Invoke the external exclusion-list builder for a downloaded tar archive,
/// handing it the decompression flags for the detected type. The builder is
/// resolved by name so orchestrators (and tests) can pin it via
/// `PREFAB_EXCLUSIONS_BIN`.
pub fn run_exclusion_builder(
    archive: &Path,
    archive_type: ArchiveType,
    patterns: &[String],
    out: &Path,
) -> Result<()> {
    let Some(tar_flags) = archive_type.tar_flags() else {
        bail!("internal error: exclusion list requested for non-tar archive type {archive_type}");
    };

    let builder = locate_builder()?;
    let mut cmd = Command::new(&builder);
    cmd.arg("--tar-archive").arg(archive);
    for flag in tar_flags {
        cmd.arg("--tar-flag").arg(flag);
    }
    for pattern in patterns {
        cmd.arg("--exclude").arg(pattern);
    }
    cmd.arg("--out").arg(out);

    let output = cmd
        .output()
        .with_context(|| format!("failed to run {}", builder.display()))?;
    if !output.status.success() {
        bail!(
            "exclusion-list builder failed for {} ({}): {}",
            archive.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

fn locate_builder() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("PREFAB_EXCLUSIONS_BIN") {
        return Ok(PathBuf::from(path));
    }
    which::which(EXCLUSIONS_BIN)
        .with_context(|| format!("{EXCLUSIONS_BIN} not found on PATH"))
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("invalid exclusion pattern {pattern:?}"))
        })
        .collect()
}

fn filter_members<'a>(members: impl Iterator<Item = &'a str>, regexes: &[Regex]) -> Vec<String> {
    members
        .filter(|member| !member.is_empty())
        .filter(|member| regexes.iter().any(|regex| regex.is_match(member)))
        .map(str::to_string)
        .collect()
}
