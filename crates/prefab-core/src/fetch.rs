use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use prefab_domain::{ArchiveSpec, ArchiveType};

use crate::excludes::run_exclusion_builder;
use crate::http;

/// How the orchestrator may schedule this action. Unverified downloads stay
/// on the invoking machine so untrusted bytes never enter a shared cache;
/// hash-verified ones may be deferred, cached, or distributed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Cacheable,
    LocalOnly,
}

impl ExecutionMode {
    pub fn for_spec(spec: &ArchiveSpec) -> Self {
        if spec.is_verified() {
            ExecutionMode::Cacheable
        } else {
            ExecutionMode::LocalOnly
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FetchOutcome {
    pub url: String,
    pub archive_type: ArchiveType,
    pub execution_mode: ExecutionMode,
    pub sha256: String,
    pub out_dir: PathBuf,
}

/// Download, optionally filter, and unpack one archive into
/// `dest_root/<name>`, where `name` is the spec's override or `rule_name`.
///
/// All work happens in a staging directory next to the destination; the
/// output directory appears only after a successful unpack, so a failed step
/// never publishes partial content.
pub fn fetch(spec: &ArchiveSpec, rule_name: &str, dest_root: &Path) -> Result<FetchOutcome> {
    fs::create_dir_all(dest_root)
        .with_context(|| format!("creating destination root {}", dest_root.display()))?;
    // Canonicalize up front: unpack tools run with a different working
    // directory, so every path handed to them must be absolute.
    let dest_root = dest_root
        .canonicalize()
        .with_context(|| format!("resolving destination root {}", dest_root.display()))?;
    let work = tempfile::tempdir_in(&dest_root)
        .with_context(|| format!("creating staging directory under {}", dest_root.display()))?;

    let execution_mode = ExecutionMode::for_spec(spec);
    tracing::debug!(url = %spec.url, ?execution_mode, "fetching archive");

    let client = http::build_http_client()?;
    let downloaded = http::download(&client, &spec.url, work.path())?;
    http::verify(spec, &downloaded)?;

    let archive_path = work
        .path()
        .join(format!("archive.{}", spec.archive_type.extension()));
    downloaded
        .file
        .persist(&archive_path)
        .with_context(|| format!("persisting download as {}", archive_path.display()))?;

    let exclusions = if spec.excludes.is_empty() {
        None
    } else {
        let path = work.path().join("exclusions");
        run_exclusion_builder(&archive_path, spec.archive_type, &spec.excludes, &path)?;
        Some(path)
    };

    let stage = work.path().join("out");
    fs::create_dir(&stage).context("creating unpack staging directory")?;
    unpack_into(&stage, &archive_path, spec.archive_type, exclusions.as_deref())?;

    let name = spec.name.as_deref().unwrap_or(rule_name);
    let out_dir = dest_root.join(name);
    if out_dir.exists() {
        fs::remove_dir_all(&out_dir)
            .with_context(|| format!("removing previous output at {}", out_dir.display()))?;
    }
    // The staging tree lives inside `work`, so a failed rename is cleaned up
    // when the temp directory drops.
    fs::rename(&stage, &out_dir)
        .with_context(|| format!("moving unpacked archive into {}", out_dir.display()))?;

    tracing::info!(url = %spec.url, out = %out_dir.display(), "archive unpacked");
    Ok(FetchOutcome {
        url: spec.url.clone(),
        archive_type: spec.archive_type,
        execution_mode,
        sha256: downloaded.sha256,
        out_dir,
    })
}

/// The exact external command for one unpack, as (program, arguments).
/// Exclusion lists only exist for tar archives; a zip here means validation
/// was bypassed, which is an internal invariant violation worth failing
/// loudly over.
fn unpack_command(
    archive_type: ArchiveType,
    archive: &Path,
    exclusions: Option<&Path>,
) -> Result<(&'static str, Vec<OsString>)> {
    match archive_type.tar_flags() {
        Some(flags) => {
            let mut args: Vec<OsString> = flags.iter().map(OsString::from).collect();
            args.push("-x".into());
            args.push("-f".into());
            args.push(archive.into());
            if let Some(exclusions) = exclusions {
                let mut flag = OsString::from("--exclude-from=");
                flag.push(exclusions);
                args.push(flag);
            }
            Ok(("tar", args))
        }
        None => {
            if exclusions.is_some() {
                bail!("internal error: exclusion list produced for a zip archive");
            }
            Ok(("unzip", vec![archive.into()]))
        }
    }
}

fn unpack_into(
    dest: &Path,
    archive: &Path,
    archive_type: ArchiveType,
    exclusions: Option<&Path>,
) -> Result<()> {
    let (program, args) = unpack_command(archive_type, archive, exclusions)?;
    let program_path =
        which::which(program).with_context(|| format!("{program} not found on PATH"))?;

    let output = Command::new(&program_path)
        .args(&args)
        .current_dir(dest)
        .output()
        .with_context(|| format!("failed to run {program} on {}", archive.display()))?;
    if !output.status.success() {
        bail!(
            "{program} failed for {} ({}): {}",
            archive.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
