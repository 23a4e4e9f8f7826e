use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use prefab_domain::ArchiveSpec;

const USER_AGENT: &str = concat!("prefab/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub fn build_http_client() -> Result<Client> {
    let keep_proxies = std::env::var("PREFAB_KEEP_PROXIES")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT);
    let builder = if keep_proxies {
        builder
    } else {
        builder.no_proxy()
    };
    builder.build().context("failed to build HTTP client")
}

pub(crate) struct DownloadedFile {
    pub file: NamedTempFile,
    pub sha1: String,
    pub sha256: String,
}

/// Stream `url` into a temp file under `dir`, digesting as we go so hash
/// verification never needs a second pass over the archive.
pub(crate) fn download(client: &Client, url: &str, dir: &Path) -> Result<DownloadedFile> {
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("unexpected response for {url}"))?;

    let mut file =
        NamedTempFile::new_in(dir).context("creating temporary file for download")?;
    let mut sha1 = Sha1::new();
    let mut sha256 = Sha256::new();
    let mut buffer = vec![0_u8; 64 * 1024];
    loop {
        let read = response
            .read(&mut buffer)
            .with_context(|| format!("stream error for {url}"))?;
        if read == 0 {
            break;
        }
        sha1.update(&buffer[..read]);
        sha256.update(&buffer[..read]);
        file.write_all(&buffer[..read])
            .context("writing downloaded archive")?;
    }

    Ok(DownloadedFile {
        file,
        sha1: hex::encode(sha1.finalize()),
        sha256: hex::encode(sha256.finalize()),
    })
}

/// Check the declared digests against what actually arrived. Mismatches are
/// terminal and report both values.
pub(crate) fn verify(spec: &ArchiveSpec, downloaded: &DownloadedFile) -> Result<()> {
    if let Some(expected) = spec.sha1.as_deref() {
        if !expected.eq_ignore_ascii_case(&downloaded.sha1) {
            bail!(
                "sha1 mismatch for {}: expected {expected}, got {}",
                spec.url,
                downloaded.sha1
            );
        }
    }
    if let Some(expected) = spec.sha256.as_deref() {
        if !expected.eq_ignore_ascii_case(&downloaded.sha256) {
            bail!(
                "sha256 mismatch for {}: expected {expected}, got {}",
                spec.url,
                downloaded.sha256
            );
        }
    }
    Ok(())
}
