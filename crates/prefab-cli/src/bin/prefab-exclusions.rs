#![deny(clippy::all, warnings)]

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Build an exclusion list for a tar archive: list its members with the
/// given decompression flags, keep the ones matching any exclusion regex,
/// and write them to a flat file consumed by `tar --exclude-from`.
#[derive(Parser)]
#[command(name = "prefab-exclusions", version)]
struct ExclusionsCli {
    /// The downloaded tar archive to list.
    #[arg(long = "tar-archive")]
    tar_archive: PathBuf,

    /// Decompression flag to pass to tar; repeatable.
    #[arg(long = "tar-flag", allow_hyphen_values = true)]
    tar_flags: Vec<String>,

    /// Regex for members to exclude; repeatable.
    #[arg(long = "exclude")]
    excludes: Vec<String>,

    /// Where to write the exclusion list.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> Result<()> {
    let cli = ExclusionsCli::parse();
    prefab_core::write_exclusion_list(&cli.tar_archive, &cli.tar_flags, &cli.excludes, &cli.out)
}
