#![deny(clippy::all, warnings)]

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::Result;
use prefab_core::{fetch, FetchOutcome};
use prefab_domain::{
    resolve_toolchain, ArchiveRequest, ArchiveSpec, CompilerConfig, ConfigError, PlatformKey,
    ToolchainDescriptor,
};

#[derive(Parser)]
#[command(name = "prefab", version, about = "Toolchain selection and archive-fetch rules")]
struct PrefabCli {
    /// Suppress status output.
    #[arg(long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Enable trace-level logging.
    #[arg(long, global = true)]
    trace: bool,

    /// Emit machine-readable JSON instead of human output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a compiler toolchain descriptor for a platform.
    Toolchain(ToolchainArgs),
    /// Download, verify, and unpack one archive dependency.
    Fetch(FetchArgs),
}

#[derive(Args)]
struct ToolchainArgs {
    /// Target operating system; defaults to the host.
    #[arg(long)]
    os: Option<String>,

    /// Target cpu architecture; defaults to the host.
    #[arg(long)]
    arch: Option<String>,

    /// Compiler executable name.
    #[arg(long)]
    compiler: Option<String>,

    /// Documentation generator executable name.
    #[arg(long)]
    rustdoc: Option<String>,

    /// Default language edition for compile actions.
    #[arg(long)]
    edition: Option<String>,

    /// Url prefix for externally hosted documentation.
    #[arg(long = "extern-doc-url")]
    extern_doc_url: Option<String>,

    /// Extra compiler flag; repeatable.
    #[arg(long = "flag", allow_hyphen_values = true)]
    flags: Vec<String>,
}

#[derive(Args)]
struct FetchArgs {
    /// Archive url. Exactly one is supported; extras are rejected.
    #[arg(required = true)]
    urls: Vec<String>,

    /// Expected sha1 of the download.
    #[arg(long)]
    sha1: Option<String>,

    /// Expected sha256 of the download.
    #[arg(long)]
    sha256: Option<String>,

    /// Explicit archive type (tar.gz, tar.xz, tar.zst, zip); overrides
    /// inference from the url.
    #[arg(long = "archive-type")]
    archive_type: Option<String>,

    /// Output directory name; defaults to the rule name.
    #[arg(long)]
    name: Option<String>,

    /// Regex for archive members to skip during unpack; repeatable.
    #[arg(long = "exclude")]
    excludes: Vec<String>,

    /// Accepted for rule compatibility; always rejected by validation.
    #[arg(long = "strip-prefix")]
    strip_prefix: Option<String>,

    /// Directory the output lands under.
    #[arg(long, default_value = ".")]
    dest: PathBuf,

    /// Rule identifier, used as the output name when --name is absent.
    #[arg(long, default_value = "archive")]
    rule_name: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = PrefabCli::parse();
    init_tracing(cli.trace, cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("error: {err:#}");
        let code = if err.downcast_ref::<ConfigError>().is_some() {
            1
        } else {
            2
        };
        std::process::exit(code);
    }
    Ok(())
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("prefab_cli={level},prefab_core={level},prefab_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: &PrefabCli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Toolchain(args) => run_toolchain(cli, args),
        Command::Fetch(args) => run_fetch(cli, args),
    }
}

fn run_toolchain(cli: &PrefabCli, args: &ToolchainArgs) -> anyhow::Result<()> {
    let platform = match (&args.os, &args.arch) {
        (Some(os), Some(arch)) => PlatformKey::from_labels(os, arch)?,
        (None, None) => PlatformKey::host()?,
        (Some(os), None) => PlatformKey::from_labels(os, std::env::consts::ARCH)?,
        (None, Some(arch)) => PlatformKey::from_labels(std::env::consts::OS, arch)?,
    };

    let config = CompilerConfig {
        compiler: args.compiler.clone(),
        rustdoc: args.rustdoc.clone(),
        default_edition: args.edition.clone(),
        extern_doc_url_prefix: args.extern_doc_url.clone(),
        flags: args.flags.clone(),
    };
    let descriptor = resolve_toolchain(platform, config);
    emit_toolchain(cli, &descriptor)?;
    Ok(())
}

fn run_fetch(cli: &PrefabCli, args: &FetchArgs) -> anyhow::Result<()> {
    let spec = ArchiveSpec::new(ArchiveRequest {
        urls: args.urls.clone(),
        sha1: args.sha1.clone(),
        sha256: args.sha256.clone(),
        archive_type: args.archive_type.clone(),
        strip_prefix: args.strip_prefix.clone(),
        name: args.name.clone(),
        excludes: args.excludes.clone(),
    })?;

    let outcome = fetch(&spec, &args.rule_name, &args.dest)?;
    emit_fetch(cli, &outcome)?;
    Ok(())
}

fn emit_toolchain(cli: &PrefabCli, descriptor: &ToolchainDescriptor) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(descriptor)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }
    println!("target-triple: {}", descriptor.target_triple);
    println!("compiler: {}", descriptor.compiler.name);
    println!("rustdoc: {}", descriptor.rustdoc.name);
    if let Some(edition) = &descriptor.default_edition {
        println!("edition: {edition}");
    }
    if let Some(prefix) = &descriptor.extern_doc_url_prefix {
        println!("extern-doc-url: {prefix}");
    }
    if !descriptor.flags.is_empty() {
        println!("flags: {}", descriptor.flags.join(" "));
    }
    Ok(())
}

fn emit_fetch(cli: &PrefabCli, outcome: &FetchOutcome) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    if !cli.quiet {
        println!(
            "fetched {} ({}) -> {}",
            outcome.url,
            outcome.archive_type,
            outcome.out_dir.display()
        );
    }
    Ok(())
}
