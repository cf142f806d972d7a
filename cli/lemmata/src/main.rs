//! Lemmata CLI: compile, format, and validate Lemmata proof libraries.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use manifest::{LemmataManifest, MANIFEST_FILE};

#[derive(Parser)]
#[command(name = "lemmata", version, about = "The Lemmata deduction language")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, build, and resolve a single module
    Check {
        /// Module source file
        file: PathBuf,
        /// Dotted module path (e.g., alg.groups)
        #[arg(long)]
        module: String,
        /// Module version (default: 0.1.0)
        #[arg(long)]
        version: Option<String>,
        /// Library snapshot to resolve imports against (repeatable)
        #[arg(long = "library")]
        libraries: Vec<PathBuf>,
    },
    /// Print a module in canonical form
    Fmt {
        /// Module source file
        file: PathBuf,
        /// Rewrite the file in place
        #[arg(long)]
        write: bool,
        /// Fail if the file is not already formatted
        #[arg(long)]
        check: bool,
    },
    /// Compile every module of the library into a snapshot
    Build {
        /// Path to lemmata.toml (default: search upward from the current directory)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Output snapshot file (default: target/<name>-<version>.lms)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate the library against its previous version and change log
    Validate {
        /// Path to lemmata.toml (default: search upward from the current directory)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Report format (human, json)
        #[arg(long)]
        report: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Check {
            file,
            module,
            version,
            libraries,
        } => commands::check::run(&file, &module, version.as_deref(), &libraries),

        Commands::Fmt { file, write, check } => commands::fmt::run(&file, write, check),

        Commands::Build { manifest, out } => {
            let (manifest, project_dir) = load_manifest(&cwd, manifest.as_deref())?;
            commands::build::run(&project_dir, &manifest, out.as_deref())
        }

        Commands::Validate { manifest, report } => {
            let (manifest, project_dir) = load_manifest(&cwd, manifest.as_deref())?;
            commands::validate::run(&project_dir, &manifest, report.as_deref())
        }
    }
}

fn load_manifest(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<(LemmataManifest, PathBuf)> {
    match explicit {
        Some(path) => LemmataManifest::load(path),
        None => LemmataManifest::find_and_load(cwd)?.ok_or_else(|| {
            anyhow::anyhow!("no {MANIFEST_FILE} found in {} or any parent directory", cwd.display())
        }),
    }
}
