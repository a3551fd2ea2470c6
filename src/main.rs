//! # repo-context CLI (`repoctx`)
//!
//! Turns a git repository (or a local checkout) into one text file ready to
//! paste into a model prompt, plus up to a few notebook plots.
//!
//! ## Usage
//!
//! ```bash
//! repoctx [--config ./repoctx.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `repoctx ingest <url>` | Clone a repository into a temporary workspace and assemble its context |
//! | `repoctx scan <dir>` | Assemble the context of a directory already on disk |
//!
//! ## Examples
//!
//! ```bash
//! # Clone, assemble and write repo_context.txt
//! repoctx ingest https://github.com/org/repo.git
//!
//! # Limit the text to what fits in a prompt, keep the plots
//! repoctx ingest https://github.com/org/repo.git --max-chars 85000 --images-dir ./plots
//!
//! # Print the context of a local checkout to stdout
//! repoctx scan ./checkout --output -
//! ```
//!
//! Logs go to stderr and honor `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use repo_context::config::{self, Config};
use repo_context::export::{self, ExportSummary};
use repo_context::{ingest_directory, ingest_repository};

/// Assemble a repository into a single, deterministic text context for AI
/// models.
#[derive(Parser)]
#[command(
    name = "repoctx",
    about = "Assemble a repository into a single text context for AI models",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML).
    ///
    /// Optional; built-in defaults apply when omitted. Keys that are
    /// missing from the file keep their defaults too.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a repository and assemble its context.
    ///
    /// The clone lives in a temporary directory that is removed when the
    /// command finishes, whether it succeeds or not.
    Ingest {
        /// Repository location: an https/ssh/git/file URL, `host:path`,
        /// or a path to a local repository.
        url: String,

        /// Branch or tag to check out instead of the default branch.
        #[arg(long)]
        branch: Option<String>,

        /// Fetch the full history instead of a shallow clone.
        #[arg(long)]
        full_history: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Assemble the context of a local directory without cloning.
    Scan {
        /// Directory to read. It is never modified.
        dir: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Where to write the context text. `-` writes to stdout.
    #[arg(long, short, default_value = "repo_context.txt")]
    output: PathBuf,

    /// Keep only the first N characters of the context.
    #[arg(long)]
    max_chars: Option<usize>,

    /// Save extracted notebook images as image_<n>.png in this directory.
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,
}

impl OutputArgs {
    fn destination(&self) -> Option<&Path> {
        if self.output.as_os_str() == "-" {
            None
        } else {
            Some(self.output.as_path())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Ingest {
            url,
            branch,
            full_history,
            output,
        } => {
            if branch.is_some() {
                cfg.acquisition.branch = branch;
            }
            if full_history {
                cfg.acquisition.shallow = false;
            }
            cfg.validate()?;

            let context = ingest_repository(&url, &cfg)
                .with_context(|| format!("Failed to ingest {}", url))?;
            let summary = export::export_context(
                &context,
                output.destination(),
                output.max_chars,
                output.images_dir.as_deref(),
            )?;
            report(&format!("ingest {}", url), &summary, &output)?;
        }
        Commands::Scan { dir, output } => {
            cfg.validate()?;

            let context = ingest_directory(&dir, &cfg)
                .with_context(|| format!("Failed to scan {}", dir.display()))?;
            let summary = export::export_context(
                &context,
                output.destination(),
                output.max_chars,
                output.images_dir.as_deref(),
            )?;
            report(&format!("scan {}", dir.display()), &summary, &output)?;
        }
    }

    Ok(())
}

/// Print the run summary. It goes to stderr when the context itself was
/// written to stdout.
fn report(title: &str, summary: &ExportSummary, args: &OutputArgs) -> Result<()> {
    let lines = if args.json {
        serde_json::to_string_pretty(summary)?
    } else {
        let mut lines = vec![
            title.to_string(),
            format!("  files: {}", summary.files),
            format!("  images: {}", summary.images),
        ];
        if summary.truncated {
            lines.push(format!(
                "  characters: {} (truncated from {})",
                summary.characters, summary.total_characters
            ));
        } else {
            lines.push(format!("  characters: {}", summary.characters));
        }
        lines.push(format!("  sha256: {}", summary.sha256));
        if let Some(path) = &summary.output {
            lines.push(format!("  output: {}", path.display()));
        }
        for path in &summary.image_paths {
            lines.push(format!("  image: {}", path.display()));
        }
        lines.push("ok".to_string());
        lines.join("\n")
    };

    if summary.output.is_some() {
        println!("{}", lines);
    } else {
        eprintln!("{}", lines);
    }
    Ok(())
}
