//! # git-doc-mapper CLI (`docmap`)
//!
//! Two-part custom interface between a local git instance and a remote
//! document repository. All operations are driven by the file map, which
//! maps remote document identifiers to local files.
//!
//! ## Usage
//!
//! ```bash
//! docmap --config ./docmap.toml <command> --targets <name>...
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docmap push` | Push mapped files and git metadata to each target, then tag the result |
//! | `docmap show` | Show the latest stored version of each mapped file per target |
//! | `docmap pull` | Reserved; not implemented |

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use git_doc_mapper::api::Credentials;
use git_doc_mapper::filemap::FileMap;
use git_doc_mapper::push::{PushOptions, VersionKind};
use git_doc_mapper::show::ShowOptions;
use git_doc_mapper::{config, prompt, pull, push, show};

/// git-doc-mapper — synchronize git-tracked files with a remote document
/// repository.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file defining the configured targets and the file-map filename.
#[derive(Parser)]
#[command(
    name = "docmap",
    about = "Synchronize git-tracked files with a remote document repository",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./docmap.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand.
#[derive(clap::Args)]
struct CommonArgs {
    /// One or more configured target names; each needs a [targets.<name>]
    /// table in the configuration file.
    #[arg(long, short, required = true, num_args = 1..)]
    targets: Vec<String>,

    /// Username attached to new document versions (editClerk / checkedInBy).
    #[arg(long, short)]
    username: Option<String>,

    /// CAUTION: a password passed as an argument may persist in terminal
    /// history; clear the session with `history -c`.
    #[arg(long, short)]
    password: Option<String>,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Push the mapped files to each target's document repository and tag
    /// the git history with the result.
    Push {
        #[command(flatten)]
        common: CommonArgs,

        /// Allow pushing files with uncommitted changes in the working tree.
        #[arg(long, short = 'a')]
        allow_uncommitted: bool,

        /// Version kind stored with the new document versions.
        #[arg(long, short = 'V', value_enum, default_value_t = VersionArg::Minor)]
        version: VersionArg,
    },

    /// Show the branch and versions of all mapped files stored in each
    /// target's document repository.
    Show {
        #[command(flatten)]
        common: CommonArgs,

        /// Check that the current stored documents are from the most recent
        /// push.
        #[arg(long)]
        check_synced: bool,
    },

    /// Pull the mapped files from the document repository (not implemented).
    Pull {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VersionArg {
    Major,
    Minor,
}

impl From<VersionArg> for VersionKind {
    fn from(arg: VersionArg) -> Self {
        match arg {
            VersionArg::Major => VersionKind::Major,
            VersionArg::Minor => VersionKind::Minor,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let filemap = FileMap::load(&cfg.general.map_filename, None)?;

    let common = match &cli.command {
        Commands::Push { common, .. } | Commands::Show { common, .. } | Commands::Pull { common } => {
            common
        }
    };
    let credentials: Credentials = prompt::resolve_credentials(
        &cfg,
        common.username.clone(),
        common.password.clone(),
    )?;

    match cli.command {
        Commands::Push {
            common,
            allow_uncommitted,
            version,
        } => {
            let options = PushOptions {
                allow_uncommitted,
                version: version.into(),
            };
            push::run_push(&cfg, &filemap, &credentials, &common.targets, &options)?;
        }
        Commands::Show {
            common,
            check_synced,
        } => {
            let options = ShowOptions { check_synced };
            show::run_show(&cfg, &filemap, &credentials, &common.targets, &options)?;
        }
        Commands::Pull { common } => {
            pull::run_pull(&cfg, &filemap, &credentials, &common.targets)?;
        }
    }

    Ok(())
}
