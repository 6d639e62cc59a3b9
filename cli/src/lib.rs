mod index_cmd;
pub mod logging;
mod navigator;
mod resolve_cmd;
mod scan_cmd;

use anyhow::Context;
use anyhow::Result;
use clap::ArgAction;
use clap::Parser;
use clap::Subcommand;
use codelinks_tag_index::TagIndexConfig;
use codelinks_tag_index::find_project_root;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

pub use index_cmd::IndexArgs;
pub use navigator::PrintNavigator;
pub use navigator::format_location;
pub use resolve_cmd::JumpArgs;
pub use resolve_cmd::ResolveArgs;
pub use scan_cmd::ScanArgs;

/// Navigate `goto:#key` comment links to their `tag:#key` definitions.
#[derive(Debug, Parser)]
#[command(name = "codelinks", version)]
pub struct Cli {
    /// Read index settings from this TOML file instead of `<root>/.codelinks.toml`.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every marker found in the given files
    Scan(ScanArgs),

    /// Print the definition location of a key
    Resolve(ResolveArgs),

    /// Follow the reference on a given line of a file
    Jump(JumpArgs),

    /// Build the project index and print its size
    Stats(IndexArgs),

    /// Build the project index and list every key
    Keys(IndexArgs),
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Scan(args) => scan_cmd::run_scan(args).await,
        Command::Resolve(args) => resolve_cmd::run_resolve(args, config).await,
        Command::Jump(args) => resolve_cmd::run_jump(args, config).await,
        Command::Stats(args) => index_cmd::run_stats(args, config).await,
        Command::Keys(args) => index_cmd::run_keys(args, config).await,
    }
}

/// Project root and the settings that apply to it.
///
/// An explicit `--root` wins, then discovery upward from `document`, then the
/// current directory. Settings come from `--config` when given, otherwise from
/// the root's `.codelinks.toml`.
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: TagIndexConfig,
}

impl Project {
    pub(crate) fn locate(
        explicit_root: Option<PathBuf>,
        document: Option<&Path>,
        config_path: Option<&Path>,
    ) -> Result<Self> {
        let explicit_config = config_path
            .map(|path| {
                TagIndexConfig::from_path(path)
                    .with_context(|| format!("failed to load config from {}", path.display()))
            })
            .transpose()?;

        let root = match (explicit_root, document) {
            (Some(root), _) => root,
            (None, Some(document)) => {
                let markers = explicit_config
                    .as_ref()
                    .map(|config| config.project_markers.clone())
                    .unwrap_or_else(|| TagIndexConfig::default().project_markers);
                find_project_root(&absolute(document)?, &markers)
            }
            (None, None) => {
                std::env::current_dir().context("failed to determine current directory")?
            }
        };

        let config = match explicit_config {
            Some(config) => config,
            None => TagIndexConfig::load(&root)
                .with_context(|| format!("failed to load config for {}", root.display()))?,
        };
        Ok(Self { root, config })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("invalid path {}", path.display()))
}
