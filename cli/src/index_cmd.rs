use crate::Project;
use anyhow::Result;
use clap::Parser;
use codelinks_tag_index::BuildOutcome;
use codelinks_tag_index::TagIndex;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

async fn build(args: &IndexArgs, config: Option<&Path>) -> Result<TagIndex> {
    let Project { root, config } = Project::locate(args.root.clone(), None, config)?;
    let index = TagIndex::new(config);
    match index.ensure_built(&root, &CancellationToken::new()).await {
        BuildOutcome::Built(report) if report.files_failed > 0 => {
            warn!("{} files could not be read", report.files_failed);
        }
        BuildOutcome::Cancelled => anyhow::bail!("index build for {} was cancelled", root.display()),
        BuildOutcome::Built(_) | BuildOutcome::AlreadyBuilt => {}
    }
    Ok(index)
}

pub(crate) async fn run_stats(args: IndexArgs, config: Option<&Path>) -> Result<ExitCode> {
    let index = build(&args, config).await?;
    let stats = index.stats();
    if args.json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!("{} tags, {} locations", stats.key_count, stats.location_count);
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn run_keys(args: IndexArgs, config: Option<&Path>) -> Result<ExitCode> {
    let index = build(&args, config).await?;
    let keys = index.keys();
    if args.json {
        let entries: Vec<serde_json::Value> = keys
            .iter()
            .map(|(key, count)| serde_json::json!({ "key": key, "definitions": count }))
            .collect();
        println!("{}", serde_json::to_string(&entries)?);
        return Ok(ExitCode::SUCCESS);
    }
    for (key, count) in keys {
        println!("{key}\t{count}");
    }
    Ok(ExitCode::SUCCESS)
}
