use crate::navigator::format_location;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use codelinks_tag_index::scan_text;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
pub struct ScanArgs {
    /// Files to scan
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Emit one JSON object per marker (0-based line and column)
    #[arg(long)]
    pub json: bool,
}

pub(crate) async fn run_scan(args: ScanArgs) -> Result<ExitCode> {
    for path in &args.files {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        for occurrence in scan_text(path, &content) {
            if args.json {
                println!("{}", serde_json::to_string(&occurrence)?);
            } else {
                println!(
                    "{} {} {}",
                    occurrence.kind.keyword(),
                    occurrence.key,
                    format_location(&occurrence.location())
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
