use crate::Project;
use crate::navigator::PrintNavigator;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use codelinks_tag_index::Document;
use codelinks_tag_index::Resolution;
use codelinks_tag_index::Resolver;
use codelinks_tag_index::TagIndex;
use codelinks_tag_index::reference_at;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Parser)]
pub struct ResolveArgs {
    /// Key to look up, without the `tag:#` prefix
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Document searched before the project index
    #[arg(long, value_name = "FILE")]
    pub document: Option<PathBuf>,

    /// Project root (defaults to discovery from the document, then the current directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct JumpArgs {
    /// File containing the `goto:#` reference
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// 1-based line of the reference
    #[arg(long)]
    pub line: NonZeroUsize,

    /// 1-based caret column; picks between several references on one line
    #[arg(long, default_value = "1")]
    pub column: NonZeroUsize,

    /// Project root (defaults to discovery from the file)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

pub(crate) async fn run_resolve(args: ResolveArgs, config: Option<&Path>) -> Result<ExitCode> {
    let project = Project::locate(args.root, args.document.as_deref(), config)?;
    let (path, content) = match &args.document {
        Some(path) => (path.clone(), read_document(path).await?),
        None => (project.root.clone(), String::new()),
    };
    let document = Document::new(&path, &content);
    resolve_and_print(&args.key, &document, project).await
}

pub(crate) async fn run_jump(args: JumpArgs, config: Option<&Path>) -> Result<ExitCode> {
    let content = read_document(&args.file).await?;
    let line_idx = args.line.get() - 1;
    let Some(line) = content.lines().nth(line_idx) else {
        anyhow::bail!(
            "{} has no line {} ({} lines)",
            args.file.display(),
            args.line,
            content.lines().count()
        );
    };
    let Some(key) = reference_at(line, args.column.get() - 1) else {
        eprintln!(
            "no goto:# reference on {}:{}",
            args.file.display(),
            args.line
        );
        return Ok(ExitCode::FAILURE);
    };
    debug!("jumping from {}:{} to {key}", args.file.display(), args.line);

    let project = Project::locate(args.root, Some(&args.file), config)?;
    let document = Document::new(&args.file, &content);
    resolve_and_print(&key, &document, project).await
}

async fn resolve_and_print(
    key: &str,
    document: &Document<'_>,
    project: Project,
) -> Result<ExitCode> {
    let Project { root, config } = project;
    let resolver = Resolver::new(Arc::new(TagIndex::new(config)));

    let resolution = resolver
        .navigate(key, document, Some(&root), &PrintNavigator)
        .await;

    match resolution {
        Resolution::Found { .. } => Ok(ExitCode::SUCCESS),
        Resolution::NotFound => {
            eprintln!("tag not found: tag:#{key}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn read_document(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}
