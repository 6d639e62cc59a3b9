/*!
# CodeLinks Tag Index

Jump from `goto:#key` comments to the matching `tag:#key` comment anywhere in
a project.

## Features

- **Comment markers**: `// tag:#Name` defines a jump target, `// goto:#Name` references it
- **Lazy project index**: built once on first use, shared by concurrent callers
- **Incremental updates**: refresh a single changed file without a full rebuild
- **Unsaved edits first**: the open document is searched before the index
- **Cancellable builds**: a cancelled build leaves the index unbuilt

## Example

```rust,no_run
use codelinks_tag_index::{Document, Resolver, TagIndex, TagIndexConfig};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let root = Path::new("./my-project");
    let index = Arc::new(TagIndex::new(TagIndexConfig::load(root)?));
    let resolver = Resolver::new(index);

    let path = root.join("src/b.cs");
    let content = std::fs::read_to_string(&path)?;
    let document = Document::new(&path, &content);

    match resolver.resolve("Start", &document, Some(root)).await.location() {
        Some(location) => println!("{location}"),
        None => println!("tag not found: tag:#Start"),
    }

    Ok(())
}
```
*/

mod config;
mod error;
mod index;
mod project;
mod resolver;
mod scanner;
mod walker;

pub use config::{CONFIG_FILENAME, TagIndexConfig};
pub use error::{Result, TagIndexError};
pub use index::model::{IndexStats, Location, MarkerKind, MarkerOccurrence};
pub use index::{BuildOutcome, BuildReport, TagIndex, UpdateOutcome};
pub use project::find_project_root;
pub use resolver::{Document, Navigator, Resolution, ResolutionSource, Resolver};
pub use scanner::{find_definition, reference_at, scan_lines, scan_text};
pub use walker::{PathFilter, TreeWalker, list_files};
