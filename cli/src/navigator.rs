use async_trait::async_trait;
use codelinks_tag_index::Location;
use codelinks_tag_index::Navigator;

/// `path:line:column` with 1-based line and column, the form editors and
/// terminals accept for jump targets.
pub fn format_location(location: &Location) -> String {
    format!(
        "{}:{}:{}",
        location.file_path.display(),
        location.line + 1,
        location.column + 1
    )
}

/// Terminal stand-in for an editor: "navigating" prints the target.
#[derive(Debug, Default)]
pub struct PrintNavigator;

#[async_trait]
impl Navigator for PrintNavigator {
    async fn navigate_to(&self, location: &Location) -> anyhow::Result<()> {
        println!("{}", format_location(location));
        Ok(())
    }
}
