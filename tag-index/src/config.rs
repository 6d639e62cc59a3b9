use crate::error::Result;
use crate::error::TagIndexError;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// File name looked up in a project root for per-project settings.
pub const CONFIG_FILENAME: &str = ".codelinks.toml";

/// Configuration for building and maintaining a tag index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagIndexConfig {
    /// File extensions (without the leading dot) that are scanned for markers
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Extra gitignore-style patterns excluded from the walk
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Honor `.gitignore` files found in the tree
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Maximum number of files scanned concurrently during a build
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Files larger than this are skipped
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Entries whose presence marks a directory as a project root.
    /// `*.ext` matches any file with that extension.
    #[serde(default = "default_project_markers")]
    pub project_markers: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    [
        "cs", "vb", "js", "ts", "txt", "xml", "html", "css", "cpp", "h", "py", "java",
    ]
    .iter()
    .map(|ext| (*ext).to_string())
    .collect()
}

fn default_max_concurrent() -> usize {
    num_cpus::get() * 2
}

fn default_max_file_bytes() -> u64 {
    2 * 1024 * 1024
}

fn default_project_markers() -> Vec<String> {
    vec![
        ".git".to_string(),
        "*.sln".to_string(),
        "*.csproj".to_string(),
        "*.vbproj".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Default for TagIndexConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore_patterns: Vec::new(),
            respect_gitignore: true,
            max_concurrent: default_max_concurrent(),
            max_file_bytes: default_max_file_bytes(),
            project_markers: default_project_markers(),
        }
    }
}

impl TagIndexConfig {
    /// Load `<root>/.codelinks.toml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILENAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: TagIndexConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(TagIndexError::Config(
                "at least one extension is required".to_string(),
            ));
        }

        if self.max_concurrent == 0 {
            return Err(TagIndexError::Config(
                "max_concurrent must be > 0".to_string(),
            ));
        }

        if self.max_file_bytes == 0 {
            return Err(TagIndexError::Config(
                "max_file_bytes must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Case-insensitive check against the extension allow-list.
    pub fn allows_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}
