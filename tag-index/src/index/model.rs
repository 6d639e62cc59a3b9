use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// `tag:#key`, a jump target.
    Definition,
    /// `goto:#key`, a jump source.
    Reference,
}

impl MarkerKind {
    pub(crate) fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("tag") {
            Some(MarkerKind::Definition)
        } else if keyword.eq_ignore_ascii_case("goto") {
            Some(MarkerKind::Reference)
        } else {
            None
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            MarkerKind::Definition => "tag",
            MarkerKind::Reference => "goto",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerOccurrence {
    pub kind: MarkerKind,
    pub key: String,
    pub file_path: PathBuf,
    /// 0-based.
    pub line: usize,
    /// 0-based character offset of the `tag`/`goto` keyword.
    pub column: usize,
}

impl MarkerOccurrence {
    pub fn location(&self) -> Location {
        Location {
            file_path: self.file_path.clone(),
            line: self.line,
            column: self.column,
        }
    }
}

/// Where a definition marker was found. Line and column are 0-based; hosts
/// translate to their own addressing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_path: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file_path: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file_path: file_path.into(),
            line,
            column,
        }
    }

    /// Path equality ignoring ASCII case and separator style.
    pub fn is_in_file(&self, path: &Path) -> bool {
        normalized_path(&self.file_path) == normalized_path(path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_path.display(), self.line, self.column)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub key_count: usize,
    pub location_count: usize,
}

fn normalized_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}
