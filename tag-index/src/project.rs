use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Walk up from `document`'s directory to the nearest ancestor holding one of
/// `markers`. A marker is either an exact entry name (`.git`) or `*.ext`.
/// Falls back to the document's own directory.
pub fn find_project_root(document: &Path, markers: &[String]) -> PathBuf {
    let start = if document.is_dir() {
        document
    } else {
        document.parent().unwrap_or(document)
    };
    start
        .ancestors()
        .find(|dir| contains_marker(dir, markers))
        .unwrap_or(start)
        .to_path_buf()
}

fn contains_marker(dir: &Path, markers: &[String]) -> bool {
    let mut suffixes = Vec::new();
    for marker in markers {
        match marker.strip_prefix("*.") {
            Some(ext) => suffixes.push(ext),
            None => {
                if dir.join(marker).exists() {
                    return true;
                }
            }
        }
    }
    if suffixes.is_empty() {
        return false;
    }
    let Ok(read_dir) = fs::read_dir(dir) else {
        return false;
    };
    read_dir.flatten().any(|entry| {
        let path = entry.path();
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| suffixes.iter().any(|s| s.eq_ignore_ascii_case(ext)))
    })
}
