use codelinks_tag_index::BuildOutcome;
use codelinks_tag_index::IndexStats;
use codelinks_tag_index::Location;
use codelinks_tag_index::TagIndex;
use codelinks_tag_index::TagIndexConfig;
use codelinks_tag_index::UpdateOutcome;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn sample_tree() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a.cs", "// tag:#Alpha\nclass A {}\n// goto:#Beta\n");
    write(root, "src/b.js", "// tag:#Beta\n/* tag:#Gamma */\n");
    write(root, "docs/readme.txt", "; tag:#Delta\n");
    write(root, "node_modules/x/index.js", "// tag:#Vendored\n");
    dir
}

#[test_log::test(tokio::test)]
async fn second_build_is_a_no_op() {
    let dir = sample_tree();
    let index = TagIndex::new(TagIndexConfig::default());
    let cancel = CancellationToken::new();

    let BuildOutcome::Built(report) = index.ensure_built(dir.path(), &cancel).await else {
        panic!("first call should build");
    };
    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.definitions, 4);
    let first = index.stats();
    assert_eq!(
        first,
        IndexStats {
            key_count: 4,
            location_count: 4
        }
    );

    assert_eq!(
        index.ensure_built(dir.path(), &cancel).await,
        BuildOutcome::AlreadyBuilt
    );
    assert_eq!(index.stats(), first);
    assert_eq!(index.build_count(), 1);
    assert_eq!(index.lookup("Vendored"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn fifty_concurrent_callers_share_one_build() {
    let dir = sample_tree();
    for i in 0..40 {
        write(dir.path(), &format!("gen/file{i}.cs"), &format!("// tag:#Gen{i}\n"));
    }
    let index = Arc::new(TagIndex::new(TagIndexConfig::default()));
    let cancel = CancellationToken::new();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let index = index.clone();
        let root = dir.path().to_path_buf();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            let outcome = index.ensure_built(&root, &cancel).await;
            (outcome, index.is_built())
        }));
    }

    let mut built = 0;
    for handle in handles {
        let (outcome, is_built) = handle.await.unwrap();
        assert!(outcome.is_built());
        assert!(is_built);
        if matches!(outcome, BuildOutcome::Built(_)) {
            built += 1;
        }
    }
    assert_eq!(built, 1);
    assert_eq!(index.build_count(), 1);
    assert_eq!(index.stats().key_count, 44);
}

#[tokio::test]
async fn update_replaces_a_files_definitions() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "main.cs", "// tag:#A\n// tag:#B\n");
    write(root, "other.cs", "// tag:#Keep\n");
    let index = TagIndex::new(TagIndexConfig::default());
    index.ensure_built(root, &CancellationToken::new()).await;

    let main = root.join("main.cs");
    write(root, "main.cs", "// tag:#B\n\n// tag:#C\n");
    assert_eq!(
        index.update_file(&main).await,
        UpdateOutcome::Updated {
            removed: 2,
            added: 2
        }
    );

    assert_eq!(index.lookup("A"), None);
    assert_eq!(index.lookup("B"), Some(Location::new(&main, 0, 3)));
    assert_eq!(index.lookup("C"), Some(Location::new(&main, 2, 3)));
    assert_eq!(
        index.lookup("Keep"),
        Some(Location::new(root.join("other.cs"), 0, 3))
    );
    assert_eq!(index.build_count(), 1);
}

#[tokio::test]
async fn update_matches_paths_case_insensitively() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "Main.cs", "// tag:#Old\n");
    let index = TagIndex::new(TagIndexConfig::default());
    index.ensure_built(root, &CancellationToken::new()).await;

    // Differently cased path that does not exist on a case-sensitive disk.
    let outcome = index.update_file(&root.join("MAIN.CS")).await;
    assert!(matches!(outcome, UpdateOutcome::Updated { removed: 1, .. }));
    assert_eq!(index.lookup("Old").is_some(), cfg!(not(target_os = "linux")));
}

#[tokio::test]
async fn duplicate_keys_resolve_deterministically() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "a.cs", "\n\n// tag:#Dup\n");
    write(root, "c.cs", &format!("{}// tag:#Dup\n", "\n".repeat(9)));
    let index = TagIndex::new(TagIndexConfig::default());
    index.ensure_built(root, &CancellationToken::new()).await;

    let all = index.lookup_all("Dup");
    assert_eq!(all.len(), 2);
    let first = index.lookup("Dup");
    assert_eq!(first.as_ref(), all.first());
    for _ in 0..10 {
        assert_eq!(index.lookup("Dup"), first);
    }
    let mut lines: Vec<usize> = all.iter().map(|location| location.line).collect();
    lines.sort_unstable();
    assert_eq!(lines, vec![2, 9]);
}

#[tokio::test]
async fn cancelled_build_can_be_retried() {
    let dir = sample_tree();
    let index = TagIndex::new(TagIndexConfig::default());
    let cancelled = CancellationToken::new();
    cancelled.cancel();

    assert_eq!(
        index.ensure_built(dir.path(), &cancelled).await,
        BuildOutcome::Cancelled
    );
    assert!(!index.is_built());
    assert_eq!(index.lookup("Alpha"), None);

    let outcome = index
        .ensure_built(dir.path(), &CancellationToken::new())
        .await;
    assert!(matches!(outcome, BuildOutcome::Built(_)));
    assert!(index.lookup("Alpha").is_some());
}

#[tokio::test]
async fn missing_root_builds_an_empty_index() {
    let dir = tempdir().unwrap();
    let index = TagIndex::new(TagIndexConfig::default());
    let outcome = index
        .ensure_built(&dir.path().join("nope"), &CancellationToken::new())
        .await;
    assert!(outcome.is_built());
    assert_eq!(index.stats(), IndexStats::default());
    assert_eq!(index.keys(), Vec::<(String, usize)>::new());
}

#[tokio::test]
async fn keys_are_sorted_with_counts() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x.cs", "// tag:#Zed\n// tag:#Alpha\n");
    write(dir.path(), "y.py", "# tag:#Alpha\n");
    let index = TagIndex::new(TagIndexConfig::default());
    index.ensure_built(dir.path(), &CancellationToken::new()).await;
    assert_eq!(
        index.keys(),
        vec![("Alpha".to_string(), 2), ("Zed".to_string(), 1)]
    );
}

#[tokio::test]
async fn out_of_range_concurrency_still_builds() {
    let dir = sample_tree();
    for max_concurrent in [0, usize::MAX] {
        let index = TagIndex::new(TagIndexConfig {
            max_concurrent,
            ..Default::default()
        });
        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            index.ensure_built(dir.path(), &CancellationToken::new()),
        )
        .await
        .unwrap_or_else(|_| panic!("build with max_concurrent={max_concurrent} hung"));
        assert!(matches!(outcome, BuildOutcome::Built(_)));
        assert_eq!(index.stats().key_count, 4);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelling_between_files_keeps_partial_entries_unbuilt() {
    let dir = tempdir().unwrap();
    let file_count = 3000;
    for i in 0..file_count {
        write(dir.path(), &format!("f{i}.cs"), &format!("// tag:#Key{i}\n"));
    }
    let index = Arc::new(TagIndex::new(TagIndexConfig {
        max_concurrent: 1,
        ..Default::default()
    }));
    let cancel = CancellationToken::new();

    let build = {
        let index = index.clone();
        let root = dir.path().to_path_buf();
        let cancel = cancel.clone();
        tokio::spawn(async move { index.ensure_built(&root, &cancel).await })
    };
    while index.stats().key_count == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    cancel.cancel();

    assert_eq!(build.await.unwrap(), BuildOutcome::Cancelled);
    assert!(!index.is_built());
    let partial = index.stats();
    assert!(partial.key_count > 0);
    assert!(partial.key_count < file_count);
    assert_eq!(index.lookup("Key0"), None);
    assert_eq!(index.lookup_all("Key0"), Vec::<Location>::new());

    let retry = index
        .ensure_built(dir.path(), &CancellationToken::new())
        .await;
    assert!(matches!(retry, BuildOutcome::Built(_)));
    assert_eq!(
        index.stats(),
        IndexStats {
            key_count: file_count,
            location_count: file_count
        }
    );
    assert_eq!(index.build_count(), 2);
}

#[tokio::test]
async fn update_skips_files_a_build_would_not_scan() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "main.cs", "// tag:#Main\n");
    let index = TagIndex::new(TagIndexConfig::default());
    index.ensure_built(root, &CancellationToken::new()).await;

    write(root, "lib.rs", "// tag:#Rust\n");
    write(root, "node_modules/pkg/index.js", "// tag:#Vendored\n");
    for path in [root.join("lib.rs"), root.join("node_modules/pkg/index.js")] {
        assert_eq!(
            index.update_file(&path).await,
            UpdateOutcome::Updated {
                removed: 0,
                added: 0
            }
        );
    }
    assert_eq!(index.lookup("Rust"), None);
    assert_eq!(index.lookup("Vendored"), None);

    write(root, "extra.js", "// tag:#Extra\n");
    assert_eq!(
        index.update_file(&root.join("extra.js")).await,
        UpdateOutcome::Updated {
            removed: 0,
            added: 1
        }
    );
    assert_eq!(
        index.keys(),
        vec![("Extra".to_string(), 1), ("Main".to_string(), 1)]
    );
}
