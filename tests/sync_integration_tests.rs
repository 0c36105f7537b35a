//! End-to-end sync integration tests.
//!
//! Basic sync, same-size edits in both comparison modes, idempotence,
//! dry-run safety, worker-count invariance, failure isolation and excludes.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use treesync::commands::sync::{run, run_sync, run_sync_with};
use treesync::pipeline::RunContext;
use treesync::types::TreeSide;
use treesync::{CompareMode, Config, CopyReason, ErrorStage, SyncError};

fn config_for(source: &Path, destination: &Path) -> Config {
    Config {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        hash_workers: 4,
        copy_workers: 4,
        ..Config::default()
    }
}

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write file");
}

/// Relative path -> content of every regular file under `root`
fn tree_contents(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).expect("read dir") {
            let path = entry.expect("dir entry").path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).expect("under root").to_path_buf();
                out.push((rel, fs::read(&path).expect("read file")));
            }
        }
    }
    out.sort();
    out
}

fn populate_tree(root: &Path, files: usize) {
    for i in 0..files {
        write(
            root,
            &format!("d{}/sub{}/f{i}.dat", i % 7, i % 3),
            format!("payload-{i}").repeat(i % 13 + 1).as_bytes(),
        );
    }
}

#[test]
fn test_basic_sync_empty_destination() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");

    write(src.path(), "a.txt", &[1u8; 10]);
    write(src.path(), "b.txt", &[2u8; 20]);
    write(src.path(), "nested/c.txt", &[3u8; 30]);

    let summary = run(config_for(src.path(), dst.path())).expect("sync run should succeed");

    assert_eq!(summary.copied, 3);
    assert_eq!(summary.unchanged, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.bytes_copied, 60);
    assert_eq!(tree_contents(src.path()), tree_contents(dst.path()));
}

#[test]
fn test_sync_updates_changed_and_skips_unchanged() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");

    write(src.path(), "same.txt", b"identical");
    write(dst.path(), "same.txt", b"identical");
    write(src.path(), "grown.txt", b"new-data");
    write(dst.path(), "grown.txt", b"old");

    let summary = run(config_for(src.path(), dst.path())).expect("sync run should succeed");

    assert_eq!(summary.copied, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(
        fs::read(dst.path().join("grown.txt")).expect("read updated destination file"),
        b"new-data"
    );
}

#[test]
fn test_same_size_edit_detected_by_digest_only() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "x.txt", b"hello");
    write(dst.path(), "x.txt", b"world");

    let size_only = Config {
        compare_mode: CompareMode::Size,
        ..config_for(src.path(), dst.path())
    };
    let summary = run(size_only).expect("size-only run");
    assert_eq!(summary.copied, 0, "size-only comparison cannot see the edit");
    assert_eq!(fs::read(dst.path().join("x.txt")).expect("read"), b"world");

    let summary = run(config_for(src.path(), dst.path())).expect("digest run");
    assert_eq!(summary.copied, 1);
    assert_eq!(fs::read(dst.path().join("x.txt")).expect("read"), b"hello");
}

#[test]
fn test_destination_only_files_are_left_alone() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "a.txt", b"a");
    write(dst.path(), "extra.txt", b"keep me");

    let summary = run(config_for(src.path(), dst.path())).expect("sync run");

    assert_eq!(summary.planned, 1);
    assert_eq!(fs::read(dst.path().join("extra.txt")).expect("read extra"), b"keep me");
}

#[test]
fn test_second_run_is_a_no_op() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    populate_tree(src.path(), 120);

    let first = run(config_for(src.path(), dst.path())).expect("first run");
    assert_eq!(first.copied, 120);

    for mode in [CompareMode::Digest, CompareMode::Size] {
        let config = Config {
            compare_mode: mode,
            ..config_for(src.path(), dst.path())
        };
        let second = run(config).expect("second run");
        assert_eq!(second.planned, 0, "mode {mode} planned copies on a synced tree");
        assert_eq!(second.copied, 0);
        assert_eq!(second.unchanged, 120);
    }
}

#[test]
fn test_dry_run_makes_no_changes_and_matches_real_run() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    populate_tree(src.path(), 40);
    write(dst.path(), "d0/sub0/f0.dat", b"stale");
    let before = tree_contents(dst.path());

    let dry = run(Config {
        dry_run: true,
        ..config_for(src.path(), dst.path())
    })
    .expect("dry run");

    assert_eq!(tree_contents(dst.path()), before, "dry run must not touch the destination");
    assert_eq!(dry.copied, 0);
    let manifest = dry.manifest.expect("dry run has a manifest");
    assert_eq!(manifest.len(), 40);
    let stale = manifest
        .entries
        .iter()
        .find(|e| e.path == Path::new("d0/sub0/f0.dat"))
        .expect("stale file listed");
    assert_eq!(stale.reason, CopyReason::Changed);

    let planned: BTreeSet<PathBuf> = manifest.paths().cloned().collect();
    let real = run(config_for(src.path(), dst.path())).expect("real run");
    assert!(real.manifest.is_none());
    assert_eq!(real.copied, planned.len());

    let copied_now: BTreeSet<PathBuf> = tree_contents(dst.path())
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(copied_now, planned);
}

#[test]
fn test_results_identical_across_worker_counts() {
    let src = TempDir::new().expect("create src tempdir");
    populate_tree(src.path(), 200);
    let expected = tree_contents(src.path());

    for workers in [1, 4, 64] {
        let dst = TempDir::new().expect("create dst tempdir");
        write(dst.path(), "d1/sub1/f1.dat", b"outdated");

        let config = Config {
            hash_workers: workers,
            copy_workers: workers,
            ..config_for(src.path(), dst.path())
        };
        let summary = run(config).expect("sync run");

        assert_eq!(summary.copied, 200, "workers={workers}");
        assert_eq!(summary.failed, 0, "workers={workers}");
        assert_eq!(tree_contents(dst.path()), expected, "workers={workers}");
    }
}

#[test]
fn test_queue_depth_factor_does_not_change_outcome() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    populate_tree(src.path(), 50);

    let config = Config {
        hash_workers: 2,
        copy_workers: 3,
        queue_depth_factor: 8,
        ..config_for(src.path(), dst.path())
    };
    let summary = run(config).expect("sync run");
    assert_eq!(summary.copied, 50);
}

#[test]
#[cfg(unix)]
fn test_one_unreadable_entry_is_isolated() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    populate_tree(src.path(), 30);
    fs::create_dir(src.path().join("target_dir")).expect("mkdir target");
    // A symlink to a directory is a leaf entry that cannot be read as a file
    std::os::unix::fs::symlink(src.path().join("target_dir"), src.path().join("link"))
        .expect("create symlink");

    let summary = run(config_for(src.path(), dst.path())).expect("sync run");

    assert_eq!(summary.failed, 1, "errors: {:?}", summary.errors);
    assert_eq!(summary.copied, 30);
    assert!(summary.has_failures());
    assert_eq!(summary.exit_code(), 1);
    assert!(summary.errors.iter().all(|e| e.path == Path::new("link")));
    assert!(summary
        .errors
        .iter()
        .any(|e| e.stage == ErrorStage::Hash && e.side == TreeSide::Source));
    assert!(summary
        .errors
        .iter()
        .any(|e| e.stage == ErrorStage::Copy && e.side == TreeSide::Destination));
    assert!(!dst.path().join("link").exists());
}

#[test]
#[cfg(unix)]
fn test_unreadable_destination_entry_is_replaced_without_failure() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "x", b"hello");
    fs::create_dir(dst.path().join("elsewhere")).expect("mkdir elsewhere");
    std::os::unix::fs::symlink(dst.path().join("elsewhere"), dst.path().join("x"))
        .expect("create symlink");

    let summary = run(config_for(src.path(), dst.path())).expect("sync run");

    assert_eq!(summary.copied, 1, "errors: {:?}", summary.errors);
    assert_eq!(summary.failed, 0, "errors: {:?}", summary.errors);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(fs::read(dst.path().join("x")).expect("read x"), b"hello");
    // The destination hash error stays in the report for diagnosis.
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].side, TreeSide::Destination);
    assert_eq!(summary.errors[0].stage, ErrorStage::Hash);
}

#[test]
#[cfg(unix)]
fn test_non_utf8_siblings_copy_concurrently() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    let first = OsStr::from_bytes(b"\xff.bin");
    let second = OsStr::from_bytes(b"\xfe.bin");
    let first_content = vec![0xAAu8; 4 * 1024 * 1024];
    let second_content = vec![0x55u8; 4 * 1024 * 1024];
    fs::write(src.path().join(first), &first_content).expect("write first");
    fs::write(src.path().join(second), &second_content).expect("write second");

    let config = Config {
        copy_workers: 2,
        ..config_for(src.path(), dst.path())
    };
    let summary = run(config).expect("sync run");

    assert_eq!(summary.copied, 2, "errors: {:?}", summary.errors);
    assert_eq!(summary.failed, 0);
    assert!(fs::read(dst.path().join(first)).expect("read first") == first_content);
    assert!(fs::read(dst.path().join(second)).expect("read second") == second_content);
}

#[test]
#[cfg(unix)]
fn test_symlinked_file_is_copied_as_content() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "real.txt", b"content");
    std::os::unix::fs::symlink("real.txt", src.path().join("alias.txt")).expect("symlink");

    let summary = run(config_for(src.path(), dst.path())).expect("sync run");

    assert_eq!(summary.copied, 2);
    let alias = dst.path().join("alias.txt");
    assert!(!fs::symlink_metadata(&alias).expect("meta").file_type().is_symlink());
    assert_eq!(fs::read(alias).expect("read alias"), b"content");
}

#[test]
#[cfg(unix)]
fn test_permissions_are_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "bin/run.sh", b"#!/bin/sh\necho hi\n");
    write(src.path(), "secret.txt", b"hidden");
    fs::set_permissions(src.path().join("bin/run.sh"), fs::Permissions::from_mode(0o755))
        .expect("chmod run.sh");
    fs::set_permissions(src.path().join("secret.txt"), fs::Permissions::from_mode(0o600))
        .expect("chmod secret");

    run(config_for(src.path(), dst.path())).expect("sync run");

    let mode = |rel: &str| {
        fs::metadata(dst.path().join(rel))
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777
    };
    assert_eq!(mode("bin/run.sh"), 0o755);
    assert_eq!(mode("secret.txt"), 0o600);
}

#[test]
fn test_exclude_patterns_skip_both_sides() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "keep.txt", b"keep");
    write(src.path(), "debug.log", b"log");
    write(src.path(), "target/out.bin", b"binary");

    let config = Config {
        exclude_patterns: vec!["*.log".to_string(), "target".to_string()],
        ..config_for(src.path(), dst.path())
    };
    let summary = run(config).expect("sync run");

    assert_eq!(summary.copied, 1);
    assert_eq!(summary.source.files, 1);
    assert!(dst.path().join("keep.txt").exists());
    assert!(!dst.path().join("debug.log").exists());
    assert!(!dst.path().join("target").exists());
}

#[test]
fn test_missing_source_root_is_fatal() {
    let parent = TempDir::new().expect("create tempdir");
    let dst = TempDir::new().expect("create dst tempdir");

    let err = run(config_for(&parent.path().join("nope"), dst.path()))
        .expect_err("missing source must fail");

    assert!(matches!(err, SyncError::RootResolution { .. }));
    assert!(fs::read_dir(dst.path()).expect("read dst").next().is_none());
}

#[test]
fn test_source_file_as_root_is_fatal() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "file.txt", b"x");

    let err = run(config_for(&src.path().join("file.txt"), dst.path()))
        .expect_err("file root must fail");
    assert!(err.is_fatal());
}

#[test]
fn test_zero_workers_rejected() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    let config = Config {
        copy_workers: 0,
        ..config_for(src.path(), dst.path())
    };
    let err = run(config).expect_err("zero workers must fail");
    assert!(err.is_validation_error());
}

#[test]
fn test_empty_trees_sync_cleanly() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");

    let summary = run(config_for(src.path(), dst.path())).expect("sync run");
    assert_eq!(summary.planned, 0);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_cancel_yields_partial_result() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    populate_tree(src.path(), 100);

    let ctx = RunContext::new();
    ctx.cancel.cancel();
    let summary = run_sync_with(&config_for(src.path(), dst.path()), ctx)
        .await
        .expect("cancelled run still reports");

    assert!(summary.cancelled);
    assert_eq!(summary.exit_code(), 1);
    assert!(summary.copied < 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_generous_timeout_does_not_cancel() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    populate_tree(src.path(), 10);

    let config = Config {
        timeout: Some(Duration::from_secs(300)),
        ..config_for(src.path(), dst.path())
    };
    let summary = run_sync(&config).await.expect("sync run");

    assert!(!summary.cancelled);
    assert_eq!(summary.copied, 10);
}

#[test]
fn test_expired_timeout_reports_consistent_partial_run() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    populate_tree(src.path(), 400);

    let config = Config {
        hash_workers: 1,
        copy_workers: 1,
        timeout: Some(Duration::from_millis(1)),
        ..config_for(src.path(), dst.path())
    };
    let summary = run(config).expect("timed-out run still reports");

    assert!(summary.cancelled);
    assert_eq!(summary.exit_code(), 1);
    assert!(summary.copied < 400);
    assert_eq!(
        summary.copied + summary.failed + summary.not_attempted,
        summary.planned
    );
    let copied_files = tree_contents(dst.path());
    assert_eq!(copied_files.len(), summary.copied);
    assert!(copied_files
        .iter()
        .all(|(rel, _)| !rel.to_string_lossy().ends_with(".treesync-part")));
}
