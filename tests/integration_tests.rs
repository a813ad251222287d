//! End-to-end tests for the fix engine

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use restyle::cache::FileStorage;
use restyle::diff::UnifiedDiffer;
use restyle::events::{EventSink, FileProcessedStatus, RecordingSink};
use restyle::fixer::{FixError, Fixer, FixerEntry, NoEmptyBlockFixer};
use restyle::lint::TokenLinter;
use restyle::tokens::TokenStream;
use restyle::{
    CacheManager, ConfigSignature, FileCacheManager, NullCacheManager, ParallelConfig, Runner,
    RunnerConfig,
};

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn read_file(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name)).unwrap()
}

fn runner(
    dir: &TempDir,
    files: Vec<PathBuf>,
    fixers: Vec<FixerEntry>,
    config: RunnerConfig,
    sink: Option<Arc<RecordingSink>>,
    cache: Box<dyn CacheManager>,
) -> Runner {
    Runner::new(
        config,
        dir.path(),
        files,
        fixers,
        Arc::new(UnifiedDiffer::new()),
        sink.map(|sink| sink as Arc<dyn EventSink>),
        Arc::new(TokenLinter),
        cache,
    )
}

fn signature(tool_version: &str) -> ConfigSignature {
    ConfigSignature::new(
        "8.3",
        tool_version,
        "    ",
        "\n",
        vec![("no_empty_block".to_string(), json!(true))],
    )
}

/// Test fixer that rewrites every occurrence of one token.
struct Overwrite {
    name: &'static str,
    from: &'static str,
    to: &'static str,
}

impl Fixer for Overwrite {
    fn name(&self) -> &str {
        self.name
    }

    fn fix(&self, _path: &Path, tokens: &mut TokenStream) -> Result<(), FixError> {
        for index in 0..tokens.len() {
            if tokens.get(index).map(|t| t.content()) == Some(self.from) {
                tokens.overwrite(index, self.to);
            }
        }
        Ok(())
    }
}

/// Test fixer that raises a hard parse fault.
struct ParseFault;

impl Fixer for ParseFault {
    fn name(&self) -> &str {
        "parse_fault"
    }

    fn fix(&self, _path: &Path, _tokens: &mut TokenStream) -> Result<(), FixError> {
        Err(FixError::Parse("unexpected token".to_string()))
    }
}

/// Test fixer that breaks delimiter balance in its output.
struct BreakBalance;

impl Fixer for BreakBalance {
    fn name(&self) -> &str {
        "break_balance"
    }

    fn fix(&self, _path: &Path, tokens: &mut TokenStream) -> Result<(), FixError> {
        tokens.overwrite(0, "{");
        Ok(())
    }
}

#[test]
fn removes_empty_block_end_to_end() {
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.php", "<?php if ($foo) {}");
    let sink = Arc::new(RecordingSink::new());

    let mut runner = runner(
        &dir,
        vec![file],
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        RunnerConfig::default(),
        Some(Arc::clone(&sink)),
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert_eq!(read_file(&dir, "a.php"), "<?php ");
    let result = &changed["a.php"];
    assert_eq!(result.applied_fixers, vec!["no_empty_block".to_string()]);
    assert!(result.diff.contains("-<?php if ($foo) {}"));
    assert!(result.diff.contains("+<?php "));
    assert_eq!(sink.statuses(), vec![FileProcessedStatus::Fixed]);
    assert!(runner.errors().is_empty());
}

#[test]
fn unchanged_file_is_absent_from_results() {
    let dir = TempDir::new().unwrap();
    let source = "<?php if ($foo) { doSomething(); }";
    let file = write_file(&dir, "a.php", source);
    let sink = Arc::new(RecordingSink::new());

    let mut runner = runner(
        &dir,
        vec![file],
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        RunnerConfig::default(),
        Some(Arc::clone(&sink)),
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert!(changed.is_empty());
    assert_eq!(read_file(&dir, "a.php"), source);
    assert_eq!(sink.statuses(), vec![FileProcessedStatus::NoChanges]);
    assert!(runner.errors().is_empty());
}

#[test]
fn invalid_file_is_reported_not_fixed() {
    let dir = TempDir::new().unwrap();
    let source = "<?php if ((";
    let file = write_file(&dir, "broken.php", source);
    let sink = Arc::new(RecordingSink::new());

    let mut runner = runner(
        &dir,
        vec![file],
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        RunnerConfig::default(),
        Some(Arc::clone(&sink)),
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert!(changed.is_empty());
    assert_eq!(read_file(&dir, "broken.php"), source);
    assert_eq!(sink.statuses(), vec![FileProcessedStatus::Invalid]);
    assert_eq!(runner.errors().invalid_errors().len(), 1);
    assert_eq!(runner.errors().invalid_errors()[0].source_path, "broken.php");
}

#[test]
fn mutually_cancelling_fixers_yield_no_result() {
    let dir = TempDir::new().unwrap();
    let source = "alpha beta";
    let file = write_file(&dir, "a.txt", source);
    let sink = Arc::new(RecordingSink::new());

    // the second fixer reverts the first; both mark the stream changed
    let fixers = vec![
        FixerEntry::trusted(Overwrite { name: "upper", from: "alpha", to: "ALPHA" }),
        FixerEntry::trusted(Overwrite { name: "lower", from: "ALPHA", to: "alpha" }),
    ];

    let mut runner = runner(
        &dir,
        vec![file],
        fixers,
        RunnerConfig::default(),
        Some(Arc::clone(&sink)),
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert!(changed.is_empty());
    assert_eq!(read_file(&dir, "a.txt"), source);
    assert_eq!(sink.statuses(), vec![FileProcessedStatus::NoChanges]);
    assert!(runner.errors().is_empty());
}

#[test]
fn parse_fault_abandons_partial_edits() {
    let dir = TempDir::new().unwrap();
    let source = "alpha beta";
    let file = write_file(&dir, "a.txt", source);
    let sink = Arc::new(RecordingSink::new());

    // the first fixer mutates the stream, then the second faults; nothing
    // may reach the disk
    let fixers = vec![
        FixerEntry::trusted(Overwrite { name: "mangle", from: "alpha", to: "ALPHA" }),
        FixerEntry::trusted(ParseFault),
    ];

    let mut runner = runner(
        &dir,
        vec![file],
        fixers,
        RunnerConfig::default(),
        Some(Arc::clone(&sink)),
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert!(changed.is_empty());
    assert_eq!(read_file(&dir, "a.txt"), source);
    assert_eq!(sink.statuses(), vec![FileProcessedStatus::Lint]);
    assert_eq!(runner.errors().lint_errors().len(), 1);
}

#[test]
fn post_fix_lint_failure_carries_diagnostics() {
    let dir = TempDir::new().unwrap();
    let source = "<?php echo 1;";
    let file = write_file(&dir, "a.php", source);
    let sink = Arc::new(RecordingSink::new());

    let mut runner = runner(
        &dir,
        vec![file],
        vec![FixerEntry::trusted(BreakBalance)],
        RunnerConfig::default(),
        Some(Arc::clone(&sink)),
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert!(changed.is_empty());
    assert_eq!(read_file(&dir, "a.php"), source);
    assert_eq!(sink.statuses(), vec![FileProcessedStatus::Lint]);

    let lint_errors = runner.errors().lint_errors();
    assert_eq!(lint_errors.len(), 1);
    // the error documents the change set that was abandoned
    assert_eq!(lint_errors[0].applied_fixers, vec!["break_balance".to_string()]);
    let diff = lint_errors[0].diff.as_deref().unwrap();
    assert!(diff.contains("+{?php echo 1;"));
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = TempDir::new().unwrap();
    let source = "<?php if ($foo) {}";
    let file = write_file(&dir, "a.php", source);

    let config = RunnerConfig { dry_run: true, ..RunnerConfig::default() };
    let mut runner = runner(
        &dir,
        vec![file],
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        config,
        None,
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert!(changed.contains_key("a.php"));
    assert_eq!(read_file(&dir, "a.php"), source);
}

#[cfg(unix)]
#[test]
fn unwritable_file_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.php", "<?php if ($foo) {}");

    let mut permissions = fs::metadata(&file).unwrap().permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&file, permissions).unwrap();

    let mut runner = runner(
        &dir,
        vec![file.clone()],
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        RunnerConfig::default(),
        None,
        Box::new(NullCacheManager),
    );
    let outcome = runner.fix();

    assert!(outcome.is_err());
    assert!(outcome.unwrap_err().to_string().contains("not writable"));

    // restore so the tempdir can be cleaned up
    let mut permissions = fs::metadata(&file).unwrap().permissions();
    permissions.set_readonly(false);
    fs::set_permissions(&file, permissions).unwrap();
}

#[test]
fn stop_on_violation_halts_after_first_result() {
    let dir = TempDir::new().unwrap();
    let a = write_file(&dir, "a.php", "<?php if ($foo) {}");
    let b = write_file(&dir, "b.php", "<?php while ($bar) {}");

    let config = RunnerConfig { stop_on_violation: true, ..RunnerConfig::default() };
    let mut runner = runner(
        &dir,
        vec![a, b],
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        config,
        None,
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert_eq!(changed.len(), 1);
    assert!(changed.contains_key("a.php"));
    // the second file was never reached
    assert_eq!(read_file(&dir, "b.php"), "<?php while ($bar) {}");
}

#[test]
fn sequential_results_follow_processing_order() {
    let dir = TempDir::new().unwrap();
    let a = write_file(&dir, "a.php", "<?php if ($a) {}");
    let b = write_file(&dir, "b.php", "<?php if ($b) {}");
    let c = write_file(&dir, "c.php", "<?php if ($c) {}");

    let mut runner = runner(
        &dir,
        vec![b, a, c],
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        RunnerConfig::default(),
        None,
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    let keys: Vec<&str> = changed.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["b.php", "a.php", "c.php"]);
}

#[test]
fn external_fixer_is_gated_by_capability_queries() {
    struct EraseAll;
    impl Fixer for EraseAll {
        fn name(&self) -> &str {
            "erase_all"
        }
        fn supports(&self, _path: &Path) -> bool {
            false
        }
        fn fix(&self, _path: &Path, tokens: &mut TokenStream) -> Result<(), FixError> {
            for index in 0..tokens.len() {
                tokens.erase(index);
            }
            Ok(())
        }
    }

    let dir = TempDir::new().unwrap();
    let source = "keep me";
    let file = write_file(&dir, "a.txt", source);

    // externally supplied: the capability query vetoes the run
    let mut gated = runner(
        &dir,
        vec![file.clone()],
        vec![FixerEntry::external(EraseAll)],
        RunnerConfig::default(),
        None,
        Box::new(NullCacheManager),
    );
    assert!(gated.fix().unwrap().is_empty());
    assert_eq!(read_file(&dir, "a.txt"), source);

    // trusted: pre-filtered upstream, the query is not consulted
    let mut trusted = runner(
        &dir,
        vec![file],
        vec![FixerEntry::trusted(EraseAll)],
        RunnerConfig::default(),
        None,
        Box::new(NullCacheManager),
    );
    let changed = trusted.fix().unwrap();
    assert!(changed.contains_key("a.txt"));
    assert_eq!(read_file(&dir, "a.txt"), "");
}

#[test]
fn cache_skips_unchanged_files_on_second_run() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");
    let file = write_file(&dir, "a.php", "<?php if ($foo) {}");

    {
        let cache = FileCacheManager::new(
            Box::new(FileStorage::new(&cache_path)),
            signature("0.2.0"),
        );
        let mut first = runner(
            &dir,
            vec![file.clone()],
            vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
            RunnerConfig::default(),
            None,
            Box::new(cache),
        );
        assert_eq!(first.fix().unwrap().len(), 1);
    }

    // same signature: the file hash matches what the first run recorded,
    // so the file is skipped before any event fires
    let sink = Arc::new(RecordingSink::new());
    {
        let cache = FileCacheManager::new(
            Box::new(FileStorage::new(&cache_path)),
            signature("0.2.0"),
        );
        let mut second = runner(
            &dir,
            vec![file.clone()],
            vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
            RunnerConfig::default(),
            Some(Arc::clone(&sink)),
            Box::new(cache),
        );
        assert!(second.fix().unwrap().is_empty());
    }
    assert!(sink.events().is_empty());

    // different tool version: the whole cache is invalid and the file is
    // processed again (yielding no changes, since it is already fixed)
    let sink = Arc::new(RecordingSink::new());
    {
        let cache = FileCacheManager::new(
            Box::new(FileStorage::new(&cache_path)),
            signature("0.3.0"),
        );
        let mut third = runner(
            &dir,
            vec![file],
            vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
            RunnerConfig::default(),
            Some(Arc::clone(&sink)),
            Box::new(cache),
        );
        assert!(third.fix().unwrap().is_empty());
    }
    assert_eq!(sink.statuses(), vec![FileProcessedStatus::NoChanges]);
}

#[test]
fn parallel_run_merges_disjoint_results() {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for index in 0..5 {
        files.push(write_file(
            &dir,
            &format!("fix{index}.php"),
            "<?php if ($foo) {}",
        ));
    }
    files.push(write_file(&dir, "clean.php", "<?php echo 1;"));
    let sink = Arc::new(RecordingSink::new());

    let config = RunnerConfig {
        parallel: ParallelConfig::new(3, 2, 60).unwrap(),
        ..RunnerConfig::default()
    };
    let mut runner = runner(
        &dir,
        files,
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        config,
        Some(Arc::clone(&sink)),
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    let mut keys: Vec<&str> = changed.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["fix0.php", "fix1.php", "fix2.php", "fix3.php", "fix4.php"]);
    for index in 0..5 {
        assert_eq!(read_file(&dir, &format!("fix{index}.php")), "<?php ");
    }
    assert_eq!(read_file(&dir, "clean.php"), "<?php echo 1;");
    assert_eq!(sink.events().len(), 6);
    assert!(runner.errors().is_empty());
}

#[test]
fn parallel_worker_timeout_surfaces_as_worker_error() {
    struct Slow;
    impl Fixer for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        fn fix(&self, _path: &Path, _tokens: &mut TokenStream) -> Result<(), FixError> {
            std::thread::sleep(std::time::Duration::from_secs(3));
            Ok(())
        }
    }

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "slow.php", "<?php echo 1;");

    let config = RunnerConfig {
        parallel: ParallelConfig::new(1, 1, 1).unwrap(),
        ..RunnerConfig::default()
    };
    let mut runner = runner(
        &dir,
        vec![file],
        vec![FixerEntry::trusted(Slow)],
        config,
        None,
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert!(changed.is_empty());
    let worker_errors = runner.errors().worker_errors();
    assert_eq!(worker_errors.len(), 1);
    assert!(worker_errors[0].message.contains("timeout"));
    assert!(worker_errors[0].message.contains("slow.php"));
    assert!(!runner.errors().is_empty());
}

#[test]
fn parallel_isolates_per_file_failures() {
    let dir = TempDir::new().unwrap();
    let good = write_file(&dir, "good.php", "<?php if ($foo) {}");
    let bad = write_file(&dir, "bad.php", "<?php if ((");

    let config = RunnerConfig {
        parallel: ParallelConfig::new(2, 1, 60).unwrap(),
        ..RunnerConfig::default()
    };
    let mut runner = runner(
        &dir,
        vec![good, bad],
        vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
        config,
        None,
        Box::new(NullCacheManager),
    );
    let changed = runner.fix().unwrap();

    assert!(changed.contains_key("good.php"));
    assert_eq!(read_file(&dir, "good.php"), "<?php ");
    assert_eq!(runner.errors().invalid_errors().len(), 1);
    assert_eq!(runner.errors().invalid_errors()[0].source_path, "bad.php");
}
