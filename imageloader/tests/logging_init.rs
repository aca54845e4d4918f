//! The global subscriber can only be installed once per process, so the
//! full logging setup gets its own test binary.

use imageloader::logging::init_logging;

#[test]
fn test_init_logging_creates_and_clears_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let log_dir = dir.path().join("logs");
    let log_dir = log_dir.to_str().unwrap();

    std::fs::create_dir_all(log_dir).unwrap();
    std::fs::write(dir.path().join("logs").join("run.log"), "stale contents").unwrap();

    let guard = init_logging(log_dir, "run.log").unwrap();
    tracing::info!(worker_id = 1, "logging initialised");
    drop(guard);

    let contents = std::fs::read_to_string(dir.path().join("logs").join("run.log")).unwrap();
    assert!(!contents.contains("stale contents"));
    assert!(contents.contains("logging initialised"));
}
