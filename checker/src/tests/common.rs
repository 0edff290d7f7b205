// Common test utilities and helpers

use std::fs;
use std::path::PathBuf;

use crate::runner::{run_test, CheckError, Outcome, RunConfig};
use crate::tests::mocks::MockEngine;

/// A run scoped to its own temporary directory: the test file, values.yaml,
/// and template.yaml all live under it.
pub struct TestRun {
    pub dir: tempfile::TempDir,
    pub config: RunConfig,
}

impl TestRun {
    /// Write `text` as the test file and build a config pointing the
    /// transient files at the same directory.
    pub fn new(text: &str) -> Self {
        Self::named(text, "test-file.yaml")
    }

    pub fn named(text: &str, file_name: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let test_file = dir.path().join(file_name);
        fs::write(&test_file, text).expect("failed to write test file");

        let mut config = RunConfig::new(test_file);
        config.tmp_dir = dir.path().to_path_buf();
        TestRun { dir, config }
    }

    pub fn execute(&self, engine: &MockEngine) -> Result<Outcome, CheckError> {
        run_test(&self.config, engine)
    }

    pub fn tmp_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
