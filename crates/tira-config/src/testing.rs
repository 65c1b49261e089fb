//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - An isolated working tree for original files
//! - A separate directory for redirected shadow copies
//!
//! # Usage
//!
//! ```ignore
//! use tira_config::testing::TestEnvironment;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestEnvironment::new().unwrap();
//!     let original = env.create_file("notes.txt", b"hello").unwrap();
//!     // env.work_dir and env.shadow_dir are isolated per test
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with unique paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Directory holding the caller-visible original files
    pub work_dir: PathBuf,
    /// Directory shadows are directed into when not placed alongside originals
    pub shadow_dir: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let work_dir = root.join("work");
        let shadow_dir = root.join("shadows");
        std::fs::create_dir_all(&work_dir)?;
        std::fs::create_dir_all(&shadow_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            work_dir,
            shadow_dir,
            test_id,
        })
    }

    /// Create a test file with content
    pub fn create_file(&self, relative_path: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.work_dir.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a test directory
    pub fn create_dir(&self, relative_path: &str) -> anyhow::Result<PathBuf> {
        let path = self.work_dir.join(relative_path);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Build a `Config` pointing the session at this environment.
    pub fn config(&self) -> crate::Config {
        let mut cfg = crate::Config::default();
        cfg.session.shadow_dir = Some(self.shadow_dir.clone());
        cfg
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
