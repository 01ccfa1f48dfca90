//! Storage abstraction
//!
//! The orchestration core only uses [`StorageProvider::exists`] (input validation and
//! probe-only requests); the remaining operations are available to collaborators.

mod local;

pub use local::LocalStorage;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Filesystem or object-storage operations
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Whether `path` exists
    async fn exists(&self, path: &Path) -> crate::Result<bool>;

    /// Size of `path` in bytes
    async fn size(&self, path: &Path) -> crate::Result<u64>;

    /// Delete `path`
    async fn remove(&self, path: &Path) -> crate::Result<()>;

    /// Create a new empty file in `dir` (system temp dir if `None`) and return its path
    ///
    /// The last `*` in `pattern` is replaced by a random component; without a `*` the
    /// random component is appended.
    async fn create_temp_file(&self, dir: Option<&Path>, pattern: &str)
    -> crate::Result<PathBuf>;
}
