//! Trait for the external transformation tool

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Opaque subprocess boundary for media transformation and inspection
///
/// Implementations must observe `cancel`: when it fires, any in-flight external
/// process is terminated and [`Error::Canceled`](crate::Error::Canceled) is returned.
#[async_trait]
pub trait TransformExecutor: Send + Sync {
    /// Run the transformation tool with the given argument tokens
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`](crate::Error::Execution) if the tool cannot be
    /// started or exits unsuccessfully, and [`Error::Canceled`](crate::Error::Canceled)
    /// if `cancel` fires first.
    async fn execute(&self, args: &[String], cancel: &CancellationToken) -> crate::Result<()>;

    /// Inspect a media file, returning the tool's structured (JSON) metadata output
    ///
    /// # Errors
    ///
    /// Same as [`execute`](TransformExecutor::execute).
    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> crate::Result<Vec<u8>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
