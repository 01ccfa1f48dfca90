//! Local filesystem storage

use super::StorageProvider;
use crate::error::Result;
use async_trait::async_trait;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Attempts at finding an unused temp file name before giving up
const TEMP_FILE_ATTEMPTS: u32 = 10_000;

/// [`StorageProvider`] backed by the local filesystem
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    /// Create a new local storage provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn exists(&self, path: &Path) -> Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, path: &Path) -> Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        Ok(tokio::fs::remove_file(path).await?)
    }

    async fn create_temp_file(&self, dir: Option<&Path>, pattern: &str) -> Result<PathBuf> {
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::temp_dir(),
        };
        tokio::fs::create_dir_all(&dir).await?;

        let (prefix, suffix) = pattern.rsplit_once('*').unwrap_or((pattern, ""));

        for _ in 0..TEMP_FILE_ATTEMPTS {
            let random = rand::thread_rng().gen_range(0..u32::MAX);
            let candidate = dir.join(format!("{}{}{}", prefix, random, suffix));

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(_) => return Ok(std::path::absolute(&candidate)?),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no unused temp file name for pattern {:?}", pattern),
        )
        .into())
    }
}
