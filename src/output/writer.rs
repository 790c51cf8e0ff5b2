// ABOUTME: Output writers for different destinations (stdout, files)
// ABOUTME: Handles writing formatted reports to their destination

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::error::{OutputError, Result};

#[async_trait]
pub trait OutputWriter: Send + Sync {
    async fn write(&self, content: &str) -> Result<()>;
}

pub struct StdoutWriter;

pub struct FileWriter {
    path: PathBuf,
    create_dirs: bool,
}

#[async_trait]
impl OutputWriter for StdoutWriter {
    async fn write(&self, content: &str) -> Result<()> {
        println!("{}", content.trim_end());
        debug!("Output written to stdout ({} chars)", content.len());
        Ok(())
    }
}

impl FileWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            create_dirs: true,
        }
    }

    pub fn without_create_dirs(mut self) -> Self {
        self.create_dirs = false;
        self
    }
}

#[async_trait]
impl OutputWriter for FileWriter {
    async fn write(&self, content: &str) -> Result<()> {
        if self.create_dirs {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| OutputError::WriteError {
                        message: format!("Failed to create directory {}: {}", parent.display(), e),
                    })?;
            }
        }

        fs::write(&self.path, content)
            .await
            .map_err(|e| OutputError::WriteError {
                message: format!("Failed to write {}: {}", self.path.display(), e),
            })?;

        info!("Output written to {}", self.path.display());
        Ok(())
    }
}
