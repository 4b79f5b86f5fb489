use crate::domain::error::Result;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Keeps a byte-for-byte copy of every accepted upload under one directory.
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` under a fresh name and return that name. The original
    /// extension is kept; the stem is a UTC timestamp plus a random suffix.
    pub async fn save(&self, original_filename: &str, content: &[u8]) -> Result<String> {
        ensure_dir(&self.root)?;

        let stored_filename = stored_name(original_filename);
        let path = self.root.join(&stored_filename);
        tokio::fs::write(&path, content).await?;

        debug!(path = %path.display(), bytes = content.len(), "Upload file stored");
        Ok(stored_filename)
    }

    /// Delete a file written by `save`. A file that is already gone is fine.
    pub async fn remove(&self, stored_filename: &str) -> Result<()> {
        let path = self.root.join(stored_filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Upload file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn stored_name(original_filename: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%6f");
    let unique = Uuid::new_v4().simple().to_string();
    let suffix = Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}-{}{}", timestamp, &unique[..8], suffix)
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
