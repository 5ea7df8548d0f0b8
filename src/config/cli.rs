use crate::domain::ports::Storage;
use crate::utils::error::{InstallError, Result};
use std::path::{Path, PathBuf};

/// 本機目錄作為安裝目的地
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    /// 先寫入同目錄的暫存檔再改名，失敗時不會留下寫到一半的檔案
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Ok(metadata) = tokio::fs::metadata(&full_path).await {
            if metadata.is_dir() {
                return Err(InstallError::PathConflict { path: full_path }.into());
            }
        }

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallError::from_io(parent.to_path_buf(), e))?;
        }

        let file_name = full_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = full_path.with_file_name(format!(".{}.partial", file_name));

        if let Err(e) = tokio::fs::write(&staging, data).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(InstallError::from_io(full_path, e).into());
        }
        if let Err(e) = tokio::fs::rename(&staging, &full_path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(InstallError::from_io(full_path, e).into());
        }

        tracing::debug!("Installed {} ({} bytes)", full_path.display(), data.len());
        Ok(())
    }

    fn location(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ForgeError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("site-packages"));

        storage.write_file("_pymdp.so", b"\x7fELF").await.unwrap();
        assert_eq!(storage.read_file("_pymdp.so").await.unwrap(), b"\x7fELF");
        assert_eq!(
            storage.location("_pymdp.so"),
            temp_dir.path().join("site-packages").join("_pymdp.so")
        );
    }

    #[tokio::test]
    async fn test_overwrite_is_idempotent_and_leaves_no_staging_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        storage.write_file("pymdp.py", b"old").await.unwrap();
        storage.write_file("pymdp.py", b"new").await.unwrap();
        storage.write_file("pymdp.py", b"new").await.unwrap();

        assert_eq!(std::fs::read(temp_dir.path().join("pymdp.py")).unwrap(), b"new");
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_directory_at_destination_is_a_conflict() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("_pymdp.so")).unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        let err = storage.write_file("_pymdp.so", b"data").await.unwrap_err();
        assert!(matches!(
            err,
            ForgeError::Install(InstallError::PathConflict { .. })
        ));
    }
}
