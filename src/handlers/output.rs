use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::traits::NodeError;

/// Directory that receives every generated file.
///
/// Names are `<prefix><uuid-v4><ext>`, so repeated or concurrent calls never
/// overwrite each other's results.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if needed. Called once while the registry is built.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh path for a new output. `ext` includes the leading dot or is empty.
    pub fn allocate(&self, prefix: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{prefix}{}{ext}", Uuid::new_v4()))
    }
}

/// Extension of `path` with its leading dot and original case, or `""`
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Fail with `WriteFailure` unless the delegate actually produced `path`
pub async fn confirm_written(path: &Path, what: &str) -> Result<(), NodeError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => {
            discard(path).await;
            Err(NodeError::WriteFailure(format!(
                "Failed to {what} or output file not created"
            )))
        }
    }
}

/// Resolve a delegate result against its output file: on failure the
/// partial output is removed, on success the file must exist.
pub async fn settle(result: Result<(), NodeError>, path: &Path, what: &str) -> Result<(), NodeError> {
    match result {
        Ok(()) => confirm_written(path, what).await,
        Err(e) => {
            discard(path).await;
            Err(e)
        }
    }
}

/// Remove a partial output left by a failed delegate
pub async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allocate_is_unique_and_prefixed() {
        let dir = OutputDir::new("output");
        let a = dir.allocate("resized_", ".png");
        let b = dir.allocate("resized_", ".png");

        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("resized_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "resized_".len() + 36 + ".png".len());
        assert_eq!(a.parent().unwrap(), Path::new("output"));
    }

    #[test]
    fn test_extension_of_keeps_case() {
        assert_eq!(extension_of(Path::new("a/b/photo.JPG")), ".JPG");
        assert_eq!(extension_of(Path::new("clip.mp4")), ".mp4");
        assert_eq!(extension_of(Path::new("noext")), "");
    }

    #[test]
    fn test_ensure_creates_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let dir = OutputDir::new(temp.path().join("a").join("b"));
        dir.ensure().unwrap();
        assert!(dir.root().is_dir());
        // Idempotent
        dir.ensure().unwrap();
    }

    #[tokio::test]
    async fn test_confirm_written_rejects_empty_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.mp4");
        std::fs::write(&path, b"").unwrap();

        let err = confirm_written(&path, "trim video").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to trim video or output file not created"
        );
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_settle_discards_partial_output() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("partial.mp4");
        std::fs::write(&path, b"half").unwrap();

        let err = settle(Err(NodeError::External("ffmpeg failed".into())), &path, "merge videos")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "ffmpeg failed");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_confirm_written_ok() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.png");
        std::fs::write(&path, b"data").unwrap();

        assert!(confirm_written(&path, "resize image").await.is_ok());
    }
}
