use std::path::{Path, PathBuf};

use super::traits::NodeError;

/// Media family of an input file, each with its own extension allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &["jpg", "jpeg", "png", "bmp", "gif", "tiff"],
            MediaKind::Video => &["mp4", "avi", "mov", "mkv"],
            MediaKind::Audio => &["mp3", "wav", "aac", "ogg", "m4a"],
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

/// Check that `path` names an existing file of the given media kind.
///
/// `role` is the human label used in messages ("Input image", "Music file").
pub fn require_file(path: &str, kind: MediaKind, role: &str) -> Result<PathBuf, NodeError> {
    let path_buf = PathBuf::from(path);

    if path.trim().is_empty() || !path_buf.is_file() {
        return Err(NodeError::NotFound(format!("{role} not found: {path}")));
    }

    if !kind.accepts(&path_buf) {
        return Err(NodeError::InvalidFormat(format!(
            "Invalid {} file format: {path}",
            role_noun(role)
        )));
    }

    Ok(path_buf)
}

fn role_noun(role: &str) -> String {
    role.split_whitespace()
        .skip_while(|word| matches!(*word, "Input" | "input"))
        .next()
        .unwrap_or(role)
        .to_ascii_lowercase()
}
