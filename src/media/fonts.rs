use ab_glyph::FontVec;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::MediaError;

/// TrueType fonts available to text rendering
#[derive(Debug, Clone)]
pub struct FontLibrary {
    dir: PathBuf,
    default_font: String,
}

impl FontLibrary {
    pub fn new(dir: impl Into<PathBuf>, default_font: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            default_font: default_font.into(),
        }
    }

    /// Path for a font name: absolute paths are used as-is, bare names are
    /// looked up in the font directory.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(name)
        }
    }

    /// Load `name`, falling back to the default font when it cannot be read
    pub fn load(&self, name: Option<&str>) -> Result<FontVec, MediaError> {
        if let Some(name) = name.filter(|n| !n.trim().is_empty() && *n != self.default_font) {
            match read_font(&self.resolve(name)) {
                Ok(font) => return Ok(font),
                Err(e) => warn!(font = name, error = %e, "Falling back to default font"),
            }
        }

        read_font(&self.resolve(&self.default_font))
    }
}

fn read_font(path: &Path) -> Result<FontVec, MediaError> {
    let data = std::fs::read(path)
        .map_err(|e| MediaError::Font(format!("cannot read {}: {e}", path.display())))?;
    FontVec::try_from_vec(data)
        .map_err(|_| MediaError::Font(format!("invalid font file {}", path.display())))
}
