//! Model runtimes for background removal and inpainting

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use super::MediaError;
use super::process::run_tool;
use super::raster::save_image;

#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Write `input` with its background made transparent to `output` (PNG)
    async fn remove_background(&self, input: &Path, output: &Path) -> Result<(), MediaError>;

    /// Fill the white area of `mask` in `image` and write the result to `output`
    async fn inpaint(&self, image: &Path, mask: &Path, output: &Path) -> Result<(), MediaError>;
}

/// Runs `rembg` and `iopaint` as child processes
#[derive(Debug, Clone)]
pub struct CliModelRuntime {
    rembg: PathBuf,
    iopaint: PathBuf,
    inpaint_model: String,
    device: String,
}

impl CliModelRuntime {
    pub fn new(
        rembg: impl Into<PathBuf>,
        iopaint: impl Into<PathBuf>,
        inpaint_model: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            rembg: rembg.into(),
            iopaint: iopaint.into(),
            inpaint_model: inpaint_model.into(),
            device: device.into(),
        }
    }

    fn rembg_args(input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "i".into(),
            input.as_os_str().to_owned(),
            output.as_os_str().to_owned(),
        ]
    }

    fn iopaint_args(&self, image: &Path, mask: &Path, out_dir: &Path) -> Vec<OsString> {
        vec![
            "run".into(),
            "--model".into(),
            self.inpaint_model.clone().into(),
            "--device".into(),
            self.device.clone().into(),
            "--image".into(),
            image.as_os_str().to_owned(),
            "--mask".into(),
            mask.as_os_str().to_owned(),
            "--output".into(),
            out_dir.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl ModelBackend for CliModelRuntime {
    async fn remove_background(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        info!(input = %input.display(), "Removing background");
        run_tool(&self.rembg, Self::rembg_args(input, output)).await?;
        Ok(())
    }

    async fn inpaint(&self, image: &Path, mask: &Path, output: &Path) -> Result<(), MediaError> {
        // iopaint writes into a directory, named after the input file
        let scratch = TempDir::new()?;
        info!(image = %image.display(), model = %self.inpaint_model, "Inpainting");
        run_tool(&self.iopaint, self.iopaint_args(image, mask, scratch.path())).await?;

        let produced = first_file(scratch.path())?.ok_or_else(|| MediaError::Tool {
            tool: "iopaint".to_string(),
            message: "no output image was produced".to_string(),
        })?;
        debug!(produced = %produced.display(), "Re-encoding inpainted image");

        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let img = image::open(&produced)?;
            save_image(img, &output)
        })
        .await
        .map_err(|e| MediaError::Io(std::io::Error::other(e)))?
    }
}

fn first_file(dir: &Path) -> Result<Option<PathBuf>, MediaError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files.into_iter().next())
}
