//! Recording backends for handler tests. Each double counts its calls and
//! writes a small placeholder output so the handler's output check passes.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::media::{
    Effect, FfmpegJob, ImageBackend, LogoOverlay, MediaError, MediaInfo, ModelBackend, TextCard,
    TextOverlay, VideoBackend,
};
use crate::providers::{CaptionService, GeneratedImage, ImageGenerator, ProviderError};

/// Create a placeholder file and return its path as a string
pub fn touch(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, b"fixture").unwrap();
    path.to_string_lossy().into_owned()
}

fn failure(tool: &str) -> MediaError {
    MediaError::Tool {
        tool: tool.to_string(),
        message: "simulated failure".to_string(),
    }
}

#[derive(Debug, Default)]
pub struct RecordingImage {
    calls: AtomicUsize,
}

impl RecordingImage {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, output: &Path) -> Result<(), MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(output, b"image")?;
        Ok(())
    }
}

impl ImageBackend for RecordingImage {
    fn apply_effect(&self, _: &Path, output: &Path, _: Effect, _: f32) -> Result<(), MediaError> {
        self.record(output)
    }

    fn resize(&self, _: &Path, output: &Path, _: u32, _: u32) -> Result<(), MediaError> {
        self.record(output)
    }

    fn overlay_logo(
        &self,
        _: &Path,
        _: &Path,
        output: &Path,
        _: &LogoOverlay,
    ) -> Result<(), MediaError> {
        self.record(output)
    }

    fn overlay_text(&self, _: &Path, output: &Path, _: &TextOverlay) -> Result<(), MediaError> {
        self.record(output)
    }

    fn render_text_card(&self, _: &TextCard, output: &Path) -> Result<(u32, u32), MediaError> {
        self.record(output)?;
        Ok((10, 10))
    }

    fn prepare_mask(&self, _: &Path, _: &Path, output: &Path) -> Result<(), MediaError> {
        self.record(output)
    }
}

#[derive(Debug)]
pub struct RecordingVideo {
    info: MediaInfo,
    fail: bool,
    probes: AtomicUsize,
    jobs: Mutex<Vec<FfmpegJob>>,
}

impl RecordingVideo {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            info: MediaInfo {
                duration,
                width: 640,
                height: 360,
                has_video: true,
                has_audio: true,
            },
            fail: false,
            probes: AtomicUsize::new(0),
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// Transcodes write a partial file and then fail
    pub fn failing(duration: f64) -> Self {
        Self {
            fail: true,
            ..Self::with_duration(duration)
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn jobs(&self) -> Vec<FfmpegJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoBackend for RecordingVideo {
    async fn probe(&self, _: &Path) -> Result<MediaInfo, MediaError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.info.clone())
    }

    async fn transcode(&self, job: &FfmpegJob) -> Result<(), MediaError> {
        self.jobs.lock().unwrap().push(job.clone());
        std::fs::write(&job.output, b"video")?;
        if self.fail {
            return Err(failure("ffmpeg"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingModels {
    fail: bool,
    calls: AtomicUsize,
}

impl RecordingModels {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, output: &Path, tool: &str) -> Result<(), MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(output, b"model output")?;
        if self.fail {
            return Err(failure(tool));
        }
        Ok(())
    }
}

#[async_trait]
impl ModelBackend for RecordingModels {
    async fn remove_background(&self, _: &Path, output: &Path) -> Result<(), MediaError> {
        self.record(output, "rembg")
    }

    async fn inpaint(&self, _: &Path, _: &Path, output: &Path) -> Result<(), MediaError> {
        self.record(output, "iopaint")
    }
}

#[derive(Debug, Default)]
pub struct RecordingCaptions {
    keys: Mutex<Vec<String>>,
}

impl RecordingCaptions {
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionService for RecordingCaptions {
    async fn caption(&self, _: &Path, api_key: &str) -> Result<String, ProviderError> {
        self.keys.lock().unwrap().push(api_key.to_string());
        Ok("a test caption".to_string())
    }
}

#[derive(Debug, Default)]
pub struct RecordingGenerator {
    sizes: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn sizes(&self) -> Vec<String> {
        self.sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for RecordingGenerator {
    async fn generate(
        &self,
        _: &str,
        size: &str,
        _: &str,
    ) -> Result<GeneratedImage, ProviderError> {
        self.sizes.lock().unwrap().push(size.to_string());
        Ok(GeneratedImage {
            url: "https://images.test/1.png".to_string(),
            data: Bytes::from_static(b"PNG"),
        })
    }
}
