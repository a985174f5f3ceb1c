use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{encode, probe_video};
use crate::handlers::output::{OutputDir, extension_of};
use crate::handlers::params::Params;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::media::{EncodeSettings, FfmpegJob, VideoBackend};

/// Lays looped background music under a video
pub struct AddBgmHandler {
    backend: Arc<dyn VideoBackend>,
    output: OutputDir,
    encode: EncodeSettings,
}

impl AddBgmHandler {
    pub fn new(backend: Arc<dyn VideoBackend>, output: OutputDir, encode: EncodeSettings) -> Self {
        Self {
            backend,
            output,
            encode,
        }
    }
}

fn volume(params: &Params<'_>, key: &str, default: f64) -> Result<f64, NodeError> {
    let value = params.f64_or(key, default)?;
    if value < 0.0 {
        return Err(NodeError::InvalidParameter(format!(
            "{key} must not be negative, got {value}"
        )));
    }
    Ok(value)
}

#[async_trait]
impl NodeHandler for AddBgmHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::AddBgm
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let video_path = params.required_string("video_path", "Video path")?;
        let music_path = params.required_string("music_path", "Music path")?;
        let music_volume = volume(&params, "music_volume", 0.5)?;
        let video_volume = volume(&params, "video_volume", 1.0)?;

        let video = require_file(&video_path, MediaKind::Video, "Input video")?;
        let music = require_file(&music_path, MediaKind::Audio, "Music file")?;

        let info = probe_video(self.backend.as_ref(), &video).await?;
        if !info.has_audio {
            info!(path = %video.display(), "Video has no audio track, music becomes the only track");
        }

        let output = self.output.allocate("bgm_", &extension_of(&video));
        info!(
            path = %video.display(),
            music = %music.display(),
            music_volume,
            video_volume,
            "Adding background music"
        );

        let job = FfmpegJob::mix_music(
            &video,
            &info,
            &music,
            music_volume,
            video_volume,
            self.encode.clone(),
            &output,
        );
        encode(self.backend.as_ref(), &job, "add background music").await?;

        Ok(output_path_outputs(&output))
    }
}
