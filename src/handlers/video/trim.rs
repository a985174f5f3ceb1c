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

/// Cuts `[start_time, end_time)` out of a video
pub struct TrimHandler {
    backend: Arc<dyn VideoBackend>,
    output: OutputDir,
    encode: EncodeSettings,
}

impl TrimHandler {
    pub fn new(backend: Arc<dyn VideoBackend>, output: OutputDir, encode: EncodeSettings) -> Self {
        Self {
            backend,
            output,
            encode,
        }
    }
}

#[async_trait]
impl NodeHandler for TrimHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Trim
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let video_path = params.required_string("video_path", "Video path")?;
        let start = params.f64_or("start_time", 0.0)?;
        let end = params.f64("end_time")?;

        if start < 0.0 {
            return Err(NodeError::InvalidParameter(format!(
                "start_time must not be negative, got {start}"
            )));
        }
        if let Some(end) = end {
            if start >= end {
                return Err(NodeError::InvalidParameter(format!(
                    "start_time ({start}) must be less than end_time ({end})"
                )));
            }
        }

        let input = require_file(&video_path, MediaKind::Video, "Input video")?;
        let info = probe_video(self.backend.as_ref(), &input).await?;

        // Missing or out-of-range end means "until the clip ends"
        let end = end.map_or(info.duration, |e| e.min(info.duration));
        if start >= end {
            return Err(NodeError::InvalidParameter(format!(
                "start_time ({start}) is beyond the clip duration ({:.3}s)",
                info.duration
            )));
        }

        let output = self.output.allocate("trimmed_", &extension_of(&input));
        info!(path = %input.display(), start, end, "Trimming video");

        let job = FfmpegJob::trim(&input, start, end - start, self.encode.clone(), &output);
        encode(self.backend.as_ref(), &job, "trim video").await?;

        Ok(output_path_outputs(&output))
    }
}
