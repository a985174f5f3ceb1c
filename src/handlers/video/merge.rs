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

/// Concatenates two or more videos in order
pub struct MergeHandler {
    backend: Arc<dyn VideoBackend>,
    output: OutputDir,
    encode: EncodeSettings,
}

impl MergeHandler {
    pub fn new(backend: Arc<dyn VideoBackend>, output: OutputDir, encode: EncodeSettings) -> Self {
        Self {
            backend,
            output,
            encode,
        }
    }
}

#[async_trait]
impl NodeHandler for MergeHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Merge
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let paths = params.string_list("video_paths")?.unwrap_or_default();
        if paths.len() < 2 {
            return Err(NodeError::MissingInput(
                "At least two video paths must be provided for merging.".to_string(),
            ));
        }

        let files = paths
            .iter()
            .map(|path| require_file(path, MediaKind::Video, "Video file"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut clips = Vec::with_capacity(files.len());
        for file in files {
            let info = probe_video(self.backend.as_ref(), &file).await?;
            clips.push((file, info));
        }

        let output = self.output.allocate("merged_", &extension_of(&clips[0].0));
        info!(clips = clips.len(), output = %output.display(), "Merging videos");

        let job = FfmpegJob::concat(&clips, self.encode.clone(), &output);
        encode(self.backend.as_ref(), &job, "merge videos").await?;

        Ok(output_path_outputs(&output))
    }
}
