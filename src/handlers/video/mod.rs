//! Video nodes: each one builds a single [`FfmpegJob`] and hands it to the
//! [`VideoBackend`]

mod add_bgm;
mod merge;
mod trim;
mod watermark;

pub use add_bgm::AddBgmHandler;
pub use merge::MergeHandler;
pub use trim::TrimHandler;
pub use watermark::WatermarkHandler;

use std::path::Path;

use super::output::settle;
use super::traits::NodeError;
use crate::media::{FfmpegJob, MediaInfo, VideoBackend};

/// Probe `path` and require a video stream
async fn probe_video(backend: &dyn VideoBackend, path: &Path) -> Result<MediaInfo, NodeError> {
    let info = backend.probe(path).await?;
    if !info.has_video {
        return Err(NodeError::InvalidFormat(format!(
            "No video stream found in {}",
            path.display()
        )));
    }
    Ok(info)
}

/// Run `job` and check its output, removing partial files on failure
async fn encode(backend: &dyn VideoBackend, job: &FfmpegJob, what: &str) -> Result<(), NodeError> {
    let result = backend.transcode(job).await.map_err(NodeError::from);
    settle(result, &job.output, what).await
}
