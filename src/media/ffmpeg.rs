//! Video probing and encoding through the `ffmpeg`/`ffprobe` binaries
//!
//! Jobs are plain data ([`FfmpegJob`]) built by the constructors below and
//! rendered to an argument vector by [`FfmpegJob::to_args`], so the exact
//! command line for every video node can be checked without running ffmpeg.

use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::MediaError;
use super::process::run_tool;

/// Sample rate and layout every merged clip is normalized to
const AUDIO_RATE: u32 = 44_100;
const AUDIO_LAYOUT: &str = "stereo";

#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub has_video: bool,
    pub has_audio: bool,
}

#[async_trait]
pub trait VideoBackend: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError>;

    async fn transcode(&self, job: &FfmpegJob) -> Result<(), MediaError>;
}

/// Encoder settings shared by all video outputs
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u8,
    pub pix_fmt: String,
    pub profile: String,
    pub level: String,
    pub tune: String,
    pub threads: u32,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            pix_fmt: "yuv420p".to_string(),
            profile: "high".to_string(),
            level: "4.0".to_string(),
            tune: "film".to_string(),
            threads: 2,
            video_bitrate: None,
            audio_bitrate: None,
        }
    }
}

impl EncodeSettings {
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
        ];
        if let Some(bitrate) = &self.video_bitrate {
            args.extend(["-b:v".to_string(), bitrate.clone()]);
        }
        args.extend([
            "-pix_fmt".to_string(),
            self.pix_fmt.clone(),
            "-profile:v".to_string(),
            self.profile.clone(),
            "-level".to_string(),
            self.level.clone(),
            "-tune".to_string(),
            self.tune.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
        ]);
        if let Some(bitrate) = &self.audio_bitrate {
            args.extend(["-b:a".to_string(), bitrate.clone()]);
        }
        args.extend([
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-threads".to_string(),
            self.threads.to_string(),
        ]);
        args
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegInput {
    /// Options placed before `-i` (seek, loop)
    pub options: Vec<String>,
    pub path: PathBuf,
}

/// A single ffmpeg invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegJob {
    pub inputs: Vec<FfmpegInput>,
    pub filter_complex: Option<String>,
    pub maps: Vec<String>,
    /// Output duration in seconds (`-t`)
    pub duration: Option<f64>,
    pub encode: EncodeSettings,
    pub output: PathBuf,
}

/// Overlay image composited onto a video for a time window
#[derive(Debug, Clone, PartialEq)]
pub struct TimedOverlay {
    pub image: PathBuf,
    /// ffmpeg expressions over `W`, `H`, `w`, `h`
    pub x: String,
    pub y: String,
    pub start: f64,
    pub end: f64,
}

/// Seconds rendered with millisecond precision
fn secs(value: f64) -> String {
    format!("{value:.3}")
}

impl FfmpegJob {
    pub fn new(output: impl Into<PathBuf>, encode: EncodeSettings) -> Self {
        Self {
            inputs: Vec::new(),
            filter_complex: None,
            maps: Vec::new(),
            duration: None,
            encode,
            output: output.into(),
        }
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(FfmpegInput {
            options: Vec::new(),
            path: path.into(),
        });
        self
    }

    pub fn input_with<I, S>(mut self, options: I, path: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(FfmpegInput {
            options: options.into_iter().map(Into::into).collect(),
            path: path.into(),
        });
        self
    }

    pub fn filter(mut self, graph: impl Into<String>) -> Self {
        self.filter_complex = Some(graph.into());
        self
    }

    pub fn map(mut self, stream: impl Into<String>) -> Self {
        self.maps.push(stream.into());
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Cut `[start, start + duration)` out of `input`
    pub fn trim(
        input: &Path,
        start: f64,
        duration: f64,
        encode: EncodeSettings,
        output: &Path,
    ) -> Self {
        FfmpegJob::new(output, encode)
            .input_with(["-ss".to_string(), secs(start)], input)
            .duration(duration)
    }

    /// Concatenate clips in order onto a canvas large enough for all of them.
    /// Smaller clips are letterboxed; clips without audio contribute silence.
    pub fn concat(clips: &[(PathBuf, MediaInfo)], encode: EncodeSettings, output: &Path) -> Self {
        let width = even(clips.iter().map(|(_, i)| i.width).max().unwrap_or(0));
        let height = even(clips.iter().map(|(_, i)| i.height).max().unwrap_or(0));

        let mut graph = Vec::with_capacity(clips.len() * 2 + 1);
        let mut pads = String::new();
        let mut job = FfmpegJob::new(output, encode);

        for (i, (path, info)) in clips.iter().enumerate() {
            job = job.input(path);
            graph.push(format!(
                "[{i}:v]scale={width}:{height}:force_original_aspect_ratio=decrease,\
                 pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p[v{i}]"
            ));
            if info.has_audio {
                graph.push(format!(
                    "[{i}:a]aformat=sample_rates={AUDIO_RATE}:channel_layouts={AUDIO_LAYOUT}[a{i}]"
                ));
            } else {
                graph.push(format!(
                    "anullsrc=r={AUDIO_RATE}:cl={AUDIO_LAYOUT},atrim=duration={}[a{i}]",
                    secs(info.duration)
                ));
            }
            pads.push_str(&format!("[v{i}][a{i}]"));
        }
        graph.push(format!(
            "{pads}concat=n={}:v=1:a=1[vout][aout]",
            clips.len()
        ));

        job.filter(graph.join(";")).map("[vout]").map("[aout]")
    }

    /// Lay `music` (looped) under `video`, cut to the video's duration
    pub fn mix_music(
        video: &Path,
        video_info: &MediaInfo,
        music: &Path,
        music_volume: f64,
        video_volume: f64,
        encode: EncodeSettings,
        output: &Path,
    ) -> Self {
        let duration = secs(video_info.duration);
        let graph = if video_info.has_audio {
            format!(
                "[0:a]volume={video_volume}[va];\
                 [1:a]volume={music_volume},atrim=duration={duration}[ma];\
                 [va][ma]amix=inputs=2:duration=first:dropout_transition=0,volume=2[aout]"
            )
        } else {
            format!("[1:a]volume={music_volume},atrim=duration={duration}[aout]")
        };

        FfmpegJob::new(output, encode)
            .input(video)
            .input_with(["-stream_loop", "-1"], music)
            .filter(graph)
            .map("0:v")
            .map("[aout]")
            .duration(video_info.duration)
    }

    /// Composite timed overlays onto `video`. With no overlays the video is
    /// re-encoded as-is.
    pub fn overlay(
        video: &Path,
        overlays: &[TimedOverlay],
        encode: EncodeSettings,
        output: &Path,
    ) -> Self {
        let mut job = FfmpegJob::new(output, encode).input(video);
        if overlays.is_empty() {
            return job;
        }

        let mut graph = Vec::with_capacity(overlays.len());
        let mut previous = "0:v".to_string();
        for (i, item) in overlays.iter().enumerate() {
            job = job.input(&item.image);
            let label = if i + 1 == overlays.len() {
                "vout".to_string()
            } else {
                format!("v{}", i + 1)
            };
            graph.push(format!(
                "[{previous}][{}:v]overlay=x={}:y={}:enable='between(t,{},{})'[{label}]",
                i + 1,
                item.x,
                item.y,
                secs(item.start),
                secs(item.end)
            ));
            previous = label;
        }

        job.filter(graph.join(";")).map("[vout]").map("0:a?")
    }

    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();

        for input in &self.inputs {
            args.extend(input.options.iter().map(OsString::from));
            args.push("-i".into());
            args.push(input.path.clone().into_os_string());
        }
        if let Some(graph) = &self.filter_complex {
            args.push("-filter_complex".into());
            args.push(graph.into());
        }
        for stream in &self.maps {
            args.push("-map".into());
            args.push(stream.into());
        }
        if let Some(duration) = self.duration {
            args.push("-t".into());
            args.push(secs(duration).into());
        }
        args.extend(self.encode.args().into_iter().map(OsString::from));
        args.push(self.output.clone().into_os_string());
        args
    }
}

/// Round up to an even dimension (required by yuv420p)
fn even(value: u32) -> u32 {
    value + value % 2
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output
pub fn parse_probe(json: &[u8]) -> Result<MediaInfo, MediaError> {
    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| MediaError::Invalid(format!("unreadable ffprobe output: {e}")))?;

    let stream_of = |kind: &str| {
        probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    };
    let video = stream_of("video");
    let has_audio = stream_of("audio").is_some();

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
                .reduce(f64::max)
        })
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaError::Invalid("could not determine media duration".to_string()))?;

    Ok(MediaInfo {
        duration,
        width: video.and_then(|s| s.width).unwrap_or(0),
        height: video.and_then(|s| s.height).unwrap_or(0),
        has_video: video.is_some(),
        has_audio,
    })
}

/// Production [`VideoBackend`]
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegEngine {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl VideoBackend for FfmpegEngine {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        let args: [OsString; 7] = [
            "-v".into(),
            "error".into(),
            "-print_format".into(),
            "json".into(),
            "-show_format".into(),
            "-show_streams".into(),
            path.as_os_str().to_owned(),
        ];
        let output = run_tool(&self.ffprobe, args).await?;
        let info = parse_probe(&output.stdout)?;
        debug!(path = %path.display(), ?info, "Probed media");
        Ok(info)
    }

    async fn transcode(&self, job: &FfmpegJob) -> Result<(), MediaError> {
        info!(
            inputs = job.inputs.len(),
            output = %job.output.display(),
            "Running ffmpeg"
        );
        run_tool(&self.ffmpeg, job.to_args()).await?;
        Ok(())
    }
}
