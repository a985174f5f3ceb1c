use async_trait::async_trait;
use image::Rgba;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

use super::{encode, probe_video};
use crate::handlers::output::{OutputDir, extension_of};
use crate::handlers::params::Params;
use crate::handlers::run_blocking;
use crate::handlers::traits::{NodeError, NodeHandler};
use crate::handlers::types::{NodeKind, Outputs, output_path_outputs};
use crate::handlers::validate::{MediaKind, require_file};
use crate::media::color::parse_color;
use crate::media::ffmpeg::TimedOverlay;
use crate::media::layout::AxisPosition;
use crate::media::{EncodeSettings, FfmpegJob, ImageBackend, TextCard, VideoBackend};

const WATERMARK_FONT_SIZE: f32 = 50.0;
const WATERMARK_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 142]);
const SUBTITLE_FONT_SIZE: f64 = 30.0;
const SUBTITLE_BACKGROUND: &str = "rgba(0, 0, 0, 0.7)";
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Burns a watermark and timed subtitles into a video
pub struct WatermarkHandler {
    images: Arc<dyn ImageBackend>,
    video: Arc<dyn VideoBackend>,
    output: OutputDir,
    encode: EncodeSettings,
}

impl WatermarkHandler {
    pub fn new(
        images: Arc<dyn ImageBackend>,
        video: Arc<dyn VideoBackend>,
        output: OutputDir,
        encode: EncodeSettings,
    ) -> Self {
        Self {
            images,
            video,
            output,
            encode,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSubtitle {
    text: String,
    start: f64,
    end: f64,
    #[serde(default)]
    position: Option<Value>,
    #[serde(default)]
    font_size: Option<f64>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    bg_color: Option<String>,
}

/// A subtitle card and where/when it is shown
#[derive(Debug, Clone)]
struct Subtitle {
    card: TextCard,
    x: AxisPosition,
    y: AxisPosition,
    start: f64,
    end: f64,
}

fn subtitle_error(index: usize, msg: impl std::fmt::Display) -> NodeError {
    NodeError::InvalidParameter(format!("subtitles_json[{index}]: {msg}"))
}

/// `"x,y"` or `["x", "y"]`, defaulting to bottom center
fn parse_position(index: usize, value: Option<&Value>) -> Result<(AxisPosition, AxisPosition), NodeError> {
    let (x, y) = match value {
        None | Some(Value::Null) => return Ok((AxisPosition::Center, AxisPosition::Far)),
        Some(Value::String(s)) => match s.split_once(',') {
            Some((x, y)) => (x.to_string(), y.to_string()),
            None => return Err(subtitle_error(index, format!("position '{s}' must be \"x,y\""))),
        },
        Some(Value::Array(items)) => match items.as_slice() {
            [Value::String(x), Value::String(y)] => (x.clone(), y.clone()),
            _ => return Err(subtitle_error(index, "position must be two strings")),
        },
        Some(other) => return Err(subtitle_error(index, format!("invalid position {other}"))),
    };

    let x = AxisPosition::parse(&x).map_err(|e| subtitle_error(index, e))?;
    let y = AxisPosition::parse(&y).map_err(|e| subtitle_error(index, e))?;
    Ok((x, y))
}

/// Decode `subtitles_json`, given either as a JSON string or an inline array
fn raw_subtitles(value: Option<&Value>) -> Result<Vec<RawSubtitle>, NodeError> {
    let invalid = |e: serde_json::Error| {
        NodeError::InvalidParameter(format!("subtitles_json is not a valid subtitle list: {e}"))
    };

    match value {
        None => Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => serde_json::from_str(s)
            // Strings that went through one extra round of escaping
            .or_else(|_| serde_json::from_str(&s.replace("\\\"", "\"")))
            .map_err(invalid),
        Some(value @ Value::Array(_)) => {
            Vec::<RawSubtitle>::deserialize(value).map_err(invalid)
        }
        Some(other) => Err(NodeError::InvalidParameter(format!(
            "subtitles_json must be a JSON list, got {other}"
        ))),
    }
}

fn parse_subtitles(value: Option<&Value>, font: Option<&str>) -> Result<Vec<Subtitle>, NodeError> {
    raw_subtitles(value)?
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            if raw.start < 0.0 || raw.end <= raw.start {
                return Err(subtitle_error(
                    i,
                    format!("end ({}) must be after start ({})", raw.end, raw.start),
                ));
            }
            let font_size = raw.font_size.unwrap_or(SUBTITLE_FONT_SIZE);
            if font_size <= 0.0 {
                return Err(subtitle_error(i, "font_size must be positive"));
            }
            let color = match raw.color.as_deref() {
                Some(c) => parse_color(c).map_err(|e| subtitle_error(i, e))?,
                None => WHITE,
            };
            let background = parse_color(raw.bg_color.as_deref().unwrap_or(SUBTITLE_BACKGROUND))
                .map_err(|e| subtitle_error(i, e))?;
            let (x, y) = parse_position(i, raw.position.as_ref())?;

            Ok(Subtitle {
                card: TextCard::builder()
                    .text(raw.text)
                    .maybe_font_name(font.map(str::to_string))
                    .font_size(font_size as f32)
                    .color(color)
                    .background(background)
                    .build(),
                x,
                y,
                start: raw.start,
                end: raw.end,
            })
        })
        .collect()
}

#[async_trait]
impl NodeHandler for WatermarkHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Watermark
    }

    async fn run(&self, params: Params<'_>) -> Result<Outputs, NodeError> {
        let video_path = params.required_string("video_path", "Video path")?;
        let input = require_file(&video_path, MediaKind::Video, "Input video")?;

        let text = params.string_or("watermark_text", "")?;
        let font = params.string("font")?.filter(|f| !f.trim().is_empty());
        let subtitles = parse_subtitles(params.get("subtitles_json"), font.as_deref())?;
        let start = params.f64_or("start_time", 0.0)?;
        if start < 0.0 {
            return Err(NodeError::InvalidParameter(format!(
                "start_time must not be negative, got {start}"
            )));
        }
        let end = params.f64("end_time")?;
        if let Some(end) = end {
            if start >= end {
                return Err(NodeError::InvalidParameter(format!(
                    "start_time ({start}) must be less than end_time ({end})"
                )));
            }
        }

        let info = probe_video(self.video.as_ref(), &input).await?;
        let end = end.map_or(info.duration, |e| e.min(info.duration));
        if start >= end {
            return Err(NodeError::InvalidParameter(format!(
                "start_time ({start}) is beyond the clip duration ({:.3}s)",
                info.duration
            )));
        }

        let scratch = TempDir::new()
            .map_err(|e| NodeError::Internal(format!("cannot create scratch dir: {e}")))?;
        let mut cards: Vec<(TextCard, PathBuf)> = Vec::new();
        let mut overlays: Vec<TimedOverlay> = Vec::new();

        if !text.is_empty() {
            let image = scratch.path().join("watermark.png");
            let card = TextCard::builder()
                .text(text.clone())
                .maybe_font_name(font.clone())
                .font_size(WATERMARK_FONT_SIZE)
                .color(WHITE)
                .background(WATERMARK_BACKGROUND)
                .build();
            cards.push((card, image.clone()));
            overlays.push(TimedOverlay {
                image,
                x: AxisPosition::Center.expression("W", "w"),
                y: AxisPosition::Far.expression("H", "h"),
                start,
                end,
            });
        }

        for (i, subtitle) in subtitles.into_iter().enumerate() {
            let image = scratch.path().join(format!("subtitle_{i}.png"));
            cards.push((subtitle.card, image.clone()));
            overlays.push(TimedOverlay {
                image,
                x: subtitle.x.expression("W", "w"),
                y: subtitle.y.expression("H", "h"),
                start: subtitle.start,
                end: subtitle.end,
            });
        }

        if !cards.is_empty() {
            debug!(cards = cards.len(), "Rendering overlay cards");
            run_blocking(&self.images, move |backend| {
                cards
                    .iter()
                    .try_for_each(|(card, path)| backend.render_text_card(card, path).map(|_| ()))
            })
            .await?;
        } else {
            info!("No overlays to add, re-encoding original video");
        }

        let output = self.output.allocate("watermarked_", &extension_of(&input));
        info!(
            path = %input.display(),
            overlays = overlays.len(),
            "Watermarking video"
        );

        let job = FfmpegJob::overlay(&input, &overlays, self.encode.clone(), &output);
        encode(self.video.as_ref(), &job, "add watermark to video").await?;

        Ok(output_path_outputs(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{RecordingImage, RecordingVideo, touch};
    use crate::handlers::traits::ErrorKind;
    use serde_json::json;

    fn handler(images: Arc<RecordingImage>, video: Arc<RecordingVideo>, dir: &std::path::Path) -> WatermarkHandler {
        WatermarkHandler::new(images, video, OutputDir::new(dir), EncodeSettings::default())
    }

    #[test]
    fn test_subtitles_from_string_and_array() {
        let from_string = parse_subtitles(
            Some(&json!(r#"[{"text": "Hi", "start": 0, "end": 1.5, "position": ["left", "top"]}]"#)),
            None,
        )
        .unwrap();
        assert_eq!(from_string.len(), 1);
        assert_eq!(from_string[0].x, AxisPosition::Near);
        assert_eq!(from_string[0].y, AxisPosition::Near);
        assert_eq!(from_string[0].card.font_size, 30.0);

        let from_array = parse_subtitles(
            Some(&json!([{"text": "Yo", "start": 1, "end": 2, "position": "right,center", "font_size": 20}])),
            Some("Other.ttf"),
        )
        .unwrap();
        assert_eq!(from_array[0].x, AxisPosition::Far);
        assert_eq!(from_array[0].y, AxisPosition::Center);
        assert_eq!(from_array[0].card.font_name.as_deref(), Some("Other.ttf"));

        assert!(parse_subtitles(Some(&json!("[]")), None).unwrap().is_empty());
        assert!(parse_subtitles(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_escaped_subtitle_string() {
        let escaped = r#"[{\"text\": \"Hi\", \"start\": 0, \"end\": 1}]"#;
        let subs = parse_subtitles(Some(&json!(escaped)), None).unwrap();
        assert_eq!(subs[0].card.text, "Hi");
        assert_eq!((subs[0].x, subs[0].y), (AxisPosition::Center, AxisPosition::Far));
    }

    #[test]
    fn test_malformed_subtitles_rejected() {
        for bad in [
            json!("not json"),
            json!([{"text": "x", "start": 2, "end": 1}]),
            json!([{"text": "x", "start": 0, "end": 1, "position": "middle,bottom"}]),
            json!([{"text": "x", "start": 0, "end": 1, "color": "blurple"}]),
            json!({"text": "x"}),
        ] {
            let err = parse_subtitles(Some(&bad), None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "{bad}");
        }
    }

    #[tokio::test]
    async fn test_watermark_and_subtitle_overlays() {
        let temp = TempDir::new().unwrap();
        let video = touch(temp.path(), "clip.mp4");
        let images = Arc::new(RecordingImage::default());
        let backend = Arc::new(RecordingVideo::with_duration(8.0));
        let node = handler(images.clone(), backend.clone(), temp.path());

        let inputs = json!({"video_path": video}).as_object().cloned().unwrap();
        let config = json!({
            "watermark_text": "(c) medianode",
            "subtitles_json": [{"text": "Hello", "start": 1, "end": 3}],
            "end_time": 100
        })
        .as_object()
        .cloned()
        .unwrap();
        let outputs = node.run(Params::new(&inputs, &config)).await.unwrap();

        assert!(outputs["output_path"].as_str().unwrap().contains("watermarked_"));
        assert_eq!(images.calls(), 2);
        let jobs = backend.jobs();
        let graph = jobs[0].filter_complex.clone().unwrap();
        assert!(graph.contains("overlay=x=(W-w)/2:y=H-h-10:enable='between(t,0.000,8.000)'"));
        assert!(graph.contains("enable='between(t,1.000,3.000)'[vout]"));
        assert_eq!(jobs[0].inputs.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_watermark_window_rejected() {
        let temp = TempDir::new().unwrap();
        let video = touch(temp.path(), "clip.mp4");
        let images = Arc::new(RecordingImage::default());
        let backend = Arc::new(RecordingVideo::with_duration(8.0));
        let node = handler(images.clone(), backend.clone(), temp.path());

        let inputs = json!({"video_path": video, "watermark_text": "wm"}).as_object().cloned().unwrap();

        let config = json!({"start_time": 10, "end_time": 8}).as_object().cloned().unwrap();
        let err = node.run(Params::new(&inputs, &config)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(err.to_string().contains("must be less than end_time"));
        assert_eq!(backend.probes(), 0);

        let config = json!({"start_time": 9}).as_object().cloned().unwrap();
        let err = node.run(Params::new(&inputs, &config)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(err.to_string().contains("beyond the clip duration"));

        assert_eq!(images.calls(), 0);
        assert!(backend.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_no_overlays_reencodes() {
        let temp = TempDir::new().unwrap();
        let video = touch(temp.path(), "clip.mp4");
        let images = Arc::new(RecordingImage::default());
        let backend = Arc::new(RecordingVideo::with_duration(8.0));
        let node = handler(images.clone(), backend.clone(), temp.path());

        let inputs = json!({"video_path": video}).as_object().cloned().unwrap();
        node.run(Params::new(&inputs, &Default::default())).await.unwrap();

        assert_eq!(images.calls(), 0);
        assert!(backend.jobs()[0].filter_complex.is_none());
    }
}
