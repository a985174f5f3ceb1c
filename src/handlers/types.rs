use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::traits::NodeError;

/// JSON object used for `inputs`, `config` and `outputs`
pub type ValueMap = Map<String, Value>;

/// Values produced by a successful node call
pub type Outputs = ValueMap;

/// Registry name of every node handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    AutoCaptionImage,
    GenerateImage,
    RemoveObject,
    EffectImage,
    LogoOverlayImage,
    RemoveBgImage,
    ResizeImage,
    TextOverlayImage,
    AddBgm,
    Merge,
    Trim,
    Watermark,
}

impl NodeKind {
    pub const ALL: [NodeKind; 12] = [
        NodeKind::AutoCaptionImage,
        NodeKind::GenerateImage,
        NodeKind::RemoveObject,
        NodeKind::EffectImage,
        NodeKind::LogoOverlayImage,
        NodeKind::RemoveBgImage,
        NodeKind::ResizeImage,
        NodeKind::TextOverlayImage,
        NodeKind::AddBgm,
        NodeKind::Merge,
        NodeKind::Trim,
        NodeKind::Watermark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::AutoCaptionImage => "auto_caption_image",
            NodeKind::GenerateImage => "generate_image",
            NodeKind::RemoveObject => "remove_object",
            NodeKind::EffectImage => "effect_image",
            NodeKind::LogoOverlayImage => "logo_overlay_image",
            NodeKind::RemoveBgImage => "remove_bg_image",
            NodeKind::ResizeImage => "resize_image",
            NodeKind::TextOverlayImage => "text_overlay_image",
            NodeKind::AddBgm => "add_bgm",
            NodeKind::Merge => "merge",
            NodeKind::Trim => "trim",
            NodeKind::Watermark => "watermark",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NodeKind::AutoCaptionImage => "Generate a descriptive caption for an image",
            NodeKind::GenerateImage => "Generate an image from a text prompt",
            NodeKind::RemoveObject => "Remove masked objects from an image by inpainting",
            NodeKind::EffectImage => "Apply a visual effect to an image",
            NodeKind::LogoOverlayImage => "Overlay a logo on an image",
            NodeKind::RemoveBgImage => "Remove the background from an image",
            NodeKind::ResizeImage => "Resize an image to exact dimensions",
            NodeKind::TextOverlayImage => "Overlay text on an image",
            NodeKind::AddBgm => "Add background music to a video",
            NodeKind::Merge => "Concatenate video clips",
            NodeKind::Trim => "Trim a video between two timestamps",
            NodeKind::Watermark => "Add a text watermark and subtitles to a video",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown node: {s}"))
    }
}

/// Uniform result of a node call
///
/// Serializes as `{"status": "success", "outputs": {...}}` or
/// `{"status": "error", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success { outputs: Outputs },
    Error { error: String },
}

impl Envelope {
    pub fn from_result(result: Result<Outputs, NodeError>) -> Self {
        match result {
            Ok(outputs) => Envelope::Success { outputs },
            Err(err) => Envelope::Error {
                error: err.to_string(),
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn outputs(&self) -> Option<&Outputs> {
        match self {
            Envelope::Success { outputs } => Some(outputs),
            Envelope::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Envelope::Success { .. } => None,
            Envelope::Error { error } => Some(error),
        }
    }

    /// `outputs.output_path` when present
    pub fn output_path(&self) -> Option<&str> {
        self.outputs()
            .and_then(|outputs| outputs.get("output_path"))
            .and_then(Value::as_str)
    }
}

/// Build the common `{"output_path": ...}` outputs map
pub fn output_path_outputs(path: &Path) -> Outputs {
    let mut outputs = Outputs::new();
    outputs.insert(
        "output_path".to_string(),
        Value::String(path.display().to_string()),
    );
    outputs
}
