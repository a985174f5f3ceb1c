use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;

use medianode::handlers::{NodeKind, ValueMap};

#[derive(Parser, Debug)]
#[command(name = "medianode")]
#[command(about = "Image and video processing nodes", long_about = None)]
pub struct Cli {
    /// Configuration file (default: config/medianode.toml or $MEDIANODE_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    #[command(flatten)]
    Node(NodeCommand),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (default: server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

/// One subcommand per node; flags become the node's `inputs`
#[derive(Subcommand, Debug)]
#[command(rename_all = "snake_case")]
pub enum NodeCommand {
    /// Apply a visual effect to an image
    EffectImage(EffectImageArgs),
    /// Resize an image to exact dimensions
    ResizeImage(ResizeImageArgs),
    /// Overlay a logo on an image
    LogoOverlayImage(LogoOverlayArgs),
    /// Overlay text on an image
    TextOverlayImage(TextOverlayArgs),
    /// Remove the background from an image
    RemoveBgImage(ImageArgs),
    /// Remove masked objects from an image
    RemoveObject(RemoveObjectArgs),
    /// Caption an image with a vision model
    AutoCaptionImage(AutoCaptionArgs),
    /// Generate an image from a prompt
    GenerateImage(GenerateImageArgs),
    /// Add background music to a video
    AddBgm(AddBgmArgs),
    /// Concatenate video clips
    Merge(MergeArgs),
    /// Cut a video between two timestamps
    Trim(TrimArgs),
    /// Burn a watermark and subtitles into a video
    Watermark(WatermarkArgs),
}

impl NodeCommand {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeCommand::EffectImage(_) => NodeKind::EffectImage,
            NodeCommand::ResizeImage(_) => NodeKind::ResizeImage,
            NodeCommand::LogoOverlayImage(_) => NodeKind::LogoOverlayImage,
            NodeCommand::TextOverlayImage(_) => NodeKind::TextOverlayImage,
            NodeCommand::RemoveBgImage(_) => NodeKind::RemoveBgImage,
            NodeCommand::RemoveObject(_) => NodeKind::RemoveObject,
            NodeCommand::AutoCaptionImage(_) => NodeKind::AutoCaptionImage,
            NodeCommand::GenerateImage(_) => NodeKind::GenerateImage,
            NodeCommand::AddBgm(_) => NodeKind::AddBgm,
            NodeCommand::Merge(_) => NodeKind::Merge,
            NodeCommand::Trim(_) => NodeKind::Trim,
            NodeCommand::Watermark(_) => NodeKind::Watermark,
        }
    }

    /// Flags that were given, keyed by their node parameter name
    pub fn inputs(&self) -> Result<ValueMap, serde_json::Error> {
        let value = match self {
            NodeCommand::EffectImage(args) => serde_json::to_value(args)?,
            NodeCommand::ResizeImage(args) => serde_json::to_value(args)?,
            NodeCommand::LogoOverlayImage(args) => serde_json::to_value(args)?,
            NodeCommand::TextOverlayImage(args) => serde_json::to_value(args)?,
            NodeCommand::RemoveBgImage(args) => serde_json::to_value(args)?,
            NodeCommand::RemoveObject(args) => serde_json::to_value(args)?,
            NodeCommand::AutoCaptionImage(args) => serde_json::to_value(args)?,
            NodeCommand::GenerateImage(args) => serde_json::to_value(args)?,
            NodeCommand::AddBgm(args) => serde_json::to_value(args)?,
            NodeCommand::Merge(args) => serde_json::to_value(args)?,
            NodeCommand::Trim(args) => serde_json::to_value(args)?,
            NodeCommand::Watermark(args) => serde_json::to_value(args)?,
        };

        Ok(match value {
            Value::Object(map) => map,
            _ => ValueMap::new(),
        })
    }
}

#[derive(Args, Debug, Serialize)]
pub struct ImageArgs {
    #[arg(long = "image_path")]
    pub image_path: String,
}

#[derive(Args, Debug, Serialize)]
pub struct EffectImageArgs {
    #[arg(long = "image_path")]
    pub image_path: String,
    /// grayscale, sepia, invert, contrast or brightness
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

#[derive(Args, Debug, Serialize)]
pub struct ResizeImageArgs {
    #[arg(long = "image_path")]
    pub image_path: String,
    #[arg(long)]
    pub width: u32,
    #[arg(long)]
    pub height: u32,
}

#[derive(Args, Debug, Serialize)]
pub struct LogoOverlayArgs {
    #[arg(long = "image_path")]
    pub image_path: String,
    #[arg(long = "logo_path")]
    pub logo_path: String,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Pixel offset as "x,y"
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[arg(long = "logo_scale")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_scale: Option<f64>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Args, Debug, Serialize)]
pub struct TextOverlayArgs {
    #[arg(long = "image_path")]
    pub image_path: String,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[arg(long = "font_size")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[arg(long = "font_name")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[arg(long = "bg_color")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Pixel offset as "x,y"
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Args, Debug, Serialize)]
pub struct RemoveObjectArgs {
    #[arg(long = "image_path")]
    pub image_path: String,
    #[arg(long = "mask_path")]
    pub mask_path: String,
}

#[derive(Args, Debug, Serialize)]
pub struct AutoCaptionArgs {
    #[arg(long = "image_path")]
    pub image_path: String,
    /// Overrides GEMINI_API_KEY
    #[arg(long = "api_key")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Args, Debug, Serialize)]
pub struct GenerateImageArgs {
    #[arg(long)]
    pub prompt: String,
    /// WIDTHxHEIGHT
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Overrides OPENAI_API_KEY
    #[arg(long = "api_key")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Args, Debug, Serialize)]
pub struct AddBgmArgs {
    #[arg(long = "video_path")]
    pub video_path: String,
    #[arg(long = "music_path")]
    pub music_path: String,
    #[arg(long = "music_volume")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_volume: Option<f64>,
    #[arg(long = "video_volume")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_volume: Option<f64>,
}

#[derive(Args, Debug, Serialize)]
pub struct MergeArgs {
    #[arg(long = "video_paths", num_args = 1..)]
    pub video_paths: Vec<String>,
}

#[derive(Args, Debug, Serialize)]
pub struct TrimArgs {
    #[arg(long = "video_path")]
    pub video_path: String,
    #[arg(long = "start_time")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[arg(long = "end_time")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

#[derive(Args, Debug, Serialize)]
pub struct WatermarkArgs {
    #[arg(long = "video_path")]
    pub video_path: String,
    #[arg(long = "watermark_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_text: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// JSON array of {text, start, end, position, font_size, color, bg_color}
    #[arg(long = "subtitles_json")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitles_json: Option<String>,
    #[arg(long = "start_time")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[arg(long = "end_time")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}
