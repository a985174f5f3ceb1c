use crate::humanize::ByteSize;
use crate::media::EncodeSettings;
use crate::providers::HttpConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub http: HttpSettings,
}

/// HTTP surface (`medianode serve`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize(1024 * 1024) // 1 MB
}

/// Where generated files are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Largest image (width * height) any node may allocate
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            max_pixels: default_max_pixels(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_max_pixels() -> u64 {
    100_000_000 // 100 megapixels
}

/// TrueType fonts for text overlays and watermarks
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FontsConfig {
    #[serde(default = "default_fonts_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_font")]
    pub default_font: String,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            dir: default_fonts_dir(),
            default_font: default_font(),
        }
    }
}

fn default_fonts_dir() -> PathBuf {
    PathBuf::from("/usr/share/fonts/truetype/dejavu")
}

fn default_font() -> String {
    "DejaVuSans-Bold.ttf".to_string()
}

/// ffmpeg binaries and H.264 encoder settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_crf")]
    pub crf: u8,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default = "default_watermark_threads")]
    pub watermark_threads: u32,
    #[serde(default = "default_watermark_video_bitrate")]
    pub watermark_video_bitrate: String,
    #[serde(default = "default_watermark_audio_bitrate")]
    pub watermark_audio_bitrate: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            preset: default_preset(),
            crf: default_crf(),
            threads: default_threads(),
            watermark_threads: default_watermark_threads(),
            watermark_video_bitrate: default_watermark_video_bitrate(),
            watermark_audio_bitrate: default_watermark_audio_bitrate(),
        }
    }
}

impl VideoConfig {
    /// Settings for trim, merge and background music
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            preset: self.preset.clone(),
            crf: self.crf,
            threads: self.threads,
            ..EncodeSettings::default()
        }
    }

    /// Watermarking additionally targets fixed bitrates
    pub fn watermark_encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            threads: self.watermark_threads,
            video_bitrate: Some(self.watermark_video_bitrate.clone()),
            audio_bitrate: Some(self.watermark_audio_bitrate.clone()),
            ..self.encode_settings()
        }
    }
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_crf() -> u8 {
    23
}

fn default_threads() -> u32 {
    2
}

fn default_watermark_threads() -> u32 {
    4
}

fn default_watermark_video_bitrate() -> String {
    "2000k".to_string()
}

fn default_watermark_audio_bitrate() -> String {
    "192k".to_string()
}

/// Local model runtimes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsConfig {
    #[serde(default = "default_rembg")]
    pub rembg: PathBuf,
    #[serde(default = "default_iopaint")]
    pub iopaint: PathBuf,
    #[serde(default = "default_inpaint_model")]
    pub inpaint_model: String,
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            rembg: default_rembg(),
            iopaint: default_iopaint(),
            inpaint_model: default_inpaint_model(),
            device: default_device(),
        }
    }
}

fn default_rembg() -> PathBuf {
    PathBuf::from("rembg")
}

fn default_iopaint() -> PathBuf {
    PathBuf::from("iopaint")
}

fn default_inpaint_model() -> String {
    "lama".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

/// Hosted model APIs
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Loaded from `GEMINI_API_KEY`, never from the config file
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_gemini_endpoint(),
            model: default_gemini_model(),
            api_key: None,
        }
    }
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Default `WIDTHxHEIGHT` of generated images
    #[serde(default = "default_image_size")]
    pub size: String,
    /// Loaded from `OPENAI_API_KEY`, never from the config file
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            model: default_openai_model(),
            size: default_image_size(),
            api_key: None,
        }
    }
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "dall-e-2".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

/// Outbound HTTP client used by the hosted providers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpSettings {
    pub fn client_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    concat!("medianode/", env!("CARGO_PKG_VERSION")).to_string()
}
