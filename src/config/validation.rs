use super::models::Config;
use crate::handlers::ai::is_image_size;
use thiserror::Error;

/// x264 presets accepted by `video.preset`
const X264_PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

const MAX_CRF: u8 = 51;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("output.dir must not be empty")]
    EmptyOutputDir,

    #[error("server.max_body_bytes must be positive")]
    InvalidMaxBodyBytes,

    #[error("output.max_pixels must be positive")]
    InvalidMaxPixels,

    #[error("Unknown x264 preset '{0}'")]
    InvalidPreset(String),

    #[error("video.crf ({0}) exceeds maximum of {MAX_CRF}")]
    InvalidCrf(u8),

    #[error("Thread count must be positive: {field}")]
    InvalidThreads { field: String },

    #[error("Bitrate '{value}' for {field} is not of the form <number>[k|M]")]
    InvalidBitrate { field: String, value: String },

    #[error("Invalid endpoint for {provider}: '{endpoint}', expected http:// or https://")]
    InvalidEndpoint { provider: String, endpoint: String },

    #[error("Invalid image size '{0}', expected WIDTHxHEIGHT")]
    InvalidImageSize(String),

    #[error("HTTP timeout must be positive: {field}")]
    InvalidTimeout { field: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_video(config)?;
    validate_providers(config)?;
    validate_http(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.output.dir.as_os_str().is_empty() {
        return Err(ValidationError::EmptyOutputDir);
    }
    if config.server.max_body_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxBodyBytes);
    }
    if config.output.max_pixels == 0 {
        return Err(ValidationError::InvalidMaxPixels);
    }
    Ok(())
}

fn validate_video(config: &Config) -> Result<(), ValidationError> {
    let video = &config.video;

    if !X264_PRESETS.contains(&video.preset.as_str()) {
        return Err(ValidationError::InvalidPreset(video.preset.clone()));
    }
    if video.crf > MAX_CRF {
        return Err(ValidationError::InvalidCrf(video.crf));
    }

    for (field, threads) in [
        ("video.threads", video.threads),
        ("video.watermark_threads", video.watermark_threads),
    ] {
        if threads == 0 {
            return Err(ValidationError::InvalidThreads {
                field: field.to_string(),
            });
        }
    }

    for (field, value) in [
        ("video.watermark_video_bitrate", &video.watermark_video_bitrate),
        ("video.watermark_audio_bitrate", &video.watermark_audio_bitrate),
    ] {
        if !is_bitrate(value) {
            return Err(ValidationError::InvalidBitrate {
                field: field.to_string(),
                value: value.clone(),
            });
        }
    }

    Ok(())
}

/// ffmpeg bitrate such as `192k`, `2M` or `128000`
fn is_bitrate(value: &str) -> bool {
    let digits = value.trim_end_matches(['k', 'K', 'M']);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn validate_providers(config: &Config) -> Result<(), ValidationError> {
    for (provider, endpoint) in [
        ("gemini", &config.providers.gemini.endpoint),
        ("openai", &config.providers.openai.endpoint),
    ] {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ValidationError::InvalidEndpoint {
                provider: provider.to_string(),
                endpoint: endpoint.clone(),
            });
        }
    }

    let size = &config.providers.openai.size;
    if !is_image_size(size) {
        return Err(ValidationError::InvalidImageSize(size.clone()));
    }

    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    for (field, secs) in [
        ("http.connect_timeout_secs", config.http.connect_timeout_secs),
        ("http.request_timeout_secs", config.http.request_timeout_secs),
    ] {
        if secs == 0 {
            return Err(ValidationError::InvalidTimeout {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_output_dir() {
        let mut config = Config::default();
        config.output.dir = PathBuf::new();
        assert!(matches!(validate(&config), Err(ValidationError::EmptyOutputDir)));
    }

    #[test]
    fn test_zero_body_limit() {
        let mut config = Config::default();
        config.server.max_body_bytes = ByteSize(0);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidMaxBodyBytes)
        ));
    }

    #[test]
    fn test_zero_pixel_limit() {
        let mut config = Config::default();
        config.output.max_pixels = 0;
        assert!(matches!(validate(&config), Err(ValidationError::InvalidMaxPixels)));
    }

    #[test]
    fn test_unknown_preset() {
        let mut config = Config::default();
        config.video.preset = "warp".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidPreset(p)) if p == "warp"
        ));
    }

    #[test]
    fn test_crf_limit() {
        let mut config = Config::default();
        config.video.crf = 51;
        assert!(validate(&config).is_ok());

        config.video.crf = 52;
        assert!(matches!(validate(&config), Err(ValidationError::InvalidCrf(52))));
    }

    #[test]
    fn test_zero_threads() {
        let mut config = Config::default();
        config.video.watermark_threads = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("video.watermark_threads"));
    }

    #[test]
    fn test_bitrates() {
        assert!(is_bitrate("192k"));
        assert!(is_bitrate("2M"));
        assert!(is_bitrate("128000"));
        assert!(!is_bitrate("k"));
        assert!(!is_bitrate("fast"));

        let mut config = Config::default();
        config.video.watermark_audio_bitrate = "loud".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidBitrate { .. })
        ));
    }

    #[test]
    fn test_endpoint_scheme() {
        let mut config = Config::default();
        config.providers.openai.endpoint = "ftp://api.example.com".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidEndpoint { provider, .. }) if provider == "openai"
        ));

        config.providers.openai.endpoint = "http://127.0.0.1:9000".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_image_size() {
        let mut config = Config::default();
        config.providers.openai.size = "1024".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidImageSize(_))
        ));
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.http.request_timeout_secs = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidTimeout { .. })
        ));
    }
}
