//! Nodes driven through the production registry: real raster engine,
//! local stand-ins for the hosted model APIs, missing media binaries.

use axum::{
    Json, Router,
    extract::Path as UrlPath,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use medianode::config::Config;
use medianode::handlers::{Envelope, NodeRegistry, ValueMap};

struct Fixture {
    temp: TempDir,
    registry: NodeRegistry,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.dir = temp.path().join("output");
        config.video.ffmpeg = PathBuf::from("/nonexistent/ffmpeg");
        config.video.ffprobe = PathBuf::from("/nonexistent/ffprobe");
        config.models.rembg = PathBuf::from("/nonexistent/rembg");
        customize(&mut config);

        let registry = NodeRegistry::from_config(&config).unwrap();
        Self { temp, registry }
    }

    fn output_dir(&self) -> PathBuf {
        self.temp.path().join("output")
    }

    fn output_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.output_dir())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    fn write_png(&self, name: &str, width: u32, height: u32) -> String {
        let path = self.temp.path().join(name);
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 2) as u8, (y * 2) as u8, 90])
        });
        img.save(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn write_file(&self, name: &str) -> String {
        let path = self.temp.path().join(name);
        std::fs::write(&path, b"fixture").unwrap();
        path.to_string_lossy().into_owned()
    }

    async fn run(&self, node: &str, inputs: Value, config: Value) -> Envelope {
        self.registry
            .process(node, object(inputs), object(config))
            .await
    }
}

fn object(value: Value) -> ValueMap {
    value.as_object().cloned().unwrap_or_default()
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_output_dir_created_on_init() {
    let fixture = Fixture::new();
    assert!(fixture.output_dir().is_dir());
}

#[tokio::test]
async fn test_resize_image() {
    let fixture = Fixture::new();
    let image = fixture.write_png("photo.png", 100, 100);

    let envelope = fixture
        .run("resize_image", json!({"image_path": image, "width": 50, "height": 50}), json!({}))
        .await;

    let output = envelope.output_path().expect("resize should succeed");
    let name = Path::new(output).file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("resized_") && name.ends_with(".png"));
    assert!(Path::new(output).starts_with(fixture.output_dir()));

    let resized = image::open(output).unwrap();
    assert_eq!((resized.width(), resized.height()), (50, 50));
}

#[tokio::test]
async fn test_inputs_override_config() {
    let fixture = Fixture::new();
    let image = fixture.write_png("photo.png", 40, 40);

    let envelope = fixture
        .run(
            "resize_image",
            json!({"image_path": image, "width": 10, "height": null}),
            json!({"width": 30, "height": 20}),
        )
        .await;

    let resized = image::open(envelope.output_path().unwrap()).unwrap();
    assert_eq!((resized.width(), resized.height()), (10, 20));
}

#[tokio::test]
async fn test_grayscale_effect() {
    let fixture = Fixture::new();
    let image = fixture.write_png("photo.png", 16, 16);

    let envelope = fixture
        .run("effect_image", json!({"image_path": image}), json!({"effect": "grayscale"}))
        .await;

    let output = envelope.output_path().unwrap();
    assert!(output.contains("effect_grayscale_"));

    let result = image::open(output).unwrap().to_rgb8();
    assert!(result.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
}

#[tokio::test]
async fn test_unknown_effect_writes_nothing() {
    let fixture = Fixture::new();
    let image = fixture.write_png("photo.png", 8, 8);

    let envelope = fixture
        .run("effect_image", json!({"image_path": image, "effect": "vaporwave"}), json!({}))
        .await;

    assert_eq!(envelope.error_message(), Some("Unknown effect: vaporwave"));
    assert!(fixture.output_files().is_empty());
}

#[tokio::test]
async fn test_oversized_requests_are_error_envelopes() {
    let fixture = Fixture::with_config(|config| config.output.max_pixels = 1_000_000);
    let image = fixture.write_png("photo.png", 10, 10);
    let logo = fixture.write_png("logo.png", 10, 10);

    let envelope = fixture
        .run(
            "resize_image",
            json!({"image_path": image, "width": 300_000, "height": 300_000}),
            json!({}),
        )
        .await;
    let message = envelope.error_message().expect("oversized resize must fail");
    assert!(message.contains("exceeds the limit of 1000000 pixels"), "{message}");

    let envelope = fixture
        .run(
            "logo_overlay_image",
            json!({"image_path": image, "logo_path": logo, "logo_scale": 1_000_000.0}),
            json!({}),
        )
        .await;
    let message = envelope.error_message().expect("oversized logo must fail");
    assert!(message.contains("scaled logo"), "{message}");

    assert!(fixture.output_files().is_empty());
}

#[tokio::test]
async fn test_missing_and_misnamed_inputs() {
    let fixture = Fixture::new();

    let envelope = fixture
        .run("effect_image", json!({"image_path": "/no/such/photo.png"}), json!({}))
        .await;
    assert_eq!(
        envelope.error_message(),
        Some("Input image not found: /no/such/photo.png")
    );

    let notes = fixture.write_file("notes.txt");
    let envelope = fixture
        .run("resize_image", json!({"image_path": notes, "width": 5, "height": 5}), json!({}))
        .await;
    let message = envelope.error_message().unwrap();
    assert!(message.starts_with("Invalid image file format"), "{message}");

    assert!(fixture.output_files().is_empty());
}

#[tokio::test]
async fn test_output_paths_are_unique() {
    let fixture = Fixture::new();
    let image = fixture.write_png("photo.png", 12, 12);
    let inputs = json!({"image_path": image, "width": 6, "height": 6});

    let first = fixture.run("resize_image", inputs.clone(), json!({})).await;
    let second = fixture.run("resize_image", inputs, json!({})).await;

    assert_ne!(first.output_path().unwrap(), second.output_path().unwrap());
    assert_eq!(fixture.output_files().len(), 2);
}

#[tokio::test]
async fn test_merge_needs_two_clips() {
    let fixture = Fixture::new();
    let clip = fixture.write_file("a.mp4");

    let envelope = fixture
        .run("merge", json!({"video_paths": [clip]}), json!({}))
        .await;
    assert_eq!(
        envelope.error_message(),
        Some("At least two video paths must be provided for merging.")
    );
}

#[tokio::test]
async fn test_trim_checks_range_before_probing() {
    let fixture = Fixture::new();
    let clip = fixture.write_file("clip.mp4");

    let envelope = fixture
        .run("trim", json!({"video_path": clip, "start_time": 5, "end_time": 2}), json!({}))
        .await;

    // ffprobe does not exist, so reaching it would produce a different error
    let message = envelope.error_message().unwrap();
    assert!(message.contains("must be less than end_time"), "{message}");
}

#[tokio::test]
async fn test_missing_tool_is_error_envelope() {
    let fixture = Fixture::new();
    let clip = fixture.write_file("clip.mp4");

    let envelope = fixture
        .run("trim", json!({"video_path": clip, "end_time": 2}), json!({}))
        .await;
    let message = envelope.error_message().unwrap();
    assert!(message.contains("ffprobe"), "{message}");

    let image = fixture.write_png("photo.jpg", 8, 8);
    let envelope = fixture
        .run("remove_bg_image", json!({"image_path": image}), json!({}))
        .await;
    assert!(!envelope.is_success());
    assert!(fixture.output_files().is_empty());
}

#[tokio::test]
async fn test_caption_requires_api_key() {
    let fixture = Fixture::new();
    let image = fixture.write_png("photo.png", 8, 8);

    let envelope = fixture
        .run("auto_caption_image", json!({"image_path": image}), json!({}))
        .await;
    let message = envelope.error_message().unwrap();
    assert!(message.starts_with("API key is required"), "{message}");
}

#[tokio::test]
async fn test_auto_caption_against_local_service() {
    let router = Router::new().route(
        "/v1beta/models/{call}",
        post(|UrlPath(call): UrlPath<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
            let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
            if key != Some("configured-key") || !call.ends_with(":generateContent") {
                return (StatusCode::FORBIDDEN, Json(json!({"error": "denied"})));
            }
            let mime = body.pointer("/contents/0/parts/1/inline_data/mime_type").cloned();
            assert_eq!(mime, Some(json!("image/png")));
            (
                StatusCode::OK,
                Json(json!({"candidates": [{"content": {"parts": [{"text": " A red square. "}]}}]})),
            )
        }),
    );
    let base = serve(router).await;

    let fixture = Fixture::with_config(|config| {
        config.providers.gemini.endpoint = base.clone();
        config.providers.gemini.api_key = Some("configured-key".to_string());
    });
    let image = fixture.write_png("photo.png", 8, 8);

    let envelope = fixture
        .run("auto_caption_image", json!({"image_path": image}), json!({}))
        .await;
    assert_eq!(
        envelope.outputs().unwrap().get("caption"),
        Some(&json!("A red square."))
    );

    // A per-call key takes precedence over the configured one
    let envelope = fixture
        .run("auto_caption_image", json!({"image_path": image, "api_key": "other"}), json!({}))
        .await;
    assert!(!envelope.is_success());
}

#[tokio::test]
async fn test_generate_image_against_local_service() {
    let router = Router::new()
        .route(
            "/v1/images/generations",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
                assert_eq!(auth, Some("Bearer sk-test"));
                assert_eq!(body["size"], "256x256");
                let host = headers
                    .get("host")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({"data": [{"url": format!("http://{host}/files/cat.png")}]}))
            }),
        )
        .route("/files/cat.png", get(|| async { "PNGDATA" }));
    let base = serve(router).await;

    let fixture = Fixture::with_config(|config| {
        config.providers.openai.endpoint = base.clone();
    });

    let envelope = fixture
        .run(
            "generate_image",
            json!({"prompt": "a cat", "api_key": "sk-test"}),
            json!({"size": "256x256"}),
        )
        .await;

    let outputs = envelope.outputs().expect("generation should succeed");
    assert!(outputs["image_url"].as_str().unwrap().ends_with("/files/cat.png"));

    let saved = outputs["output_path"].as_str().unwrap();
    assert!(Path::new(saved).file_name().unwrap().to_string_lossy().starts_with("gen_"));
    assert_eq!(std::fs::read(saved).unwrap(), b"PNGDATA");
}
