//! Raster image backend built on `image` and `imageproc`

use ab_glyph::PxScale;
use bon::Builder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use super::color::with_opacity;
use super::fonts::FontLibrary;
use super::layout::{Anchor, Offset, place};
use super::{MediaError, check_pixels};

/// Pixel effects offered by the effect node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Grayscale,
    Sepia,
    Invert,
    Contrast,
    Brightness,
}

impl Effect {
    pub const ALL: [Effect; 5] = [
        Effect::Grayscale,
        Effect::Sepia,
        Effect::Invert,
        Effect::Contrast,
        Effect::Brightness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Grayscale => "grayscale",
            Effect::Sepia => "sepia",
            Effect::Invert => "invert",
            Effect::Contrast => "contrast",
            Effect::Brightness => "brightness",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Effect::ALL
            .into_iter()
            .find(|e| e.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown effect: {s}"))
    }
}

/// Logo placement parameters
#[derive(Debug, Clone, Copy)]
pub struct LogoOverlay {
    pub anchor: Anchor,
    pub offset: Offset,
    pub scale: f32,
    pub opacity: f32,
}

/// Text drawn directly onto an image
#[derive(Debug, Clone)]
pub struct TextOverlay {
    pub text: String,
    pub font_name: Option<String>,
    pub font_size: f32,
    pub color: Rgba<u8>,
    pub background: Option<Rgba<u8>>,
    pub anchor: Anchor,
    pub offset: Offset,
    pub opacity: f32,
}

/// Standalone text label: text centered on a padded background box
#[derive(Debug, Clone, Builder)]
pub struct TextCard {
    #[builder(into)]
    pub text: String,
    pub font_name: Option<String>,
    #[builder(default = 50.0)]
    pub font_size: f32,
    #[builder(default = Rgba([255, 255, 255, 255]))]
    pub color: Rgba<u8>,
    #[builder(default = Rgba([0, 0, 0, 0]))]
    pub background: Rgba<u8>,
    #[builder(default = 10)]
    pub padding: u32,
}

/// Synchronous raster operations; handlers run them on the blocking pool.
pub trait ImageBackend: Send + Sync {
    fn apply_effect(
        &self,
        input: &Path,
        output: &Path,
        effect: Effect,
        intensity: f32,
    ) -> Result<(), MediaError>;

    fn resize(&self, input: &Path, output: &Path, width: u32, height: u32)
    -> Result<(), MediaError>;

    fn overlay_logo(
        &self,
        input: &Path,
        logo: &Path,
        output: &Path,
        spec: &LogoOverlay,
    ) -> Result<(), MediaError>;

    fn overlay_text(&self, input: &Path, output: &Path, spec: &TextOverlay)
    -> Result<(), MediaError>;

    /// Render `card` as a PNG and return its dimensions
    fn render_text_card(&self, card: &TextCard, output: &Path) -> Result<(u32, u32), MediaError>;

    /// Write `mask` as an 8-bit grayscale PNG sized like `reference`
    fn prepare_mask(&self, mask: &Path, reference: &Path, output: &Path)
    -> Result<(), MediaError>;
}

/// Production [`ImageBackend`]
///
/// Every image it allocates (resize target, scaled logo, text card, resized
/// mask) is checked against `max_pixels` first.
#[derive(Debug, Clone)]
pub struct RasterEngine {
    fonts: FontLibrary,
    max_pixels: u64,
}

impl RasterEngine {
    pub fn new(fonts: FontLibrary, max_pixels: u64) -> Self {
        Self { fonts, max_pixels }
    }
}

impl ImageBackend for RasterEngine {
    fn apply_effect(
        &self,
        input: &Path,
        output: &Path,
        effect: Effect,
        intensity: f32,
    ) -> Result<(), MediaError> {
        let img = image::open(input)?;
        debug!(%effect, intensity, "Applying effect");
        save_image(apply_effect_to(&img, effect, intensity), output)
    }

    fn resize(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), MediaError> {
        check_pixels("resize target", width.into(), height.into(), self.max_pixels)?;
        let img = image::open(input)?;
        debug!(width, height, "Resizing image");
        save_image(img.resize_exact(width, height, FilterType::Lanczos3), output)
    }

    fn overlay_logo(
        &self,
        input: &Path,
        logo: &Path,
        output: &Path,
        spec: &LogoOverlay,
    ) -> Result<(), MediaError> {
        let mut canvas = image::open(input)?.to_rgba8();
        let logo = image::open(logo)?.to_rgba8();
        let logo = prepare_logo(logo, spec.scale, spec.opacity, self.max_pixels)?;

        let (x, y) = place(canvas.dimensions(), logo.dimensions(), spec.anchor, spec.offset);
        debug!(x, y, "Placing logo");
        imageops::overlay(&mut canvas, &logo, i64::from(x), i64::from(y));

        save_image(DynamicImage::ImageRgb8(flatten(canvas)), output)
    }

    fn overlay_text(
        &self,
        input: &Path,
        output: &Path,
        spec: &TextOverlay,
    ) -> Result<(), MediaError> {
        let mut canvas = image::open(input)?.to_rgba8();
        let font = self.fonts.load(spec.font_name.as_deref())?;
        let scale = PxScale::from(spec.font_size);
        let (tw, th) = text_size(scale, &font, &spec.text);
        // Glyphs are rasterized at full size before clipping
        check_pixels("text", tw.into(), th.into(), self.max_pixels)?;

        let (x, y) = place(canvas.dimensions(), (tw, th), spec.anchor, spec.offset);
        let color = with_opacity(spec.color, spec.opacity);

        let (w, h) = canvas.dimensions();
        let mut layer = RgbaImage::from_pixel(w, h, Rgba([color[0], color[1], color[2], 0]));
        if let Some(background) = spec.background {
            if tw > 0 && th > 0 {
                let rect = Rect::at(x as i32, y as i32).of_size(tw, th);
                draw_filled_rect_mut(&mut layer, rect, with_opacity(background, spec.opacity));
            }
        }
        draw_text_mut(&mut layer, color, x as i32, y as i32, scale, &font, &spec.text);

        imageops::overlay(&mut canvas, &layer, 0, 0);
        save_image(DynamicImage::ImageRgb8(flatten(canvas)), output)
    }

    fn render_text_card(&self, card: &TextCard, output: &Path) -> Result<(u32, u32), MediaError> {
        let font = self.fonts.load(card.font_name.as_deref())?;
        let scale = PxScale::from(card.font_size);
        let (tw, th) = text_size(scale, &font, &card.text);

        let width = u64::from(tw) + 2 * u64::from(card.padding);
        let height = u64::from(th) + 2 * u64::from(card.padding);
        if width == 0 || height == 0 {
            return Err(MediaError::Invalid("text card has no area".to_string()));
        }
        check_pixels("text card", width, height, self.max_pixels)?;
        let (width, height) = (width as u32, height as u32);

        let mut img = RgbaImage::from_pixel(width, height, card.background);
        let x = (width - tw) / 2;
        let y = (height - th) / 2;
        draw_text_mut(&mut img, card.color, x as i32, y as i32, scale, &font, &card.text);

        img.save_with_format(output, ImageFormat::Png)?;
        Ok((width, height))
    }

    fn prepare_mask(
        &self,
        mask: &Path,
        reference: &Path,
        output: &Path,
    ) -> Result<(), MediaError> {
        let (w, h) = image::image_dimensions(reference)?;
        check_pixels("mask", w.into(), h.into(), self.max_pixels)?;
        let mask = image::open(mask)?.to_luma8();
        let mask = if mask.dimensions() != (w, h) {
            debug!(from = ?mask.dimensions(), to = ?(w, h), "Resizing mask to image size");
            imageops::resize(&mask, w, h, FilterType::Lanczos3)
        } else {
            mask
        };
        mask.save_with_format(output, ImageFormat::Png)?;
        Ok(())
    }
}

/// Scale the logo and multiply its alpha by `opacity`
fn prepare_logo(
    logo: RgbaImage,
    scale: f32,
    opacity: f32,
    max_pixels: u64,
) -> Result<RgbaImage, MediaError> {
    let (lw, lh) = logo.dimensions();
    let new_w = (f64::from(lw) * f64::from(scale)) as u64;
    let new_h = (f64::from(lh) * f64::from(scale)) as u64;
    if new_w == 0 || new_h == 0 {
        return Err(MediaError::Invalid(format!(
            "logo scale {scale} reduces a {lw}x{lh} logo to nothing"
        )));
    }
    check_pixels("scaled logo", new_w, new_h, max_pixels)?;
    let (new_w, new_h) = (new_w as u32, new_h as u32);

    let mut logo = if (new_w, new_h) == (lw, lh) {
        logo
    } else {
        imageops::resize(&logo, new_w, new_h, FilterType::Lanczos3)
    };

    if opacity < 1.0 {
        let opacity = opacity.max(0.0);
        for pixel in logo.pixels_mut() {
            pixel[3] = (f32::from(pixel[3]) * opacity) as u8;
        }
    }

    Ok(logo)
}

/// Drop alpha without compositing against a background
fn flatten(img: RgbaImage) -> RgbImage {
    DynamicImage::ImageRgba8(img).to_rgb8()
}

/// ITU-R 601-2 luma with the same fixed-point rounding as common imaging
/// libraries, so grayscale output matches other tooling bit for bit.
fn luma(Rgb([r, g, b]): Rgb<u8>) -> u8 {
    let (r, g, b) = (u32::from(r), u32::from(g), u32::from(b));
    ((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8
}

fn grayscale(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        image::Luma([luma(*img.get_pixel(x, y))])
    })
}

fn mean_luma(img: &RgbImage) -> f32 {
    let count = u64::from(img.width()) * u64::from(img.height());
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = img.pixels().map(|p| u64::from(luma(*p))).sum();
    (sum as f64 / count as f64 + 0.5).floor() as f32
}

/// `base + factor * (value - base)`, clamped to a byte
fn blend(base: f32, value: u8, factor: f32) -> u8 {
    (base + factor * (f32::from(value) - base)).round().clamp(0.0, 255.0) as u8
}

/// Pure pixel transform behind [`ImageBackend::apply_effect`]
pub fn apply_effect_to(img: &DynamicImage, effect: Effect, intensity: f32) -> DynamicImage {
    let rgb = img.to_rgb8();

    match effect {
        Effect::Grayscale => DynamicImage::ImageLuma8(grayscale(&rgb)),
        Effect::Sepia => {
            // Luma mapped onto a warm brown ramp
            let gray = grayscale(&rgb);
            DynamicImage::ImageRgb8(RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let l = u32::from(gray.get_pixel(x, y)[0]);
                Rgb([
                    (l * 240 / 255) as u8,
                    (l * 200 / 255) as u8,
                    (l * 145 / 255) as u8,
                ])
            }))
        }
        Effect::Invert => {
            let mut out = rgb;
            imageops::invert(&mut out);
            DynamicImage::ImageRgb8(out)
        }
        Effect::Contrast => {
            let mean = mean_luma(&rgb);
            let mut out = rgb;
            for pixel in out.pixels_mut() {
                for channel in pixel.0.iter_mut() {
                    *channel = blend(mean, *channel, intensity);
                }
            }
            DynamicImage::ImageRgb8(out)
        }
        Effect::Brightness => {
            let mut out = rgb;
            for pixel in out.pixels_mut() {
                for channel in pixel.0.iter_mut() {
                    *channel = blend(0.0, *channel, intensity);
                }
            }
            DynamicImage::ImageRgb8(out)
        }
    }
}

/// Save `img` in the format implied by the extension of `path`, converting
/// the color type where the encoder requires it (JPEG has no alpha, GIF is
/// RGBA only).
pub(crate) fn save_image(img: DynamicImage, path: &Path) -> Result<(), MediaError> {
    let format = ImageFormat::from_path(path)?;

    let img = match format {
        ImageFormat::Jpeg => match img.color() {
            ColorType::L8 | ColorType::Rgb8 => img,
            _ => DynamicImage::ImageRgb8(img.to_rgb8()),
        },
        ImageFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8()),
        ImageFormat::Bmp => match img.color() {
            ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => img,
            _ => DynamicImage::ImageRgba8(img.to_rgba8()),
        },
        _ => img,
    };

    img.save_with_format(path, format)?;
    Ok(())
}
