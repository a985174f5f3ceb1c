//! CSS-style color parsing for text overlays

use image::Rgba;

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)` or `rgba(r,g,b,a)`
/// (`a` in 0.0..=1.0, channels must fit a byte). Anything else, such as a
/// CSS named color or `hsl()`/`hsla()`, goes to `csscolorparser`.
pub fn parse_color(input: &str) -> Result<Rgba<u8>, String> {
    let s = input.trim().to_ascii_lowercase();

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| format!("invalid hex color '{input}'"));
    }

    if let Some(args) = s.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
        return parse_functional(args, true).ok_or_else(|| format!("invalid color '{input}'"));
    }

    if let Some(args) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        return parse_functional(args, false).ok_or_else(|| format!("invalid color '{input}'"));
    }

    csscolorparser::parse(&s)
        .map(|color| Rgba(color.to_rgba8()))
        .map_err(|e| format!("unknown color '{input}': {e}"))
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

    match hex.len() {
        3 => Some(Rgba([
            nibble(0)? * 17,
            nibble(1)? * 17,
            nibble(2)? * 17,
            255,
        ])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn parse_functional(args: &str, with_alpha: bool) -> Option<Rgba<u8>> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }

    let channel = |s: &str| s.parse::<u8>().ok();
    let alpha = if with_alpha {
        let a: f32 = parts[3].parse().ok()?;
        if !(0.0..=1.0).contains(&a) {
            return None;
        }
        (a * 255.0).round() as u8
    } else {
        255
    };

    Some(Rgba([
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ]))
}

/// Scale the alpha channel of `color` by `opacity` (0.0..=1.0)
pub fn with_opacity(color: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let Rgba([r, g, b, a]) = color;
    let alpha = (f32::from(a) * opacity.clamp(0.0, 1.0)).round() as u8;
    Rgba([r, g, b, alpha])
}
