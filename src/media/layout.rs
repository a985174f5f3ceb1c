//! Placement math for overlays

use serde_json::Value;
use std::str::FromStr;

/// Named anchor point of an overlay inside its canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    TopCenter,
    BottomCenter,
    MiddleLeft,
    MiddleRight,
}

impl Anchor {
    /// Unclamped top-left corner for an item of `item` size on a `canvas`
    fn base(&self, canvas: (i64, i64), item: (i64, i64)) -> (i64, i64) {
        let (cw, ch) = canvas;
        let (w, h) = item;
        let mid_x = (cw - w).div_euclid(2);
        let mid_y = (ch - h).div_euclid(2);

        match self {
            Anchor::Center => (mid_x, mid_y),
            Anchor::TopLeft => (0, 0),
            Anchor::TopRight => (cw - w, 0),
            Anchor::BottomLeft => (0, ch - h),
            Anchor::BottomRight => (cw - w, ch - h),
            Anchor::TopCenter => (mid_x, 0),
            Anchor::BottomCenter => (mid_x, ch - h),
            Anchor::MiddleLeft => (0, mid_y),
            Anchor::MiddleRight => (cw - w, mid_y),
        }
    }
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "center" => Ok(Anchor::Center),
            "top_left" => Ok(Anchor::TopLeft),
            "top_right" => Ok(Anchor::TopRight),
            "bottom_left" => Ok(Anchor::BottomLeft),
            "bottom_right" => Ok(Anchor::BottomRight),
            "top_center" => Ok(Anchor::TopCenter),
            "bottom_center" => Ok(Anchor::BottomCenter),
            "middle_left" => Ok(Anchor::MiddleLeft),
            "middle_right" => Ok(Anchor::MiddleRight),
            other => Err(format!(
                "unknown position '{other}' (expected one of center, top_left, top_right, \
                 bottom_left, bottom_right, top_center, bottom_center, middle_left, middle_right)"
            )),
        }
    }
}

/// Pixel offset added to an anchor point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
}

impl Offset {
    /// Accepts `"(x,y)"`, `"x,y"`, `[x, y]` and `{"x": .., "y": ..}`
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => s.parse(),
            Value::Array(items) if items.len() == 2 => Ok(Offset {
                x: integer(&items[0])?,
                y: integer(&items[1])?,
            }),
            Value::Object(map) => {
                let x = map.get("x").ok_or("missing x")?;
                let y = map.get("y").ok_or("missing y")?;
                Ok(Offset {
                    x: integer(x)?,
                    y: integer(y)?,
                })
            }
            other => Err(format!("expected \"(x,y)\" or [x, y], got {other}")),
        }
    }
}

impl FromStr for Offset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();

        match parts.as_slice() {
            [x, y] => Ok(Offset {
                x: x.parse().map_err(|_| format!("invalid x in offset '{s}'"))?,
                y: y.parse().map_err(|_| format!("invalid y in offset '{s}'"))?,
            }),
            _ => Err(format!("expected \"(x,y)\", got '{s}'")),
        }
    }
}

fn integer(value: &Value) -> Result<i64, String> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .ok_or_else(|| format!("expected an integer, got {value}"))
}

/// Top-left corner of `item` on `canvas`, anchored and offset, then clamped
/// so that the item stays inside the canvas. When the item is larger than
/// the canvas along an axis, that coordinate is 0.
pub fn place(canvas: (u32, u32), item: (u32, u32), anchor: Anchor, offset: Offset) -> (u32, u32) {
    let canvas = (i64::from(canvas.0), i64::from(canvas.1));
    let item = (i64::from(item.0), i64::from(item.1));
    let (bx, by) = anchor.base(canvas, item);

    let x = (bx + offset.x).min(canvas.0 - item.0).max(0);
    let y = (by + offset.y).min(canvas.1 - item.1).max(0);

    // Both are within 0..=u32::MAX after clamping
    (x as u32, y as u32)
}

/// Position along one axis of a video frame, rendered as an ffmpeg overlay
/// expression with a 10 px margin at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPosition {
    Near,
    Center,
    Far,
}

impl AxisPosition {
    pub fn parse(word: &str) -> Result<Self, String> {
        match word.trim() {
            "left" | "top" => Ok(AxisPosition::Near),
            "center" => Ok(AxisPosition::Center),
            "right" | "bottom" => Ok(AxisPosition::Far),
            other => Err(format!(
                "unknown position '{other}' (expected left, right, top, bottom or center)"
            )),
        }
    }

    /// `main` is the frame dimension (`W`/`H`), `overlay` the overlay one (`w`/`h`)
    pub fn expression(&self, main: &str, overlay: &str) -> String {
        match self {
            AxisPosition::Near => "10".to_string(),
            AxisPosition::Center => format!("({main}-{overlay})/2"),
            AxisPosition::Far => format!("{main}-{overlay}-10"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_anchor_points() {
        let canvas = (200, 100);
        let item = (50, 20);
        let zero = Offset::default();

        assert_eq!(place(canvas, item, Anchor::TopLeft, zero), (0, 0));
        assert_eq!(place(canvas, item, Anchor::TopRight, zero), (150, 0));
        assert_eq!(place(canvas, item, Anchor::BottomRight, zero), (150, 80));
        assert_eq!(place(canvas, item, Anchor::Center, zero), (75, 40));
        assert_eq!(place(canvas, item, Anchor::BottomCenter, zero), (75, 80));
        assert_eq!(place(canvas, item, Anchor::MiddleLeft, zero), (0, 40));
    }

    #[test]
    fn test_offset_is_clamped_inside_canvas() {
        let offset = Offset { x: 500, y: -500 };
        assert_eq!(place((200, 100), (50, 20), Anchor::Center, offset), (150, 0));
    }

    #[test]
    fn test_oversized_item_clamps_to_origin() {
        let pos = place((100, 100), (300, 250), Anchor::BottomRight, Offset::default());
        assert_eq!(pos, (0, 0));

        let pos = place((100, 100), (300, 250), Anchor::Center, Offset { x: 40, y: 40 });
        assert_eq!(pos, (0, 0));
    }

    #[test]
    fn test_oversized_on_one_axis() {
        let pos = place((100, 100), (150, 10), Anchor::BottomRight, Offset::default());
        assert_eq!(pos, (0, 90));
    }

    #[test]
    fn test_odd_center_floors() {
        assert_eq!(place((101, 101), (50, 50), Anchor::Center, Offset::default()), (25, 25));
    }

    #[test]
    fn test_anchor_parse() {
        assert_eq!("bottom_right".parse::<Anchor>().unwrap(), Anchor::BottomRight);
        assert!("somewhere".parse::<Anchor>().is_err());
    }

    #[test]
    fn test_offset_parse_forms() {
        assert_eq!("(10,20)".parse::<Offset>().unwrap(), Offset { x: 10, y: 20 });
        assert_eq!(" 5 , -7 ".parse::<Offset>().unwrap(), Offset { x: 5, y: -7 });
        assert!("(1,2,3)".parse::<Offset>().is_err());
        assert!("".parse::<Offset>().is_err());

        assert_eq!(
            Offset::from_value(&json!({"x": 1, "y": 2})).unwrap(),
            Offset { x: 1, y: 2 }
        );
        assert!(Offset::from_value(&json!([1])).is_err());
        assert!(Offset::from_value(&json!(true)).is_err());
    }

    #[test]
    fn test_axis_expressions() {
        assert_eq!(AxisPosition::parse("left").unwrap().expression("W", "w"), "10");
        assert_eq!(
            AxisPosition::parse("center").unwrap().expression("W", "w"),
            "(W-w)/2"
        );
        assert_eq!(
            AxisPosition::parse("bottom").unwrap().expression("H", "h"),
            "H-h-10"
        );
        assert!(AxisPosition::parse("middle").is_err());
    }
}
