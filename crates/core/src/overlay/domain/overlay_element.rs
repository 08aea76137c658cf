use serde::Serialize;

use crate::detection::domain::class_label::{ClassLabel, Rgba};
use crate::overlay::domain::layout_context::PixelBox;
use crate::shared::constants::CAPTION_OFFSET;

/// Handle of an element appended to an overlay surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ElementId(pub u64);

/// Something drawn on top of the video for one detection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayElement {
    /// Bounding rectangle with a colored border.
    Highlighter { rect: PixelBox, color: Rgba },
    /// Text label with a colored background bar.
    Caption {
        text: String,
        left: i32,
        top: i32,
        width: i32,
        background: Rgba,
    },
}

impl OverlayElement {
    pub fn highlighter(rect: PixelBox, label: ClassLabel) -> Self {
        OverlayElement::Highlighter {
            rect,
            color: label.color(),
        }
    }

    /// Caption placed above `rect`, slightly narrower than it.
    pub fn caption(rect: PixelBox, label: ClassLabel, score_percent: f32) -> Self {
        OverlayElement::Caption {
            text: caption_text(label, score_percent),
            left: rect.left,
            top: rect.top.saturating_sub(CAPTION_OFFSET),
            width: rect.width.saturating_sub(CAPTION_OFFSET),
            background: label.color(),
        }
    }
}

pub fn caption_text(label: ClassLabel, score_percent: f32) -> String {
    format!(
        "{label} - with {} % confidence",
        score_percent.round() as i64
    )
}
