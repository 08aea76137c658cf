use serde::Serialize;

use crate::detection::domain::detection_frame::NormalizedBox;

/// A rectangle in page pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PixelBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// Offsets that replace the computed defaults when set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutOverrides {
    pub video_left: Option<i32>,
    pub video_top: Option<i32>,
    pub y_offset: Option<i32>,
}

/// Placement of the video on the page, fixed once the stream opens.
///
/// Normalized model coordinates are scaled by the display size, shifted
/// right by `video_left` and up by `y_offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutContext {
    pub display_width: u32,
    pub display_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub video_left: i32,
    pub video_top: i32,
    pub y_offset: i32,
}

impl LayoutContext {
    /// Derives the layout for a video of `display` size shown on a page of
    /// `viewport` size: centered horizontally, with the vertical start offset
    /// at an eighth of the spare height.
    pub fn compute(display: (u32, u32), viewport: (u32, u32), overrides: &LayoutOverrides) -> Self {
        let (dw, dh) = display;
        let (vw, vh) = viewport;
        let spare_w = vw as i64 - dw as i64;
        let spare_h = vh as i64 - dh as i64;

        let centered_left = spare_w.div_euclid(2).max(0) as i32;
        let start_y = spare_h.div_euclid(8).max(0) as i32;

        Self {
            display_width: dw,
            display_height: dh,
            viewport_width: vw,
            viewport_height: vh,
            video_left: overrides.video_left.unwrap_or(centered_left),
            video_top: overrides.video_top.unwrap_or(0),
            y_offset: overrides.y_offset.unwrap_or(start_y),
        }
    }

    /// Maps a normalized box into page pixels. Coordinates saturate at the
    /// `i32` range.
    pub fn map_box(&self, b: &NormalizedBox) -> PixelBox {
        let w = self.display_width as f64;
        let h = self.display_height as f64;
        let x = |n: f32| (n as f64 * w + self.video_left as f64).round() as i32;
        let y = |n: f32| (n as f64 * h - self.y_offset as f64).round() as i32;

        let left = x(b.min_x);
        let top = y(b.min_y);
        PixelBox {
            left,
            top,
            width: x(b.max_x).saturating_sub(left),
            height: y(b.max_y).saturating_sub(top),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn nbox(min_y: f32, min_x: f32, max_y: f32, max_x: f32) -> NormalizedBox {
        NormalizedBox {
            min_y,
            min_x,
            max_y,
            max_x,
        }
    }

    #[test]
    fn test_same_size_viewport_has_no_offsets() {
        let layout = LayoutContext::compute((640, 480), (640, 480), &LayoutOverrides::default());
        assert_eq!(layout.video_left, 0);
        assert_eq!(layout.video_top, 0);
        assert_eq!(layout.y_offset, 0);
    }

    #[test]
    fn test_larger_viewport_centers_video() {
        let layout = LayoutContext::compute((640, 480), (1280, 800), &LayoutOverrides::default());
        assert_eq!(layout.video_left, 320);
        assert_eq!(layout.y_offset, 40);
        assert_eq!(layout.video_top, 0);
    }

    #[test]
    fn test_smaller_viewport_clamps_offsets_to_zero() {
        let layout = LayoutContext::compute((1920, 1080), (1280, 720), &LayoutOverrides::default());
        assert_eq!(layout.video_left, 0);
        assert_eq!(layout.y_offset, 0);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let overrides = LayoutOverrides {
            video_left: Some(12),
            video_top: Some(30),
            y_offset: Some(-5),
        };
        let layout = LayoutContext::compute((640, 480), (1280, 800), &overrides);
        assert_eq!(layout.video_left, 12);
        assert_eq!(layout.video_top, 30);
        assert_eq!(layout.y_offset, -5);
    }

    #[test]
    fn test_map_box_reference_scenario() {
        let layout = LayoutContext::compute((640, 480), (640, 480), &LayoutOverrides::default());
        let px = layout.map_box(&nbox(0.1, 0.2, 0.4, 0.5));
        assert_eq!(
            px,
            PixelBox {
                left: 128,
                top: 48,
                width: 192,
                height: 144
            }
        );
    }

    #[rstest]
    #[case(0, 0, 128, 48)]
    #[case(100, 0, 228, 48)]
    #[case(0, 20, 128, 28)]
    #[case(50, -10, 178, 58)]
    fn test_map_box_applies_offsets(
        #[case] video_left: i32,
        #[case] y_offset: i32,
        #[case] left: i32,
        #[case] top: i32,
    ) {
        let overrides = LayoutOverrides {
            video_left: Some(video_left),
            y_offset: Some(y_offset),
            ..LayoutOverrides::default()
        };
        let layout = LayoutContext::compute((640, 480), (640, 480), &overrides);
        let px = layout.map_box(&nbox(0.1, 0.2, 0.4, 0.5));
        assert_eq!(px.left, left);
        assert_eq!(px.top, top);
        // Offsets shift both corners, so the size is unchanged.
        assert_eq!(px.width, 192);
        assert_eq!(px.height, 144);
    }

    #[rstest]
    #[case::huge(nbox(-1e30, -1e30, 1e30, 1e30), i32::MIN, i32::MAX)]
    #[case::inverted(nbox(1e30, 1e30, -1e30, -1e30), i32::MAX, i32::MIN)]
    fn test_map_box_saturates_out_of_range_values(
        #[case] b: NormalizedBox,
        #[case] corner: i32,
        #[case] extent: i32,
    ) {
        let layout = LayoutContext::compute((640, 480), (640, 480), &LayoutOverrides::default());
        let px = layout.map_box(&b);
        assert_eq!((px.left, px.top), (corner, corner));
        assert_eq!((px.width, px.height), (extent, extent));
    }

    #[test]
    fn test_map_full_frame_box() {
        let layout = LayoutContext::compute((640, 480), (640, 480), &LayoutOverrides::default());
        let px = layout.map_box(&nbox(0.0, 0.0, 1.0, 1.0));
        assert_eq!((px.left, px.top, px.width, px.height), (0, 0, 640, 480));
    }
}
