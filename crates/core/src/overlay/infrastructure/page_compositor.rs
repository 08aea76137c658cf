use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detection::domain::class_label::Rgba;
use crate::overlay::domain::layout_context::{LayoutContext, PixelBox};
use crate::overlay::domain::overlay_element::OverlayElement;
use crate::shared::constants::HIGHLIGHTER_BORDER;
use crate::shared::frame::Frame;

const PAGE_BACKGROUND: [u8; 3] = [24, 24, 24];
const CAPTION_HEIGHT: i32 = 18;
const CAPTION_TEXT_SCALE: f32 = 14.0;
const CAPTION_TEXT_COLOR: [u8; 3] = [255, 255, 255];

/// Rasterizes the page: the video placed per the layout, overlays on top.
///
/// Captions are drawn as background bars; their text is rendered only when
/// a TrueType font has been loaded.
pub struct PageCompositor {
    layout: LayoutContext,
    font: Option<FontVec>,
}

impl PageCompositor {
    pub fn new(layout: LayoutContext) -> Self {
        Self { layout, font: None }
    }

    pub fn with_font_file(mut self, path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)?;
        self.font = Some(FontVec::try_from_vec(bytes)?);
        Ok(self)
    }

    /// Composes one page. The result has the viewport's dimensions and the
    /// frame's index.
    pub fn compose(&self, frame: &Frame, overlays: &[&OverlayElement]) -> Frame {
        let l = &self.layout;
        let mut canvas = RgbImage::from_pixel(l.viewport_width, l.viewport_height, Rgb(PAGE_BACKGROUND));

        let video = frame.resized(l.display_width, l.display_height);
        blit(&mut canvas, &video, l.video_left, l.video_top);

        for element in overlays {
            match element {
                OverlayElement::Highlighter { rect, color } => {
                    self.draw_highlighter(&mut canvas, rect, color)
                }
                OverlayElement::Caption {
                    text,
                    left,
                    top,
                    width,
                    background,
                } => self.draw_caption(&mut canvas, text, *left, *top, *width, background),
            }
        }

        Frame::new(canvas.into_raw(), l.viewport_width, l.viewport_height, 3, frame.index())
    }

    fn draw_highlighter(&self, canvas: &mut RgbImage, rect: &PixelBox, color: &Rgba) {
        let px = Rgb([color.r, color.g, color.b]);
        // Pull far-off edges in to just outside the canvas so the border stays
        // off-page and imageproc never sees coordinates near the i32 limits.
        let margin = HIGHLIGHTER_BORDER as i64 + 1;
        let clip_x = |v: i64| v.clamp(-margin, canvas.width() as i64 + margin);
        let clip_y = |v: i64| v.clamp(-margin, canvas.height() as i64 + margin);
        let left = clip_x(rect.left as i64);
        let top = clip_y(rect.top as i64);
        let right = clip_x(rect.left as i64 + rect.width as i64);
        let bottom = clip_y(rect.top as i64 + rect.height as i64);

        for inset in 0..HIGHLIGHTER_BORDER as i64 {
            let w = right - left - 2 * inset;
            let h = bottom - top - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let r = Rect::at((left + inset) as i32, (top + inset) as i32).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, r, px);
        }
    }

    fn draw_caption(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        left: i32,
        top: i32,
        width: i32,
        background: &Rgba,
    ) {
        if width > 0 {
            fill_blended(canvas, left, top, width, CAPTION_HEIGHT, background);
        }
        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                Rgb(CAPTION_TEXT_COLOR),
                left.saturating_add(2),
                top.saturating_add(2),
                PxScale::from(CAPTION_TEXT_SCALE),
                font,
                text,
            );
        }
    }
}

/// Copies `src` onto `canvas` at `(x, y)`, clipping at the canvas edges.
fn blit(canvas: &mut RgbImage, src: &Frame, x: i32, y: i32) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let sw = src.width() as i64;
    let data = src.data();
    for row in 0..src.height() as i64 {
        let ty = y as i64 + row;
        if ty < 0 || ty >= ch {
            continue;
        }
        for col in 0..sw {
            let tx = x as i64 + col;
            if tx < 0 || tx >= cw {
                continue;
            }
            let i = ((row * sw + col) * 3) as usize;
            canvas.put_pixel(tx as u32, ty as u32, Rgb([data[i], data[i + 1], data[i + 2]]));
        }
    }
}

fn fill_blended(canvas: &mut RgbImage, left: i32, top: i32, width: i32, height: i32, color: &Rgba) {
    let clip = |v: i64, max: u32| v.clamp(0, max as i64) as u32;
    let x0 = clip(left as i64, canvas.width());
    let y0 = clip(top as i64, canvas.height());
    let x1 = clip(left as i64 + width as i64, canvas.width());
    let y1 = clip(top as i64 + height as i64, canvas.height());
    for y in y0..y1 {
        for x in x0..x1 {
            let px = canvas.get_pixel_mut(x, y);
            px.0 = color.blend_over(px.0);
        }
    }
}
