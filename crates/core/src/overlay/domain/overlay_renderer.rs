use crate::detection::domain::class_label::ClassLabel;
use crate::detection::domain::detection_frame::DetectionFrame;
use crate::overlay::domain::layout_context::LayoutContext;
use crate::overlay::domain::overlay_element::{ElementId, OverlayElement};
use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::shared::constants::DEFAULT_THRESHOLD;

/// Turns detections into overlays, keeping exactly one frame's worth of
/// elements on the surface.
pub struct OverlayRenderer {
    threshold: f32,
    overlay_set: Vec<ElementId>,
}

impl OverlayRenderer {
    /// `threshold` is a confidence percentage; detections must score strictly
    /// above it.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            overlay_set: Vec::new(),
        }
    }

    /// Elements currently drawn by this renderer.
    pub fn overlay_set(&self) -> &[ElementId] {
        &self.overlay_set
    }

    /// Replaces the previous frame's overlays with this frame's.
    ///
    /// Returns the number of detections drawn.
    pub fn render(
        &mut self,
        frame: &DetectionFrame,
        layout: &LayoutContext,
        surface: &mut dyn OverlaySurface,
    ) -> usize {
        self.clear(surface);

        let mut drawn = 0;
        for i in 0..frame.len() {
            let score = frame.score_percent(i);
            // 100% is treated as a bogus output, not a confident one.
            if !(score > self.threshold && score < 100.0) {
                continue;
            }

            let class_index = frame.class_indices()[i];
            let Some(label) = ClassLabel::from_class_index(class_index) else {
                log::warn!("Skipping detection {i}: class index {class_index} is out of range");
                continue;
            };

            let b = frame.box_at(i);
            if !b.is_finite() {
                log::warn!("Skipping detection {i}: box {b:?} is not finite");
                continue;
            }

            let rect = layout.map_box(&b);
            self.overlay_set
                .push(surface.append(OverlayElement::highlighter(rect, label)));
            self.overlay_set
                .push(surface.append(OverlayElement::caption(rect, label, score)));
            drawn += 1;
        }
        drawn
    }

    /// Removes every element this renderer drew.
    pub fn clear(&mut self, surface: &mut dyn OverlaySurface) {
        for id in self.overlay_set.drain(..) {
            surface.remove(id);
        }
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
