use crate::detection::domain::mask_detector::DetectionError;

/// One detection's box in normalized `[0, 1]` frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBox {
    pub min_y: f32,
    pub min_x: f32,
    pub max_y: f32,
    pub max_x: f32,
}

impl NormalizedBox {
    pub fn is_finite(&self) -> bool {
        [self.min_y, self.min_x, self.max_y, self.max_x]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Model output for a single frame: parallel boxes, class indices and scores.
///
/// `boxes` is flattened as `[min_y, min_x, max_y, max_x]` per detection, so
/// `boxes.len() == 4 * scores.len() == 4 * class_indices.len()` always holds.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionFrame {
    boxes: Vec<f32>,
    class_indices: Vec<i32>,
    scores: Vec<f32>,
}

impl DetectionFrame {
    pub fn new(
        boxes: Vec<f32>,
        class_indices: Vec<i32>,
        scores: Vec<f32>,
    ) -> Result<Self, DetectionError> {
        if boxes.len() != scores.len() * 4 || class_indices.len() != scores.len() {
            return Err(DetectionError::MalformedFrame {
                boxes: boxes.len(),
                classes: class_indices.len(),
                scores: scores.len(),
            });
        }
        Ok(Self {
            boxes,
            class_indices,
            scores,
        })
    }

    pub fn empty() -> Self {
        Self {
            boxes: Vec::new(),
            class_indices: Vec::new(),
            scores: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn boxes(&self) -> &[f32] {
        &self.boxes
    }

    pub fn class_indices(&self) -> &[i32] {
        &self.class_indices
    }

    /// Box of detection `i`. Panics if `i >= len()`.
    pub fn box_at(&self, i: usize) -> NormalizedBox {
        let b = &self.boxes[i * 4..i * 4 + 4];
        NormalizedBox {
            min_y: b[0],
            min_x: b[1],
            max_y: b[2],
            max_x: b[3],
        }
    }

    /// Confidence of detection `i` as a percentage.
    pub fn score_percent(&self, i: usize) -> f32 {
        self.scores[i] * 100.0
    }
}
