use std::fmt;

use serde::Serialize;

/// An RGBA color with alpha in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Alpha-blend this color over an opaque pixel.
    pub fn blend_over(&self, dst: [u8; 3]) -> [u8; 3] {
        let a = self.a.clamp(0.0, 1.0);
        let mix = |src: u8, dst: u8| -> u8 {
            (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8
        };
        [mix(self.r, dst[0]), mix(self.g, dst[1]), mix(self.b, dst[2])]
    }
}

/// The three classes the mask detector was trained on.
///
/// Model outputs index them 1-based; see [`ClassLabel::from_class_index`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassLabel {
    WithMask,
    WithoutMask,
    MaskWornIncorrect,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 3] = [
        ClassLabel::WithMask,
        ClassLabel::WithoutMask,
        ClassLabel::MaskWornIncorrect,
    ];

    /// Resolves a 1-based model class index. Returns `None` when the index
    /// falls outside the label set.
    pub fn from_class_index(index: i32) -> Option<ClassLabel> {
        let zero_based = usize::try_from(index.checked_sub(1)?).ok()?;
        Self::ALL.get(zero_based).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::WithMask => "with_mask",
            ClassLabel::WithoutMask => "without_mask",
            ClassLabel::MaskWornIncorrect => "mask_worn_incorrect",
        }
    }

    pub fn color(&self) -> Rgba {
        match self {
            ClassLabel::WithMask => Rgba::new(10, 190, 25, 0.836),
            ClassLabel::WithoutMask => Rgba::new(236, 37, 2, 0.836),
            ClassLabel::MaskWornIncorrect => Rgba::new(236, 142, 2, 0.836),
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
