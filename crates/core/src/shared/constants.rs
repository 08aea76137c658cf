pub const MASK_MODEL_NAME: &str = "mask_detector.onnx";

/// Minimum confidence percentage a detection must exceed to be drawn.
pub const DEFAULT_THRESHOLD: f32 = 40.0;

/// Target refresh rate of the prediction loop when no fps is configured.
pub const DEFAULT_REFRESH_FPS: f64 = 30.0;

/// Captions sit this many pixels above their box and are this much narrower.
pub const CAPTION_OFFSET: i32 = 10;

/// Border width of a highlighter rectangle.
pub const HIGHLIGHTER_BORDER: u32 = 2;

pub const APP_DIR_NAME: &str = "MaskWatch";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "m4v"];
