/// Properties of an opened capture stream.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamMetadata {
    pub width: u32,
    pub height: u32,
    /// Native frame rate; 0.0 when the source does not report one.
    pub fps: f64,
    /// Human-readable device or file name.
    pub source: String,
}

impl StreamMetadata {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let meta = StreamMetadata {
            width: 1280,
            height: 720,
            fps: 30.0,
            source: "/dev/video0".to_string(),
        };
        assert_eq!(meta.dimensions(), (1280, 720));
    }

    #[test]
    fn test_clone_is_equal() {
        let meta = StreamMetadata {
            width: 640,
            height: 480,
            fps: 0.0,
            source: "clip.mp4".to_string(),
        };
        assert_eq!(meta.clone(), meta);
    }
}
