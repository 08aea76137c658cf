use ndarray::ArrayView3;

/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A uniformly colored RGB frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Bilinear resize to the given dimensions. Returns a copy when the
    /// size already matches.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let Some(img) = image::RgbImage::from_raw(self.width, self.height, self.data.clone())
        else {
            return self.clone();
        };
        let out = image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
        Frame::new(out.into_raw(), width, height, 3, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
