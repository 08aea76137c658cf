use std::path::Path;

use crate::shared::constants::DEFAULT_REFRESH_FPS;
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Encodes RGB pages to an MPEG-4 video via ffmpeg-next.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    fps: i32,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            fps: 0,
            frame_count: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn time_base(&self) -> ffmpeg_next::Rational {
        ffmpeg_next::Rational(1, self.fps)
    }

    /// Drains encoded packets into the container.
    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let time_base = self.time_base();
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx
            .stream(0)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer encoder frame rate; camera streams often report none.
fn encoder_fps(fps: f64) -> i32 {
    let rounded = fps.round() as i32;
    if rounded <= 0 {
        DEFAULT_REFRESH_FPS as i32
    } else {
        rounded
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &StreamMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        self.width = metadata.width;
        self.height = metadata.height;
        self.fps = encoder_fps(metadata.fps);

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, self.fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.fps, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;

        log::debug!(
            "Recording {}x{} @ {} fps to {}",
            self.width,
            self.height,
            self.fps,
            path.display()
        );
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "FfmpegWriter: frame is {}x{}, stream is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * 3;
        let data = rgb_frame.data_mut(0);
        let src = frame.data();

        // Destination rows may be padded past width * 3.
        for row in 0..self.height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame)?;
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        Ok(())
    }
}
