use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::capture::domain::frame_source::{CaptureError, FrameSource, StreamRequest};
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

/// Platform capture backend: the ffmpeg input device and its default camera.
#[cfg(target_os = "linux")]
const CAMERA_BACKEND: (&str, &str) = ("video4linux2", "/dev/video0");
#[cfg(target_os = "macos")]
const CAMERA_BACKEND: (&str, &str) = ("avfoundation", "0");
#[cfg(target_os = "windows")]
const CAMERA_BACKEND: (&str, &str) = ("dshow", "video=Integrated Camera");
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAMERA_BACKEND: (&str, &str) = ("video4linux2", "/dev/video0");

/// Pause before re-reading a live device that has no packet ready.
const RETRY_BACKOFF: Duration = Duration::from_millis(1);

#[derive(Clone, Debug)]
enum Input {
    Camera,
    File(PathBuf),
}

/// Pulls RGB frames from a camera or a recorded video through ffmpeg-next.
///
/// Decoding is lazy: one frame is decoded per [`FrameSource::next_frame`]
/// call and nothing is buffered ahead of the consumer.
pub struct FfmpegFrameSource {
    input: Input,
    state: Option<DecodeState>,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    /// Captures from a camera via the platform's ffmpeg input device.
    pub fn camera() -> Self {
        Self {
            input: Input::Camera,
            state: None,
        }
    }

    /// Replays a recorded video as if it were a live stream.
    pub fn file(path: &Path) -> Self {
        Self {
            input: Input::File(path.to_path_buf()),
            state: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self, request: &StreamRequest) -> Result<StreamMetadata, CaptureError> {
        self.close();

        let (ictx, source) = match &self.input {
            Input::Camera => open_camera(request)?,
            Input::File(path) => {
                let label = path.display().to_string();
                ffmpeg_next::init().map_err(|e| unavailable(&label, e))?;
                let ictx = ffmpeg_next::format::input(path).map_err(|e| unavailable(&label, e))?;
                (ictx, label)
            }
        };

        let (state, fps) = DecodeState::new(ictx).map_err(|e| unavailable(&source, e))?;
        let metadata = StreamMetadata {
            width: state.width,
            height: state.height,
            fps,
            source,
        };
        log::info!(
            "Opened {} ({}x{} @ {:.1} fps)",
            metadata.source,
            metadata.width,
            metadata.height,
            metadata.fps
        );

        self.state = Some(state);
        Ok(metadata)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, CaptureError>> {
        match self.state.as_mut() {
            Some(state) => state.next_frame(),
            None => Some(Err(CaptureError::NotOpened)),
        }
    }

    fn close(&mut self) {
        self.state = None;
    }
}

/// Capture devices the platform backend can open by name.
///
/// Only video4linux2 exposes devices as files; on other backends the
/// default camera is reported.
pub fn list_devices() -> Vec<String> {
    let (_, default_device) = CAMERA_BACKEND;
    if cfg!(target_os = "linux") {
        let mut devices: Vec<String> = std::fs::read_dir("/dev")
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.starts_with("video"))
                    })
                    .map(|p| p.display().to_string())
                    .collect()
            })
            .unwrap_or_default();
        devices.sort();
        devices
    } else {
        vec![default_device.to_string()]
    }
}

fn unavailable(device: &str, reason: impl std::fmt::Display) -> CaptureError {
    CaptureError::CameraUnavailable {
        device: device.to_string(),
        reason: reason.to_string(),
    }
}

fn open_camera(
    request: &StreamRequest,
) -> Result<(ffmpeg_next::format::context::Input, String), CaptureError> {
    let (backend, default_device) = CAMERA_BACKEND;
    let device = request
        .device
        .clone()
        .unwrap_or_else(|| default_device.to_string());

    ffmpeg_next::init().map_err(|e| unavailable(&device, e))?;
    ffmpeg_next::device::register_all();

    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == backend)
        .ok_or_else(|| unavailable(&device, format!("{backend} input device not available")))?;

    let mut options = ffmpeg_next::Dictionary::new();
    if let (Some(w), Some(h)) = (request.width, request.height) {
        options.set("video_size", &format!("{w}x{h}"));
    }
    if let Some(fps) = request.fps {
        options.set("framerate", &format!("{fps}"));
    }

    let ictx = ffmpeg_next::format::open_with(&device, &format, options)
        .map_err(|e| unavailable(&device, e))?
        .input();
    Ok((ictx, device))
}

/// Owned decoder pipeline for one opened stream.
struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl DecodeState {
    fn new(
        ictx: ffmpeg_next::format::context::Input,
    ) -> Result<(Self, f64), Box<dyn std::error::Error>> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok((
            Self {
                ictx,
                decoder,
                scaler,
                width,
                height,
                video_stream_index,
                frame_index: 0,
                flushing: false,
                done: false,
            },
            fps,
        ))
    }

    fn try_receive(&mut self) -> Option<Result<Frame, CaptureError>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(CaptureError::Stream(e.to_string())));
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Some(Ok(frame))
    }

    fn next_frame(&mut self) -> Option<Result<Frame, CaptureError>> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                    if let Some(result) = self.try_receive() {
                        return Some(result);
                    }
                    self.done = true;
                    return None;
                }
                Err(e) if is_retryable(&e) => {
                    thread::sleep(RETRY_BACKOFF);
                    continue;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(CaptureError::Stream(e.to_string())));
                }
            }

            if packet.stream() != self.video_stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Live devices report EAGAIN until the next frame is ready.
fn is_retryable(err: &ffmpeg_next::Error) -> bool {
    matches!(err, ffmpeg_next::Error::Other { errno } if *errno == ffmpeg_next::error::EAGAIN)
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping row padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_writer::VideoWriter;
    use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;

    #[test]
    fn test_only_eagain_is_retried() {
        assert!(is_retryable(&ffmpeg_next::Error::Other {
            errno: ffmpeg_next::error::EAGAIN
        }));
        assert!(!is_retryable(&ffmpeg_next::Error::Eof));
        assert!(!is_retryable(&ffmpeg_next::Error::Other {
            errno: ffmpeg_next::error::EIO
        }));
        assert!(RETRY_BACKOFF > Duration::ZERO);
    }

    fn write_test_video(path: &Path, frames: usize, width: u32, height: u32) {
        let meta = StreamMetadata {
            width,
            height,
            fps: 30.0,
            source: "test".to_string(),
        };
        let mut writer = FfmpegWriter::new();
        writer.open(path, &meta).unwrap();
        for i in 0..frames {
            let value = ((i * 40) % 256) as u8;
            writer
                .write(&Frame::filled(width, height, [value, value, value], i))
                .unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn test_file_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 3, 160, 120);

        let mut source = FfmpegFrameSource::file(&path);
        let meta = source.open(&StreamRequest::default()).unwrap();
        assert_eq!(meta.dimensions(), (160, 120));
        assert!(meta.fps > 0.0);
        assert_eq!(meta.source, path.display().to_string());
        assert!(source.is_open());
    }

    #[test]
    fn test_file_yields_every_frame_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 4, 160, 120);

        let mut source = FfmpegFrameSource::file(&path);
        source.open(&StreamRequest::default()).unwrap();

        let mut indices = Vec::new();
        while let Some(frame) = source.next_frame() {
            let frame = frame.unwrap();
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
            indices.push(frame.index());
        }
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let mut source = FfmpegFrameSource::file(Path::new("/nonexistent/clip.mp4"));
        let err = source.open(&StreamRequest::default()).unwrap_err();
        assert!(matches!(err, CaptureError::CameraUnavailable { .. }));
        assert!(!source.is_open());
    }

    #[test]
    fn test_unknown_camera_is_unavailable() {
        let mut source = FfmpegFrameSource::camera();
        let request = StreamRequest {
            device: Some("/nonexistent/video99".to_string()),
            ..StreamRequest::default()
        };
        match source.open(&request) {
            Err(CaptureError::CameraUnavailable { device, .. }) => {
                assert_eq!(device, "/nonexistent/video99")
            }
            other => panic!("expected CameraUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_next_frame_before_open_errors() {
        let mut source = FfmpegFrameSource::camera();
        assert!(matches!(
            source.next_frame(),
            Some(Err(CaptureError::NotOpened))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 1, 64, 48);

        let mut source = FfmpegFrameSource::file(&path);
        source.open(&StreamRequest::default()).unwrap();
        source.close();
        source.close();
        assert!(!source.is_open());
    }

    #[test]
    fn test_list_devices_does_not_panic() {
        let devices = list_devices();
        if !cfg!(target_os = "linux") {
            assert_eq!(devices.len(), 1);
        }
    }
}
