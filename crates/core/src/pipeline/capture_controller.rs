use thiserror::Error;

use crate::capture::domain::frame_source::{CaptureError, FrameSource, StreamRequest};
use crate::overlay::domain::layout_context::{LayoutContext, LayoutOverrides};
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::pipeline::model_slot::ModelState;
use crate::pipeline::prediction_loop::PredictionLoop;
use crate::pipeline::session::MaskSession;
use crate::shared::constants::DEFAULT_THRESHOLD;

#[derive(Debug, Error)]
pub enum EnableError {
    /// The detector is still loading. Retry once it is ready.
    #[error("mask detector is still loading")]
    ModelNotReady,
    #[error("mask detector failed to load: {0}")]
    ModelFailed(String),
    #[error(transparent)]
    Camera(#[from] CaptureError),
}

/// How the stream should be requested and placed on the page.
#[derive(Clone, Debug)]
pub struct EnableOptions {
    pub request: StreamRequest,
    /// Size the video is displayed at. Defaults to the stream's native size.
    pub display: Option<(u32, u32)>,
    /// Size of the page. Defaults to the display size.
    pub viewport: Option<(u32, u32)>,
    pub overrides: LayoutOverrides,
    /// Confidence percentage detections must exceed to be drawn.
    pub threshold: f32,
}

impl Default for EnableOptions {
    fn default() -> Self {
        Self {
            request: StreamRequest::default(),
            display: None,
            viewport: None,
            overrides: LayoutOverrides::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Owns the frame source and starts prediction loops on it.
pub struct CaptureController {
    source: Box<dyn FrameSource>,
    session: MaskSession,
    options: EnableOptions,
}

impl CaptureController {
    pub fn new(source: Box<dyn FrameSource>, session: MaskSession, options: EnableOptions) -> Self {
        Self {
            source,
            session,
            options,
        }
    }

    pub fn session(&self) -> &MaskSession {
        &self.session
    }

    /// Opens the stream and binds it to the loaded detector.
    ///
    /// Fails with [`EnableError::ModelNotReady`] without touching the camera
    /// while the model is still loading.
    pub fn enable(&mut self) -> Result<PredictionLoop<'_>, EnableError> {
        let detector = match self.session.model().state() {
            ModelState::Loading => return Err(EnableError::ModelNotReady),
            ModelState::Failed(msg) => return Err(EnableError::ModelFailed(msg)),
            ModelState::Ready(detector) => detector,
        };

        let metadata = self.source.open(&self.options.request)?;

        let display = self.options.display.unwrap_or(metadata.dimensions());
        let viewport = self.options.viewport.unwrap_or(display);
        let layout = LayoutContext::compute(display, viewport, &self.options.overrides);
        log::info!(
            "Video {}x{} on a {}x{} page (left {}, top {}, y offset {})",
            layout.display_width,
            layout.display_height,
            layout.viewport_width,
            layout.viewport_height,
            layout.video_left,
            layout.video_top,
            layout.y_offset
        );
        let renderer = OverlayRenderer::new(self.options.threshold);

        Ok(PredictionLoop::new(
            self.source.as_mut(),
            detector,
            renderer,
            self.session.set_layout(layout),
            metadata,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_frame::DetectionFrame;
    use crate::detection::domain::mask_detector::{DetectionError, MaskDetector};
    use crate::pipeline::model_slot::ModelSlot;
    use crate::shared::frame::Frame;
    use crate::shared::stream_metadata::StreamMetadata;
    use std::sync::{Arc, Mutex};

    struct StubSource {
        opened: Arc<Mutex<Vec<StreamRequest>>>,
        fail: bool,
    }

    impl StubSource {
        fn new(fail: bool) -> (Self, Arc<Mutex<Vec<StreamRequest>>>) {
            let opened = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    opened: opened.clone(),
                    fail,
                },
                opened,
            )
        }
    }

    impl FrameSource for StubSource {
        fn open(&mut self, request: &StreamRequest) -> Result<StreamMetadata, CaptureError> {
            self.opened.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(CaptureError::CameraUnavailable {
                    device: "cam".into(),
                    reason: "permission denied".into(),
                });
            }
            Ok(StreamMetadata {
                width: 640,
                height: 480,
                fps: 30.0,
                source: "cam".into(),
            })
        }

        fn next_frame(&mut self) -> Option<Result<Frame, CaptureError>> {
            None
        }

        fn close(&mut self) {}
    }

    struct EmptyDetector;

    impl MaskDetector for EmptyDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<DetectionFrame, DetectionError> {
            Ok(DetectionFrame::empty())
        }
    }

    fn controller(
        slot: Arc<ModelSlot>,
        fail: bool,
        options: EnableOptions,
    ) -> (CaptureController, Arc<Mutex<Vec<StreamRequest>>>) {
        let (source, opened) = StubSource::new(fail);
        (
            CaptureController::new(Box::new(source), MaskSession::new(slot), options),
            opened,
        )
    }

    #[test]
    fn test_enable_before_model_loads_opens_nothing() {
        let (mut ctl, opened) = controller(ModelSlot::new(), false, EnableOptions::default());
        assert!(matches!(ctl.enable(), Err(EnableError::ModelNotReady)));
        assert!(opened.lock().unwrap().is_empty());
        assert!(ctl.session().layout().is_none());
    }

    #[test]
    fn test_enable_after_failed_load() {
        let slot = ModelSlot::new();
        slot.fulfill(Err("corrupt file".into()));
        let (mut ctl, opened) = controller(slot, false, EnableOptions::default());
        match ctl.enable() {
            Err(EnableError::ModelFailed(msg)) => assert_eq!(msg, "corrupt file"),
            Err(other) => panic!("expected ModelFailed, got {other:?}"),
            Ok(_) => panic!("expected ModelFailed"),
        }
        assert!(opened.lock().unwrap().is_empty());
    }

    #[test]
    fn test_retry_succeeds_once_model_is_ready() {
        let slot = ModelSlot::new();
        let (mut ctl, opened) = controller(slot.clone(), false, EnableOptions::default());
        assert!(ctl.enable().is_err());

        slot.fulfill(Ok(Box::new(EmptyDetector)));
        assert!(ctl.enable().is_ok());
        assert_eq!(opened.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_camera_failure_is_surfaced() {
        let slot = ModelSlot::ready(Box::new(EmptyDetector));
        let (mut ctl, _) = controller(slot, true, EnableOptions::default());
        match ctl.enable() {
            Err(EnableError::Camera(CaptureError::CameraUnavailable { reason, .. })) => {
                assert_eq!(reason, "permission denied")
            }
            Err(other) => panic!("expected CameraUnavailable, got {other:?}"),
            Ok(_) => panic!("expected CameraUnavailable"),
        }
    }

    #[test]
    fn test_layout_defaults_to_native_size() {
        let slot = ModelSlot::ready(Box::new(EmptyDetector));
        let (mut ctl, _) = controller(slot, false, EnableOptions::default());
        let layout = *ctl.enable().unwrap().layout();

        assert_eq!((layout.display_width, layout.display_height), (640, 480));
        assert_eq!((layout.viewport_width, layout.viewport_height), (640, 480));
        assert_eq!(ctl.session().layout(), Some(&layout));
    }

    #[test]
    fn test_configured_display_and_viewport() {
        let options = EnableOptions {
            request: StreamRequest {
                device: Some("/dev/video2".into()),
                ..StreamRequest::default()
            },
            display: Some((320, 240)),
            viewport: Some((1024, 768)),
            overrides: LayoutOverrides {
                y_offset: Some(0),
                ..LayoutOverrides::default()
            },
            threshold: 60.0,
        };
        let slot = ModelSlot::ready(Box::new(EmptyDetector));
        let (mut ctl, opened) = controller(slot, false, options);

        let pl = ctl.enable().unwrap();
        let layout = *pl.layout();
        assert_eq!(pl.metadata().dimensions(), (640, 480));
        drop(pl);

        assert_eq!(layout.display_width, 320);
        assert_eq!(layout.viewport_width, 1024);
        assert_eq!(layout.video_left, 352);
        assert_eq!(layout.y_offset, 0);
        assert_eq!(
            opened.lock().unwrap()[0].device.as_deref(),
            Some("/dev/video2")
        );
    }
}
