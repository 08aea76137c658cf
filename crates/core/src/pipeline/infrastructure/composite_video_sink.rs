use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::overlay::domain::overlay_element::OverlayElement;
use crate::overlay::infrastructure::page_compositor::PageCompositor;
use crate::pipeline::frame_sink::FrameSink;
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Records the composited page as a video.
///
/// The writer is opened on the first presented page, sized to the viewport.
pub struct CompositeVideoSink {
    compositor: Arc<PageCompositor>,
    writer: Box<dyn VideoWriter>,
    path: PathBuf,
    fps: f64,
    opened: bool,
}

impl CompositeVideoSink {
    pub fn new(
        compositor: Arc<PageCompositor>,
        writer: Box<dyn VideoWriter>,
        path: &Path,
        fps: f64,
    ) -> Self {
        Self {
            compositor,
            writer,
            path: path.to_path_buf(),
            fps,
            opened: false,
        }
    }
}

impl FrameSink for CompositeVideoSink {
    fn present(
        &mut self,
        frame: &Frame,
        overlays: &[&OverlayElement],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let page = self.compositor.compose(frame, overlays);
        if !self.opened {
            let metadata = StreamMetadata {
                width: page.width(),
                height: page.height(),
                fps: self.fps,
                source: self.path.display().to_string(),
            };
            self.writer.open(&self.path, &metadata)?;
            self.opened = true;
        }
        self.writer.write(&page)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.opened {
            return Ok(());
        }
        self.opened = false;
        self.writer.close()?;
        log::info!("Recording saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::class_label::ClassLabel;
    use crate::overlay::domain::layout_context::{LayoutContext, LayoutOverrides, PixelBox};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        opened: Vec<StreamMetadata>,
        frames: Vec<Frame>,
        closed: usize,
    }

    struct StubWriter(Arc<Mutex<Recorded>>);

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            _path: &Path,
            metadata: &StreamMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.0.lock().unwrap().opened.push(metadata.clone());
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.0.lock().unwrap().frames.push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.0.lock().unwrap().closed += 1;
            Ok(())
        }
    }

    fn sink() -> (CompositeVideoSink, Arc<Mutex<Recorded>>) {
        let layout = LayoutContext::compute((40, 30), (60, 40), &LayoutOverrides::default());
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let sink = CompositeVideoSink::new(
            Arc::new(PageCompositor::new(layout)),
            Box::new(StubWriter(recorded.clone())),
            Path::new("out.mp4"),
            24.0,
        );
        (sink, recorded)
    }

    #[test]
    fn test_opens_once_at_viewport_size() {
        let (mut sink, recorded) = sink();
        let frame = Frame::filled(40, 30, [1, 1, 1], 0);
        sink.present(&frame, &[]).unwrap();
        sink.present(&frame, &[]).unwrap();
        sink.close().unwrap();

        let rec = recorded.lock().unwrap();
        assert_eq!(rec.opened.len(), 1);
        assert_eq!(rec.opened[0].dimensions(), (60, 40));
        assert_eq!(rec.opened[0].fps, 24.0);
        assert_eq!(rec.frames.len(), 2);
        assert_eq!(rec.closed, 1);
    }

    #[test]
    fn test_pages_include_overlays() {
        let (mut sink, recorded) = sink();
        let el = OverlayElement::highlighter(
            PixelBox {
                left: 10,
                top: 0,
                width: 20,
                height: 20,
            },
            ClassLabel::WithoutMask,
        );
        sink.present(&Frame::filled(40, 30, [0, 0, 0], 0), &[&el])
            .unwrap();

        let rec = recorded.lock().unwrap();
        let c = ClassLabel::WithoutMask.color();
        let i = (10 * 3) as usize;
        assert_eq!(&rec.frames[0].data()[i..i + 3], &[c.r, c.g, c.b]);
    }

    #[test]
    fn test_close_without_frames_does_not_touch_writer() {
        let (mut sink, recorded) = sink();
        sink.close().unwrap();
        assert_eq!(recorded.lock().unwrap().closed, 0);
    }
}
