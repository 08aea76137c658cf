use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::overlay::domain::overlay_element::OverlayElement;
use crate::overlay::infrastructure::page_compositor::PageCompositor;
use crate::pipeline::frame_sink::FrameSink;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Saves every `every`-th composited page as `page_<index>.png`.
pub struct SnapshotSink {
    compositor: Arc<PageCompositor>,
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
    every: usize,
    written: usize,
}

impl SnapshotSink {
    pub fn new(
        compositor: Arc<PageCompositor>,
        writer: Box<dyn ImageWriter>,
        dir: &Path,
        every: usize,
    ) -> Self {
        Self {
            compositor,
            writer,
            dir: dir.to_path_buf(),
            every: every.max(1),
            written: 0,
        }
    }

    pub fn snapshot_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("page_{index:06}.png"))
    }
}

impl FrameSink for SnapshotSink {
    fn present(
        &mut self,
        frame: &Frame,
        overlays: &[&OverlayElement],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.index() % self.every != 0 {
            return Ok(());
        }
        let page = self.compositor.compose(frame, overlays);
        self.writer.write(&self.snapshot_path(frame.index()), &page)?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.written > 0 {
            log::info!("Saved {} snapshots to {}", self.written, self.dir.display());
        }
        Ok(())
    }
}
