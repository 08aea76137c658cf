use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::overlay::domain::overlay_element::OverlayElement;
use crate::pipeline::frame_sink::FrameSink;
use crate::shared::frame::Frame;

#[derive(Serialize)]
struct OverlayRecord<'a> {
    frame: usize,
    overlays: &'a [&'a OverlayElement],
}

/// Writes the visible overlays of every cycle as one JSON object per line.
pub struct OverlayLogSink<W: Write + Send> {
    out: W,
}

impl OverlayLogSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> OverlayLogSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> FrameSink for OverlayLogSink<W> {
    fn present(
        &mut self,
        frame: &Frame,
        overlays: &[&OverlayElement],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let record = OverlayRecord {
            frame: frame.index(),
            overlays,
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.out.flush()?;
        Ok(())
    }
}
