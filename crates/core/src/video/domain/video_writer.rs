use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

/// Abstracts video encoding so sinks can record pages without depending on
/// a specific codec library.
pub trait VideoWriter: Send {
    /// `metadata` carries the dimensions of the frames that will be written,
    /// which may differ from the capture stream's.
    fn open(
        &mut self,
        path: &Path,
        metadata: &StreamMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
