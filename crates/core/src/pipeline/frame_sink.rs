use crate::overlay::domain::overlay_element::OverlayElement;
use crate::shared::frame::Frame;

/// Receives the page after every prediction cycle.
///
/// `frame` is the video frame at display size; `overlays` are the elements
/// visible on the page at that moment.
pub trait FrameSink: Send {
    fn present(
        &mut self,
        frame: &Frame,
        overlays: &[&OverlayElement],
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered output. Called once when the loop ends.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
