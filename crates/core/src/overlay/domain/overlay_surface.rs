use crate::overlay::domain::overlay_element::{ElementId, OverlayElement};

/// The page overlays are drawn on.
///
/// Elements stay visible until removed; the renderer is the only writer.
pub trait OverlaySurface: Send {
    fn append(&mut self, element: OverlayElement) -> ElementId;

    /// Removing an unknown id is a no-op.
    fn remove(&mut self, id: ElementId);

    /// Visible elements in the order they were appended.
    fn elements(&self) -> Vec<&OverlayElement>;
}
