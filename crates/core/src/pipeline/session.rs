use std::sync::Arc;

use crate::overlay::domain::layout_context::LayoutContext;
use crate::pipeline::model_slot::ModelSlot;

/// State shared by everything that runs against one page: the model slot
/// and, once a stream has opened, the layout the video was placed with.
pub struct MaskSession {
    model: Arc<ModelSlot>,
    layout: Option<LayoutContext>,
}

impl MaskSession {
    pub fn new(model: Arc<ModelSlot>) -> Self {
        Self {
            model,
            layout: None,
        }
    }

    pub fn model(&self) -> &Arc<ModelSlot> {
        &self.model
    }

    /// `None` until a stream has been enabled.
    pub fn layout(&self) -> Option<&LayoutContext> {
        self.layout.as_ref()
    }

    /// Stores the layout for the stream being enabled, replacing any earlier
    /// one, and returns the stored value.
    pub fn set_layout(&mut self, layout: LayoutContext) -> &LayoutContext {
        self.layout.insert(layout)
    }
}
