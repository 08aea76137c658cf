use crate::overlay::domain::overlay_element::{ElementId, OverlayElement};
use crate::overlay::domain::overlay_surface::OverlaySurface;

/// Retained in-memory scene: the page's overlay layer.
///
/// Ids are never reused, so a stale id cannot remove a newer element.
#[derive(Debug, Default)]
pub struct SceneSurface {
    elements: Vec<(ElementId, OverlayElement)>,
    next_id: u64,
}

impl SceneSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.iter().any(|(eid, _)| *eid == id)
    }
}

impl OverlaySurface for SceneSurface {
    fn append(&mut self, element: OverlayElement) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.push((id, element));
        id
    }

    fn remove(&mut self, id: ElementId) {
        self.elements.retain(|(eid, _)| *eid != id);
    }

    fn elements(&self) -> Vec<&OverlayElement> {
        self.elements.iter().map(|(_, el)| el).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::class_label::ClassLabel;
    use crate::overlay::domain::layout_context::PixelBox;

    fn element(left: i32) -> OverlayElement {
        OverlayElement::highlighter(
            PixelBox {
                left,
                top: 0,
                width: 10,
                height: 10,
            },
            ClassLabel::WithMask,
        )
    }

    #[test]
    fn test_append_preserves_order() {
        let mut scene = SceneSurface::new();
        scene.append(element(1));
        scene.append(element(2));
        let els = scene.elements();
        assert_eq!(els.len(), 2);
        assert_eq!(*els[0], element(1));
        assert_eq!(*els[1], element(2));
    }

    #[test]
    fn test_remove_by_id() {
        let mut scene = SceneSurface::new();
        let a = scene.append(element(1));
        let b = scene.append(element(2));
        scene.remove(a);
        assert!(!scene.contains(a));
        assert!(scene.contains(b));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut scene = SceneSurface::new();
        scene.append(element(1));
        scene.remove(ElementId(42));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut scene = SceneSurface::new();
        let a = scene.append(element(1));
        scene.remove(a);
        let b = scene.append(element(1));
        assert_ne!(a, b);
        assert_eq!(scene.len(), 1);
    }
}
