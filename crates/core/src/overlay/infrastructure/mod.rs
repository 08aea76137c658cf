pub mod page_compositor;
pub mod scene_surface;
