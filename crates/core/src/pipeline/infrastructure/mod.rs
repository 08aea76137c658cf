pub mod composite_video_sink;
pub mod overlay_log_sink;
pub mod snapshot_sink;
