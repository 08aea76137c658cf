pub mod ffmpeg_frame_source;
pub mod frame_clocks;
