//! Live face-mask detection overlays.
//!
//! Frames flow one way per cycle: a [`FrameSource`](capture::domain::frame_source::FrameSource)
//! produces a frame, a [`MaskDetector`](detection::domain::mask_detector::MaskDetector)
//! turns it into a [`DetectionFrame`](detection::domain::detection_frame::DetectionFrame),
//! and the [`OverlayRenderer`](overlay::domain::overlay_renderer::OverlayRenderer)
//! replaces the overlays on the page before the loop waits for the next refresh.

pub mod capture {
    pub mod domain {
        pub mod frame_clock;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod class_label;
        pub mod detection_frame;
        pub mod mask_detector;
    }
    pub mod infrastructure;
}

pub mod overlay {
    pub mod domain {
        pub mod layout_context;
        pub mod overlay_element;
        pub mod overlay_renderer;
        pub mod overlay_surface;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod capture_controller;
    pub mod frame_sink;
    pub mod infrastructure;
    pub mod model_slot;
    pub mod pipeline_logger;
    pub mod prediction_loop;
    pub mod session;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod stream_metadata;
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
        pub mod video_writer;
    }
    pub mod infrastructure;
}
