pub mod model_resolver;
pub mod onnx_mask_detector;
pub mod output_binding;
