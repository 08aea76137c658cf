/// Mask detector backed by an ONNX Runtime session.
///
/// Expects a TensorFlow object-detection export: a `[1, H, W, 3]` int32 image
/// in, normalized `[min_y, min_x, max_y, max_x]` boxes, 1-based classes and
/// scores out.
use std::path::Path;

use ndarray::{Array4, Axis};

use crate::detection::domain::detection_frame::DetectionFrame;
use crate::detection::domain::mask_detector::{DetectionError, MaskDetector};
use crate::shared::frame::Frame;

use super::output_binding::{DeclaredOutput, OutputBinding, OutputElement};

pub struct OnnxMaskDetector {
    session: ort::session::Session,
    binding: OutputBinding,
    /// Fixed `(width, height)` when the model's input shape is static.
    input_size: Option<(u32, u32)>,
}

impl OnnxMaskDetector {
    /// Load the model and validate its input and output signature.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_shape: Vec<i64> = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    Some(shape.iter().copied().collect())
                } else {
                    None
                }
            })
            .ok_or_else(|| DetectionError::InputShape("model declares no tensor input".into()))?;
        let input_size = static_input_size(&input_shape)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();
        let binding = OutputBinding::resolve(&output_names)?;
        let declared = session
            .outputs()
            .iter()
            .map(|output| declared_output(output.name(), &output.dtype()))
            .collect::<Result<Vec<_>, _>>()?;
        binding.check_signature(&declared)?;

        log::info!(
            "Loaded mask model {} (input {:?}, outputs boxes={} classes={} scores={})",
            model_path.display(),
            input_shape,
            binding.boxes,
            binding.classes,
            binding.scores
        );

        Ok(Self {
            session,
            binding,
            input_size,
        })
    }
}

impl MaskDetector for OnnxMaskDetector {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionFrame, DetectionError> {
        let binding = self.binding;

        // Tensors are owned by this scope and released on every return path.
        let input = match self.input_size {
            Some((w, h)) => to_input_tensor(&frame.resized(w, h)),
            None => to_input_tensor(frame),
        };
        let input_value = ort::value::Tensor::from_array(input).map_err(inference_error)?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(inference_error)?;

        if outputs.len() <= binding.max_index() {
            return Err(DetectionError::OutputSignature(format!(
                "model produced {} outputs, binding needs index {}",
                outputs.len(),
                binding.max_index()
            )));
        }

        let boxes: Vec<f32> = outputs[binding.boxes]
            .try_extract_array::<f32>()
            .map_err(inference_error)?
            .iter()
            .copied()
            .collect();
        let scores: Vec<f32> = outputs[binding.scores]
            .try_extract_array::<f32>()
            .map_err(inference_error)?
            .iter()
            .copied()
            .collect();

        // Exports disagree on the class dtype.
        let class_value = &outputs[binding.classes];
        let classes: Vec<i32> = if let Ok(arr) = class_value.try_extract_array::<f32>() {
            arr.iter().map(|c| c.round() as i32).collect()
        } else if let Ok(arr) = class_value.try_extract_array::<i64>() {
            arr.iter().map(|&c| c as i32).collect()
        } else {
            class_value
                .try_extract_array::<i32>()
                .map_err(inference_error)?
                .iter()
                .copied()
                .collect()
        };

        DetectionFrame::new(boxes, classes, scores)
    }
}

/// Converts an RGB frame to the model's `[1, H, W, 3]` int32 layout.
pub fn to_input_tensor(frame: &Frame) -> Array4<i32> {
    frame
        .as_ndarray()
        .mapv(i32::from)
        .insert_axis(Axis(0))
}

/// Reads `(width, height)` from an NHWC input shape; `None` when either
/// spatial dimension is dynamic.
fn static_input_size(shape: &[i64]) -> Result<Option<(u32, u32)>, DetectionError> {
    if shape.len() != 4 {
        return Err(DetectionError::InputShape(format!(
            "expected rank-4 NHWC input, got {shape:?}"
        )));
    }
    if shape[3] > 0 && shape[3] != 3 {
        return Err(DetectionError::InputShape(format!(
            "expected 3 channels, got {}",
            shape[3]
        )));
    }
    let (h, w) = (shape[1], shape[2]);
    if h > 0 && w > 0 {
        Ok(Some((w as u32, h as u32)))
    } else {
        Ok(None)
    }
}

fn declared_output(
    name: &str,
    dtype: &ort::value::ValueType,
) -> Result<DeclaredOutput, DetectionError> {
    use ort::value::TensorElementType;

    let ort::value::ValueType::Tensor { ty, shape, .. } = dtype else {
        return Err(DetectionError::OutputSignature(format!(
            "output {name} is not a tensor"
        )));
    };
    let element = match ty {
        TensorElementType::Float32 => OutputElement::Float32,
        TensorElementType::Int32 | TensorElementType::Int64 => OutputElement::Integer,
        _ => OutputElement::Other,
    };
    let dims: Vec<i64> = shape.iter().copied().collect();
    Ok(DeclaredOutput::new(&dims, element))
}

/// Platform ONNX execution providers; ONNX Runtime falls back to CPU when
/// none of them is available.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

fn inference_error(e: impl std::fmt::Display) -> DetectionError {
    DetectionError::Inference(e.to_string())
}
