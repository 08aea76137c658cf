use crate::detection::domain::mask_detector::DetectionError;

const BOXES_NAME: &str = "detection_boxes";
const CLASSES_NAME: &str = "detection_classes";
const SCORES_NAME: &str = "detection_scores";

/// Positional layout of TensorFlow object-detection exports that lost their
/// output names during conversion.
const LEGACY_BOXES_INDEX: usize = 4;
const LEGACY_CLASSES_INDEX: usize = 7;
const LEGACY_SCORES_INDEX: usize = 2;
const LEGACY_MIN_OUTPUTS: usize = 8;

/// Element type of a declared model output, as far as extraction cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputElement {
    Float32,
    Integer,
    Other,
}

/// Shape and element type a model declares for one output. Dynamic
/// dimensions are negative.
#[derive(Clone, Debug, PartialEq)]
pub struct DeclaredOutput {
    pub shape: Vec<i64>,
    pub element: OutputElement,
}

impl DeclaredOutput {
    pub fn new(shape: &[i64], element: OutputElement) -> Self {
        Self {
            shape: shape.to_vec(),
            element,
        }
    }
}

/// Which model outputs hold boxes, classes and scores.
///
/// Resolved once when the model loads so a mismatched export fails before
/// the first frame rather than producing garbage overlays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputBinding {
    pub boxes: usize,
    pub classes: usize,
    pub scores: usize,
}

impl OutputBinding {
    /// Binds by output name first, then falls back to the legacy positional
    /// contract when the model declares enough outputs.
    pub fn resolve<S: AsRef<str>>(output_names: &[S]) -> Result<Self, DetectionError> {
        let find = |wanted: &str| {
            output_names
                .iter()
                .position(|name| matches_output(name.as_ref(), wanted))
        };

        if let (Some(boxes), Some(classes), Some(scores)) =
            (find(BOXES_NAME), find(CLASSES_NAME), find(SCORES_NAME))
        {
            return Ok(Self {
                boxes,
                classes,
                scores,
            });
        }

        if output_names.len() >= LEGACY_MIN_OUTPUTS {
            log::warn!(
                "Model outputs are not named {BOXES_NAME}/{CLASSES_NAME}/{SCORES_NAME}; \
                 using positional outputs {LEGACY_BOXES_INDEX}/{LEGACY_CLASSES_INDEX}/{LEGACY_SCORES_INDEX}"
            );
            return Ok(Self {
                boxes: LEGACY_BOXES_INDEX,
                classes: LEGACY_CLASSES_INDEX,
                scores: LEGACY_SCORES_INDEX,
            });
        }

        let names: Vec<&str> = output_names.iter().map(|n| n.as_ref()).collect();
        Err(DetectionError::OutputSignature(format!(
            "expected outputs {BOXES_NAME}, {CLASSES_NAME}, {SCORES_NAME} \
             or at least {LEGACY_MIN_OUTPUTS} positional outputs, got {names:?}"
        )))
    }

    pub fn max_index(&self) -> usize {
        self.boxes.max(self.classes).max(self.scores)
    }

    /// Checks the bound outputs against the detection contract: f32 boxes
    /// shaped `[.., N, 4]`, f32 scores and float or integer classes shaped
    /// `[.., N]`, with `N` agreeing wherever it is static.
    pub fn check_signature(&self, outputs: &[DeclaredOutput]) -> Result<(), DetectionError> {
        let get = |index: usize, role: &str| {
            outputs.get(index).ok_or_else(|| {
                DetectionError::OutputSignature(format!(
                    "{role} bound to output {index}, but the model declares {}",
                    outputs.len()
                ))
            })
        };
        let boxes = get(self.boxes, "boxes")?;
        let classes = get(self.classes, "classes")?;
        let scores = get(self.scores, "scores")?;

        let mismatch = |msg: String| Err(DetectionError::OutputSignature(msg));

        if boxes.element != OutputElement::Float32 {
            return mismatch(format!("boxes must be f32, got {:?}", boxes.element));
        }
        if scores.element != OutputElement::Float32 {
            return mismatch(format!("scores must be f32, got {:?}", scores.element));
        }
        if classes.element == OutputElement::Other {
            return mismatch("classes must be float or integer".to_string());
        }

        let Some((&last, leading)) = boxes.shape.split_last() else {
            return mismatch("boxes output is a scalar".to_string());
        };
        if leading.is_empty() || (last >= 0 && last != 4) {
            return mismatch(format!("boxes must be [.., N, 4], got {:?}", boxes.shape));
        }
        for (role, output) in [("classes", classes), ("scores", scores)] {
            if output.shape.len() != leading.len() {
                return mismatch(format!(
                    "{role} must be [.., N] matching boxes {:?}, got {:?}",
                    boxes.shape, output.shape
                ));
            }
        }

        let n = leading.len() - 1;
        let counts = [leading[n], classes.shape[n], scores.shape[n]];
        let mut static_counts = counts.iter().filter(|&&count| count >= 0);
        if let Some(first) = static_counts.next() {
            if static_counts.any(|count| count != first) {
                return mismatch(format!(
                    "detection counts disagree: boxes {:?}, classes {:?}, scores {:?}",
                    boxes.shape, classes.shape, scores.shape
                ));
            }
        }
        Ok(())
    }
}

/// Exact match, a `:N` tensor suffix, or either under a `scope/` prefix.
fn matches_output(name: &str, wanted: &str) -> bool {
    match name.strip_prefix(wanted) {
        Some("") => true,
        Some(rest) => rest.starts_with(':'),
        None => name
            .rsplit('/')
            .next()
            .is_some_and(|last| last != name && matches_output(last, wanted)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_resolves_by_name() {
        let names = ["num_detections", "detection_scores", "detection_boxes", "detection_classes"];
        let binding = OutputBinding::resolve(&names).unwrap();
        assert_eq!(
            binding,
            OutputBinding {
                boxes: 2,
                classes: 3,
                scores: 1
            }
        );
        assert_eq!(binding.max_index(), 3);
    }

    #[test]
    fn test_resolves_names_with_suffix_and_scope() {
        let names = ["StatefulPartitionedCall/detection_boxes:0", "detection_classes:0", "detection_scores"];
        let binding = OutputBinding::resolve(&names).unwrap();
        assert_eq!(binding.boxes, 0);
        assert_eq!(binding.classes, 1);
        assert_eq!(binding.scores, 2);
    }

    #[test]
    fn test_falls_back_to_legacy_positions() {
        let names: Vec<String> = (0..8).map(|i| format!("Identity_{i}")).collect();
        let binding = OutputBinding::resolve(&names).unwrap();
        assert_eq!(binding.boxes, 4);
        assert_eq!(binding.classes, 7);
        assert_eq!(binding.scores, 2);
    }

    #[test]
    fn test_fails_fast_on_unknown_signature() {
        let names = ["output_0", "output_1", "output_2"];
        let err = OutputBinding::resolve(&names).unwrap_err();
        assert!(matches!(err, DetectionError::OutputSignature(_)));
        assert!(err.to_string().contains("output_0"));
    }

    fn tf_binding() -> OutputBinding {
        OutputBinding {
            boxes: 0,
            classes: 1,
            scores: 2,
        }
    }

    fn outputs(
        boxes: &[i64],
        classes: &[i64],
        scores: &[i64],
        class_element: OutputElement,
    ) -> Vec<DeclaredOutput> {
        vec![
            DeclaredOutput::new(boxes, OutputElement::Float32),
            DeclaredOutput::new(classes, class_element),
            DeclaredOutput::new(scores, OutputElement::Float32),
        ]
    }

    #[rstest]
    #[case::static_batch(&[1, 100, 4], &[1, 100], &[1, 100], OutputElement::Float32)]
    #[case::dynamic_count(&[1, -1, 4], &[1, -1], &[1, -1], OutputElement::Integer)]
    #[case::dynamic_everything(&[-1, -1, -1], &[-1, -1], &[-1, -1], OutputElement::Float32)]
    #[case::unbatched(&[100, 4], &[100], &[100], OutputElement::Integer)]
    fn test_signature_accepted(
        #[case] boxes: &[i64],
        #[case] classes: &[i64],
        #[case] scores: &[i64],
        #[case] class_element: OutputElement,
    ) {
        let declared = outputs(boxes, classes, scores, class_element);
        assert!(tf_binding().check_signature(&declared).is_ok());
    }

    #[rstest]
    #[case::boxes_not_quads(&[1, 100, 5], &[1, 100], &[1, 100])]
    #[case::boxes_rank_one(&[4], &[1], &[1])]
    #[case::scores_rank_mismatch(&[1, 100, 4], &[1, 100], &[1, 100, 1])]
    #[case::classes_rank_mismatch(&[1, 100, 4], &[100], &[1, 100])]
    #[case::count_mismatch(&[1, 100, 4], &[1, 100], &[1, 50])]
    #[case::scalar_boxes(&[], &[1, 100], &[1, 100])]
    fn test_signature_shape_rejected(
        #[case] boxes: &[i64],
        #[case] classes: &[i64],
        #[case] scores: &[i64],
    ) {
        let declared = outputs(boxes, classes, scores, OutputElement::Float32);
        let err = tf_binding().check_signature(&declared).unwrap_err();
        assert!(matches!(err, DetectionError::OutputSignature(_)));
    }

    #[test]
    fn test_signature_rejects_integer_boxes() {
        let mut declared = outputs(&[1, 100, 4], &[1, 100], &[1, 100], OutputElement::Float32);
        declared[0].element = OutputElement::Integer;
        assert!(tf_binding().check_signature(&declared).is_err());
    }

    #[test]
    fn test_signature_rejects_non_numeric_classes() {
        let declared = outputs(&[1, 100, 4], &[1, 100], &[1, 100], OutputElement::Other);
        assert!(tf_binding().check_signature(&declared).is_err());
    }

    #[test]
    fn test_legacy_positions_checked_against_declared_outputs() {
        // Eight outputs named like a converted export but holding scalars at
        // the legacy positions.
        let names: Vec<String> = (0..8).map(|i| format!("Identity_{i}")).collect();
        let binding = OutputBinding::resolve(&names).unwrap();
        let declared: Vec<DeclaredOutput> = (0..8)
            .map(|_| DeclaredOutput::new(&[1], OutputElement::Float32))
            .collect();
        assert!(binding.check_signature(&declared).is_err());
    }

    #[test]
    fn test_binding_past_declared_outputs_is_rejected() {
        let declared = outputs(&[1, 10, 4], &[1, 10], &[1, 10], OutputElement::Float32);
        let binding = OutputBinding {
            boxes: 4,
            classes: 7,
            scores: 2,
        };
        let err = binding.check_signature(&declared).unwrap_err();
        assert!(err.to_string().contains("boxes bound to output 4"));
    }

    #[rstest]
    #[case("detection_boxes", true)]
    #[case("detection_boxes:0", true)]
    #[case("model/detection_boxes", true)]
    #[case("detection_boxes_raw", false)]
    #[case("raw_detection_boxes", false)]
    #[case("boxes", false)]
    fn test_matches_output(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(matches_output(name, "detection_boxes"), expected);
    }
}
