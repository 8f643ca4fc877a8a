use std::path::Path;

use image::imageops::FilterType;

use crate::error::ClassifyError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class_id: usize,
    pub confidence: f32,
}

impl Prediction {
    /// Picks the most probable class. NaN entries never win.
    pub fn from_probabilities(probabilities: &[f32]) -> Option<Self> {
        probabilities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .fold(None, |best: Option<Prediction>, (class_id, confidence)| match best {
                Some(current) if current.confidence >= confidence => Some(current),
                _ => Some(Prediction {
                    class_id,
                    confidence,
                }),
            })
    }
}

/// A loaded image model that maps raw image bytes to a single class.
pub trait Classifier: Send + Sync {
    fn classify(&self, image_data: &[u8]) -> Result<Prediction, ClassifyError>;
}

pub fn classify_path<C>(
    classifier: &C,
    path: impl AsRef<Path>,
) -> Result<Prediction, ClassifyError>
where
    C: Classifier + ?Sized,
{
    let image_data = std::fs::read(path)?;
    classifier.classify(&image_data)
}

/// Decodes an image, resizes it to `size`x`size` and returns its RGB pixels
/// scaled to `[0, 1]` in row-major HWC order.
pub fn preprocess_image(image_data: &[u8], size: u32) -> Result<Vec<f32>, ClassifyError> {
    let img = image::load_from_memory(image_data)?;
    let resized = img.resize_exact(size, size, FilterType::Nearest).to_rgb8();

    let mut flat_img = Vec::with_capacity(resized.as_raw().len());
    for pixel in resized.pixels() {
        flat_img.push(pixel[0] as f32 / 255.0);
        flat_img.push(pixel[1] as f32 / 255.0);
        flat_img.push(pixel[2] as f32 / 255.0);
    }

    Ok(flat_img)
}

#[cfg(feature = "tensorflow")]
pub use self::tf::TensorflowClassifier;

#[cfg(feature = "tensorflow")]
mod tf {
    use std::{path::Path, sync::Mutex};

    use tensorflow::{
        Graph, Operation, SavedModelBundle, SessionOptions, SessionRunArgs, Tensor,
    };

    use super::{preprocess_image, Classifier, Prediction};
    use crate::error::ClassifyError;

    const SERVE_TAG: &str = "serve";

    struct Endpoint {
        operation: Operation,
        index: i32,
    }

    struct Loaded {
        bundle: SavedModelBundle,
        input: Endpoint,
        output: Endpoint,
    }

    pub struct TensorflowClassifier {
        loaded: Mutex<Loaded>,
        image_size: u32,
    }

    impl TensorflowClassifier {
        /// Loads a SavedModel directory and resolves the first input and output
        /// of `signature`.
        pub fn load(
            model_dir: &Path,
            signature: &str,
            image_size: u32,
        ) -> Result<Self, ClassifyError> {
            let mut graph = Graph::new();
            let bundle =
                SavedModelBundle::load(&SessionOptions::new(), [SERVE_TAG], &mut graph, model_dir)
                    .map_err(inference_error)?;

            let signature_def = bundle
                .meta_graph_def()
                .get_signature(signature)
                .map_err(inference_error)?;

            let input_info = signature_def.inputs().values().next().ok_or_else(|| {
                ClassifyError::Inference(format!("Signature '{}' has no inputs", signature))
            })?;
            let output_info = signature_def.outputs().values().next().ok_or_else(|| {
                ClassifyError::Inference(format!("Signature '{}' has no outputs", signature))
            })?;

            let input = Endpoint {
                operation: graph
                    .operation_by_name_required(&input_info.name().name)
                    .map_err(inference_error)?,
                index: input_info.name().index,
            };
            let output = Endpoint {
                operation: graph
                    .operation_by_name_required(&output_info.name().name)
                    .map_err(inference_error)?,
                index: output_info.name().index,
            };

            log::debug!(
                "Resolved signature '{}': input={}:{} output={}:{}",
                signature,
                input_info.name().name,
                input.index,
                output_info.name().name,
                output.index
            );

            Ok(TensorflowClassifier {
                loaded: Mutex::new(Loaded {
                    bundle,
                    input,
                    output,
                }),
                image_size,
            })
        }
    }

    impl Classifier for TensorflowClassifier {
        fn classify(&self, image_data: &[u8]) -> Result<Prediction, ClassifyError> {
            let pixels = preprocess_image(image_data, self.image_size)?;
            let side = self.image_size as u64;

            let mut input_tensor = Tensor::<f32>::new(&[1, side, side, 3]);
            input_tensor.copy_from_slice(&pixels);

            let loaded = self
                .loaded
                .lock()
                .map_err(|_| ClassifyError::Inference("Model lock poisoned".to_string()))?;

            let mut args = SessionRunArgs::new();
            args.add_feed(&loaded.input.operation, loaded.input.index, &input_tensor);
            let output_token = args.request_fetch(&loaded.output.operation, loaded.output.index);
            loaded
                .bundle
                .session
                .run(&mut args)
                .map_err(inference_error)?;

            let output_tensor: Tensor<f32> = args.fetch(output_token).map_err(inference_error)?;
            Prediction::from_probabilities(&output_tensor).ok_or(ClassifyError::EmptyOutput)
        }
    }

    fn inference_error(status: tensorflow::Status) -> ClassifyError {
        ClassifyError::Inference(status.to_string())
    }
}
