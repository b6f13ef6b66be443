use super::{
    Detection, Detector,
    labels::{self, NAMES_METADATA_KEY},
    postprocess::{self, Candidate, DecodeParams},
    preprocess::{self, Letterbox},
};
use crate::{Error, Result, config::ModelConfig};
use async_trait::async_trait;
use image::DynamicImage;
use ort::{
    execution_providers::CPUExecutionProvider,
    session::{Session, builder::GraphOptimizationLevel},
    value::Value,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// YOLO detector backed by an ONNX Runtime session.
#[derive(Clone)]
pub struct YoloDetector {
    // `Session::run` needs exclusive access
    session: Arc<Mutex<Session>>,
    input_name: String,
    input_size: u32,
    params: DecodeParams,
    labels: Arc<[String]>,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("params", &self.params)
            .field("labels", &self.labels.len())
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let path = &config.path;
        if !path.exists() {
            return Err(Error::model(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        info!("Loading detection model from {}", path.display());

        let session = Session::builder()
            .map_err(|e| Error::model(format!("failed to create session builder: {}", e)))?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| Error::model(format!("failed to set execution provider: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::model(format!("failed to set optimization level: {}", e)))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e| Error::model(format!("failed to set intra threads: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| {
                Error::model(format!("failed to load model from {}: {}", path.display(), e))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| Error::model("model declares no inputs"))?;
        if session.outputs.is_empty() {
            return Err(Error::model("model declares no outputs"));
        }

        let embedded_names = match session.metadata() {
            Ok(metadata) => metadata.custom(NAMES_METADATA_KEY).unwrap_or_else(|e| {
                warn!("Could not read '{}' metadata: {}", NAMES_METADATA_KEY, e);
                None
            }),
            Err(e) => {
                warn!("Could not read model metadata: {}", e);
                None
            }
        };
        let labels = labels::resolve_labels(config, embedded_names.as_deref())?;

        debug!(
            "Model input '{}', {} outputs, {} labels",
            input_name,
            session.outputs.len(),
            labels.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            input_size: config.input_size,
            params: DecodeParams::from(config),
            labels: labels.into(),
        })
    }

    fn run(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let (tensor, letterbox) = preprocess::letterbox(image, self.input_size);
        let input = Value::from_array(tensor)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::inference("model session lock poisoned"))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;
        let output = outputs[0].try_extract_array::<f32>()?;

        let candidates = postprocess::decode_output(output, &self.params)?;

        Ok(to_detections(&candidates, &letterbox, &self.labels))
    }
}

/// Labels canvas-space candidates and maps them back onto the source image.
fn to_detections(
    candidates: &[Candidate],
    letterbox: &Letterbox,
    labels: &[String],
) -> Vec<Detection> {
    candidates
        .iter()
        .map(|c| Detection {
            class_id: c.class_id,
            label: labels::label_for(labels, c.class_id),
            confidence: c.confidence,
            bbox: letterbox.restore(c.bbox),
        })
        .collect()
}

#[async_trait]
impl Detector for YoloDetector {
    async fn detect(&self, image: DynamicImage) -> Result<Vec<Detection>> {
        let detector = self.clone();
        tokio::task::spawn_blocking(move || detector.run(&image))
            .await
            .map_err(|e| Error::internal(format!("inference task failed: {}", e)))?
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}
