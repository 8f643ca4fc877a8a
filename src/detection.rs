use std::{path::Path, sync::Arc};

use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::Rng;
use serde::Serialize;

use crate::catalog::DiseaseCatalog;
use crate::error::ClassifyError;
use crate::model::{classify_path, Classifier, Prediction};
use crate::rotator::RecommendationRotator;

pub const SIMULATION_NOTE: &str = "SIMULATION MODE";

/// Healthy leaves are sampled twice as often as each disease.
const SIMULATION_WEIGHTS: [u32; 4] = [20, 20, 20, 40];
const SIMULATION_CONFIDENCE: std::ops::RangeInclusive<f32> = 0.88..=0.99;

#[derive(Debug, Clone, Serialize)]
pub struct DetectionResponse {
    pub class_id: usize,
    pub disease: String,
    pub confidence: f32,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub struct Detector {
    classifier: Option<Arc<dyn Classifier>>,
    catalog: Arc<DiseaseCatalog>,
    rotator: RecommendationRotator,
}

impl Detector {
    pub fn new(classifier: Option<Arc<dyn Classifier>>, catalog: Arc<DiseaseCatalog>) -> Self {
        let rotator = RecommendationRotator::new(catalog.clone());
        Detector {
            classifier,
            catalog,
            rotator,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn predict(&self, image_data: &[u8]) -> Result<Prediction, ClassifyError> {
        self.classifier
            .as_ref()
            .ok_or(ClassifyError::ModelNotLoaded)?
            .classify(image_data)
    }

    pub fn classify_path(&self, path: &Path) -> Result<Prediction, ClassifyError> {
        let classifier = self.classifier.as_ref().ok_or(ClassifyError::ModelNotLoaded)?;
        classify_path(&**classifier, path)
    }

    pub fn detect(&self, image_data: &[u8]) -> Result<DetectionResponse, ClassifyError> {
        let prediction = self.predict(image_data)?;
        Ok(self.describe(prediction))
    }

    /// Names a prediction and attaches the next pair of recommendations.
    pub fn describe(&self, prediction: Prediction) -> DetectionResponse {
        log::info!(
            "🌿 Predicted class {} with confidence {:.3}",
            prediction.class_id,
            prediction.confidence
        );
        self.respond(prediction.class_id, prediction.confidence, None)
    }

    /// Stand-in answer used while no classifier is available.
    pub fn simulate(&self) -> DetectionResponse {
        let class_ids = self.catalog.class_ids();
        let mut rng = rand::rng();

        let class_id = if class_ids.len() == SIMULATION_WEIGHTS.len() {
            match WeightedIndex::new(SIMULATION_WEIGHTS) {
                Ok(dist) => class_ids[dist.sample(&mut rng)],
                Err(_) => class_ids[rng.random_range(0..class_ids.len())],
            }
        } else if class_ids.is_empty() {
            0
        } else {
            class_ids[rng.random_range(0..class_ids.len())]
        };
        let confidence = rng.random_range(SIMULATION_CONFIDENCE);

        self.respond(class_id, confidence, Some(SIMULATION_NOTE.to_string()))
    }

    #[cfg(test)]
    pub fn rotator(&self) -> &RecommendationRotator {
        &self.rotator
    }

    fn respond(&self, class_id: usize, confidence: f32, note: Option<String>) -> DetectionResponse {
        DetectionResponse {
            class_id,
            disease: self.catalog.disease_name(class_id).to_string(),
            confidence,
            recommendations: self.rotator.next(class_id),
            note,
        }
    }
}
