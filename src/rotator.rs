use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::catalog::DiseaseCatalog;

const WINDOW: usize = 2;

/// Serves recommendations for a class two at a time, moving to the next pair
/// on every call and wrapping around at the end of the list.
///
/// Each class has its own counter. Counters are atomic, so concurrent
/// detections of the same class never receive the same window twice in a row.
pub struct RecommendationRotator {
    catalog: Arc<DiseaseCatalog>,
    counters: Vec<AtomicUsize>,
}

impl RecommendationRotator {
    pub fn new(catalog: Arc<DiseaseCatalog>) -> Self {
        let counters = (0..catalog.len()).map(|_| AtomicUsize::new(0)).collect();
        RecommendationRotator { catalog, counters }
    }

    pub fn next(&self, class_id: usize) -> Vec<String> {
        let Some(slot) = self.slot(class_id) else {
            return Vec::new();
        };
        let recommendations = &self.catalog.classes()[slot].recommendations;
        if recommendations.is_empty() {
            return Vec::new();
        }

        let idx = self.counters[slot].fetch_add(1, Ordering::Relaxed);
        let start = idx.wrapping_mul(WINDOW) % recommendations.len();

        (0..WINDOW.min(recommendations.len()))
            .map(|offset| recommendations[(start + offset) % recommendations.len()].clone())
            .collect()
    }

    /// Number of windows served so far for `class_id`.
    pub fn position(&self, class_id: usize) -> Option<usize> {
        self.slot(class_id)
            .map(|slot| self.counters[slot].load(Ordering::Relaxed))
    }

    fn slot(&self, class_id: usize) -> Option<usize> {
        self.catalog
            .classes()
            .iter()
            .position(|class| class.id == class_id)
    }
}
