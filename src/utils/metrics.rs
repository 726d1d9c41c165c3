use crate::algorithms::{SimilarityLookup, UserBasedPredictor};
use crate::error::PredictionError;
use crate::models::RatingEntry;
use serde::{Deserialize, Serialize};

/// Accuracy of held-out predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Share of attempted predictions that produced an estimate.
    pub coverage: f64,
    pub predicted: u64,
    pub no_neighbors: u64,
    pub no_signal: u64,
    pub unknown_user: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    total_abs_error: f64,
    total_sq_error: f64,
    predicted: u64,
    no_neighbors: u64,
    no_signal: u64,
    unknown_user: u64,
}

impl MetricsCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_prediction(&mut self, predicted: f64, actual: f64) {
        let error = predicted - actual;
        self.total_abs_error += error.abs();
        self.total_sq_error += error * error;
        self.predicted += 1;
    }

    pub fn record_failure(&mut self, error: &PredictionError) {
        match error {
            PredictionError::NoNeighbors { .. } => self.no_neighbors += 1,
            PredictionError::NoSignal { .. } => self.no_signal += 1,
            PredictionError::UnknownUser { .. } => self.unknown_user += 1,
        }
    }

    pub fn attempted(&self) -> u64 {
        self.predicted + self.no_neighbors + self.no_signal + self.unknown_user
    }

    pub fn calculate_metrics(&self) -> PredictionMetrics {
        let attempted = self.attempted();

        PredictionMetrics {
            mae: if self.predicted > 0 {
                self.total_abs_error / self.predicted as f64
            } else {
                0.0
            },
            rmse: if self.predicted > 0 {
                (self.total_sq_error / self.predicted as f64).sqrt()
            } else {
                0.0
            },
            coverage: if attempted > 0 {
                self.predicted as f64 / attempted as f64
            } else {
                0.0
            },
            predicted: self.predicted,
            no_neighbors: self.no_neighbors,
            no_signal: self.no_signal,
            unknown_user: self.unknown_user,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Predicts every held-out entry and scores the estimates.
///
/// `adjust` is applied to each raw estimate before scoring, e.g. clamping to
/// the rating scale.
pub fn evaluate<S, F>(predictor: &UserBasedPredictor<'_, S>, test: &[RatingEntry], adjust: F) -> PredictionMetrics
where
    S: SimilarityLookup + ?Sized,
    F: Fn(f64) -> f64,
{
    let mut calculator = MetricsCalculator::new();

    for entry in test {
        match predictor.predict(&entry.user, &entry.item) {
            Ok(prediction) => calculator.record_prediction(adjust(prediction.rating), entry.rating),
            Err(e) => calculator.record_failure(&e),
        }
    }

    calculator.calculate_metrics()
}
