pub mod lazy;
pub mod predictor;
pub mod similarity;

pub use lazy::LazySimilarityMatrix;
pub use predictor::{predict, UserBasedPredictor};
pub use similarity::{build, SimilarityMatrixBuilder};

use crate::models::*;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Relative tolerance for zero-variance checks.
///
/// A centered sum of squares at or below `VARIANCE_TOLERANCE` times the raw
/// sum of squares is rounding residue, not variance. The bound scales with
/// the ratings, so tiny but genuinely varying values still correlate.
pub const VARIANCE_TOLERANCE: f64 = f64::EPSILON;

fn has_variance(raw: &DVector<f64>, centered: &DVector<f64>) -> bool {
    centered.norm_squared() > VARIANCE_TOLERANCE * raw.norm_squared()
}

/// A pairwise user similarity computed from a rating matrix.
///
/// Implementations must be symmetric in `u` and `v` and return 0.0 whenever
/// the pair carries no usable signal.
pub trait SimilarityMeasure: Send + Sync {
    fn name(&self) -> &'static str;
    fn similarity(&self, ratings: &RatingMatrix, u: &str, v: &str) -> f64;
}

/// Read access to pairwise similarities, eager or lazily computed.
pub trait SimilarityLookup {
    /// `None` when the pair is unknown or `u == v`.
    fn similarity(&self, u: &str, v: &str) -> Option<f64>;
}

impl SimilarityLookup for SimilarityMatrix {
    fn similarity(&self, u: &str, v: &str) -> Option<f64> {
        self.get(u, v)
    }
}

/// Ratings of the items both users rated, in item order.
pub fn co_rated(a: &BTreeMap<ItemId, f64>, b: &BTreeMap<ItemId, f64>) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .filter_map(|(item, ra)| b.get(item).map(|rb| (*ra, *rb)))
        .unzip()
}

fn co_rated_vectors(ratings: &RatingMatrix, u: &str, v: &str) -> Option<(DVector<f64>, DVector<f64>)> {
    let (ru, rv) = (ratings.user_ratings(u)?, ratings.user_ratings(v)?);
    let (xs, ys) = co_rated(ru, rv);

    if xs.is_empty() {
        trace!(u, v, "no co-rated items");
        return None;
    }

    Some((DVector::from_vec(xs), DVector::from_vec(ys)))
}

/// Pearson correlation over co-rated items, centered on the co-rated means.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pearson;

impl SimilarityMeasure for Pearson {
    fn name(&self) -> &'static str {
        "pearson"
    }

    fn similarity(&self, ratings: &RatingMatrix, u: &str, v: &str) -> f64 {
        let Some((x, y)) = co_rated_vectors(ratings, u, v) else {
            return 0.0;
        };

        let cx = x.add_scalar(-x.mean());
        let cy = y.add_scalar(-y.mean());

        if !has_variance(&x, &cx) || !has_variance(&y, &cy) {
            trace!(u, v, "zero variance over co-rated items");
            return 0.0;
        }

        // Separate norms keep small-scale products clear of underflow
        (cx.dot(&cy) / (cx.norm() * cy.norm())).clamp(-1.0, 1.0)
    }
}

/// Cosine of the raw co-rated rating vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl SimilarityMeasure for Cosine {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn similarity(&self, ratings: &RatingMatrix, u: &str, v: &str) -> f64 {
        let Some((x, y)) = co_rated_vectors(ratings, u, v) else {
            return 0.0;
        };

        let norms = x.norm() * y.norm();
        if norms == 0.0 {
            return 0.0;
        }

        (x.dot(&y) / norms).clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityKind {
    #[default]
    Pearson,
    Cosine,
}

impl SimilarityMeasure for SimilarityKind {
    fn name(&self) -> &'static str {
        match self {
            SimilarityKind::Pearson => Pearson.name(),
            SimilarityKind::Cosine => Cosine.name(),
        }
    }

    fn similarity(&self, ratings: &RatingMatrix, u: &str, v: &str) -> f64 {
        match self {
            SimilarityKind::Pearson => Pearson.similarity(ratings, u, v),
            SimilarityKind::Cosine => Cosine.similarity(ratings, u, v),
        }
    }
}
