use super::SimilarityLookup;
use crate::error::PredictionError;
use crate::models::*;
use chrono::Utc;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Estimates `user`'s rating of `item` as their own average plus the
/// similarity-weighted mean deviation of every other user who rated `item`.
///
/// The result is not clamped to any rating scale. Neighbors are visited in
/// sorted user order, so the floating-point sum is reproducible.
pub fn predict<S>(
    ratings: &RatingMatrix,
    averages: &UserAverages,
    similarities: &S,
    user: &str,
    item: &str,
) -> Result<f64, PredictionError>
where
    S: SimilarityLookup + ?Sized,
{
    weighted_deviation(ratings, averages, similarities, user, item).map(|p| p.rating)
}

fn weighted_deviation<S>(
    ratings: &RatingMatrix,
    averages: &UserAverages,
    similarities: &S,
    user: &str,
    item: &str,
) -> Result<Prediction, PredictionError>
where
    S: SimilarityLookup + ?Sized,
{
    let mut neighbors = 0usize;
    let mut numerator = 0.0f64;
    let mut denominator = 0.0f64;

    for (neighbor, rating) in ratings.raters(item).filter(|(v, _)| *v != user) {
        // Averages built from other ratings may lack this rater
        let Some(neighbor_avg) = averages.get(neighbor) else {
            debug!(neighbor, "neighbor has no average, not counted");
            continue;
        };
        neighbors += 1;

        let sim = similarities.similarity(user, neighbor).unwrap_or(0.0);

        numerator += sim * (rating - neighbor_avg);
        denominator += sim.abs();
    }

    if neighbors == 0 {
        return Err(PredictionError::NoNeighbors {
            user: user.to_string(),
            item: item.to_string(),
        });
    }

    let user_avg = averages.get(user).ok_or_else(|| PredictionError::UnknownUser {
        user: user.to_string(),
    })?;

    if denominator == 0.0 {
        return Err(PredictionError::NoSignal {
            user: user.to_string(),
            item: item.to_string(),
        });
    }

    Ok(Prediction {
        user: user.to_string(),
        item: item.to_string(),
        rating: user_avg + numerator / denominator,
        neighbors,
        weight: denominator,
    })
}

/// Borrows a rating matrix and a similarity source, computing user averages
/// once up front.
pub struct UserBasedPredictor<'a, S: ?Sized> {
    ratings: &'a RatingMatrix,
    similarities: &'a S,
    averages: UserAverages,
}

impl<'a, S: SimilarityLookup + ?Sized> UserBasedPredictor<'a, S> {
    pub fn new(ratings: &'a RatingMatrix, similarities: &'a S) -> Self {
        Self {
            ratings,
            similarities,
            averages: UserAverages::from_ratings(ratings),
        }
    }

    pub fn averages(&self) -> &UserAverages {
        &self.averages
    }

    pub fn predict(&self, user: &str, item: &str) -> Result<Prediction, PredictionError> {
        weighted_deviation(self.ratings, &self.averages, self.similarities, user, item)
    }

    /// Predicts every item `user` has not rated and returns the best `n`.
    ///
    /// Items with no neighbors or no signal are counted in `skipped`.
    pub fn recommend(&self, user: &str, n: usize) -> Result<RecommendationResponse, PredictionError> {
        let rated = self
            .ratings
            .user_ratings(user)
            .ok_or_else(|| PredictionError::UnknownUser {
                user: user.to_string(),
            })?;

        let mut recommendations = Vec::new();
        let mut skipped = 0usize;

        for item in self.ratings.items() {
            if rated.contains_key(item) {
                continue;
            }

            match self.predict(user, item) {
                Ok(prediction) => recommendations.push(RecommendationItem {
                    item_id: prediction.item,
                    predicted_rating: prediction.rating,
                    neighbors: prediction.neighbors,
                }),
                Err(e) => {
                    debug!("Skipping {}: {}", item, e);
                    skipped += 1;
                }
            }
        }

        // Items arrive in id order and the sort is stable, so ties stay in id order
        recommendations.sort_by(|a, b| {
            b.predicted_rating
                .partial_cmp(&a.predicted_rating)
                .unwrap_or(Ordering::Equal)
        });
        recommendations.truncate(n);

        info!(
            user,
            returned = recommendations.len(),
            skipped,
            "Recommendations generated"
        );

        Ok(RecommendationResponse {
            user_id: user.to_string(),
            recommendations,
            skipped,
            generated_at: Utc::now(),
        })
    }
}
