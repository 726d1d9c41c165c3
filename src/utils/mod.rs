use crate::models::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub mod metrics;
pub mod validation;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Caller-side policy: the predictor itself never clamps.
pub fn clamp_rating(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Random rating matrix for benchmarks and property checks.
///
/// Each (user, item) cell is filled with probability `density` using an
/// integer rating in `[min, max]`. Same seed, same matrix.
pub fn synthetic_ratings(
    num_users: usize,
    num_items: usize,
    density: f64,
    (min, max): (u32, u32),
    seed: u64,
) -> RatingMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ratings = RatingMatrix::new();

    for u in 0..num_users {
        for i in 0..num_items {
            if rng.gen::<f64>() < density {
                let rating = rng.gen_range(min..=max) as f64;
                let inserted = ratings.insert(format!("u{:04}", u), format!("i{:04}", i), rating);
                debug_assert!(inserted.is_ok(), "generated ids are non-empty and ratings finite");
            }
        }
    }

    ratings
}

/// Moves roughly `fraction` of the ratings into a held-out set.
///
/// Every user keeps at least one training rating so their average stays
/// defined.
pub fn split_holdout(ratings: &RatingMatrix, fraction: f64, seed: u64) -> (RatingMatrix, Vec<RatingEntry>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = RatingMatrix::new();
    let mut test = Vec::new();

    for user in ratings.users() {
        let Some(items) = ratings.user_ratings(user) else {
            continue;
        };

        let mut kept = 0usize;
        let total = items.len();
        for (idx, (item, rating)) in items.iter().enumerate() {
            let is_last_chance = kept == 0 && idx + 1 == total;
            if !is_last_chance && rng.gen::<f64>() < fraction {
                test.push(RatingEntry::new(user, item.clone(), *rating));
            } else {
                let inserted = train.insert(user, item.clone(), *rating);
                debug_assert!(inserted.is_ok(), "entries of a valid matrix stay valid");
                kept += 1;
            }
        }
    }

    (train, test)
}
