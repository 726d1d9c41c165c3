use super::{Pearson, SimilarityLookup, SimilarityMeasure};
use crate::models::*;
use dashmap::DashMap;
use tracing::trace;

/// Similarity source that scores a pair on first request and caches it.
///
/// Pairs are keyed in sorted order, so `(u, v)` and `(v, u)` share one slot
/// and one computation. Fallback values match the eager builder.
pub struct LazySimilarityMatrix<'a, M = Pearson> {
    ratings: &'a RatingMatrix,
    measure: M,
    cache: DashMap<(UserId, UserId), f64>,
}

impl<'a> LazySimilarityMatrix<'a, Pearson> {
    pub fn pearson(ratings: &'a RatingMatrix) -> Self {
        Self::new(ratings, Pearson)
    }
}

impl<'a, M: SimilarityMeasure> LazySimilarityMatrix<'a, M> {
    pub fn new(ratings: &'a RatingMatrix, measure: M) -> Self {
        Self {
            ratings,
            measure,
            cache: DashMap::new(),
        }
    }

    /// Number of pairs computed so far.
    pub fn cached_pairs(&self) -> usize {
        self.cache.len()
    }

    /// Eagerly scores every remaining pair and returns a full matrix.
    pub fn materialize(&self) -> SimilarityMatrix {
        let users: Vec<&str> = self.ratings.users().collect();
        let mut matrix = SimilarityMatrix::with_users(users.iter().copied());

        for (i, u) in users.iter().enumerate() {
            for v in &users[i + 1..] {
                if let Some(score) = self.similarity(u, v) {
                    matrix.insert(u, v, score);
                }
            }
        }

        matrix
    }
}

impl<'a, M: SimilarityMeasure> SimilarityLookup for LazySimilarityMatrix<'a, M> {
    fn similarity(&self, u: &str, v: &str) -> Option<f64> {
        if u == v || !self.ratings.contains_user(u) || !self.ratings.contains_user(v) {
            return None;
        }

        let key = if u < v {
            (u.to_string(), v.to_string())
        } else {
            (v.to_string(), u.to_string())
        };

        // Copy out before inserting; holding the shard guard across insert deadlocks
        if let Some(score) = self.cache.get(&key).map(|s| *s) {
            return Some(score);
        }

        let score = self.measure.similarity(self.ratings, &key.0, &key.1);
        trace!(u = %key.0, v = %key.1, score, "similarity computed");
        self.cache.insert(key, score);
        Some(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::build;

    fn ratings() -> RatingMatrix {
        RatingMatrix::from_entries(vec![
            RatingEntry::new("A", "m1", 5.0),
            RatingEntry::new("A", "m2", 3.0),
            RatingEntry::new("A", "m3", 1.0),
            RatingEntry::new("B", "m1", 4.0),
            RatingEntry::new("B", "m2", 2.0),
            RatingEntry::new("B", "m3", 2.0),
            RatingEntry::new("C", "m2", 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_lazy_caches_symmetric_pairs() {
        let ratings = ratings();
        let lazy = LazySimilarityMatrix::pearson(&ratings);
        assert_eq!(lazy.cached_pairs(), 0);

        let ab = lazy.similarity("A", "B").unwrap();
        let ba = lazy.similarity("B", "A").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(lazy.cached_pairs(), 1);

        assert_eq!(lazy.similarity("A", "A"), None);
        assert_eq!(lazy.similarity("A", "Z"), None);
        assert_eq!(lazy.cached_pairs(), 1);
    }

    #[test]
    fn test_lazy_matches_eager() {
        let ratings = ratings();
        let lazy = LazySimilarityMatrix::pearson(&ratings);
        let eager = build(&ratings);

        assert_eq!(lazy.materialize(), eager);
        assert_eq!(lazy.cached_pairs(), 3);
    }
}
