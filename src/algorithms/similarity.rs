use super::{Pearson, SimilarityMeasure};
use crate::models::*;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pairwise Pearson similarities for every pair of distinct users.
pub fn build(ratings: &RatingMatrix) -> SimilarityMatrix {
    SimilarityMatrixBuilder::new(Pearson).build(ratings)
}

/// Builds a full `SimilarityMatrix`, visiting each unordered user pair once.
#[derive(Debug, Clone)]
pub struct SimilarityMatrixBuilder<M> {
    measure: M,
    parallel: bool,
    workers: usize,
}

impl<M: SimilarityMeasure> SimilarityMatrixBuilder<M> {
    pub fn new(measure: M) -> Self {
        Self {
            measure,
            parallel: false,
            workers: num_cpus::get(),
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Thread count for the parallel build. Zero keeps the rayon default.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn build(&self, ratings: &RatingMatrix) -> SimilarityMatrix {
        let started = Instant::now();
        let users: Vec<&str> = ratings.users().collect();
        let pairs = unordered_pairs(users.len());

        let scores = if self.parallel && pairs.len() > 1 {
            self.score_parallel(ratings, &users, &pairs)
        } else {
            pairs
                .iter()
                .map(|&(i, j)| self.measure.similarity(ratings, users[i], users[j]))
                .collect()
        };

        let mut matrix = SimilarityMatrix::with_users(users.iter().copied());
        let mut degenerate = 0usize;
        for (&(i, j), score) in pairs.iter().zip(scores) {
            if score == 0.0 {
                degenerate += 1;
            }
            matrix.insert(users[i], users[j], score);
        }

        debug!(degenerate, "pairs without correlation signal");
        info!(
            measure = self.measure.name(),
            users = users.len(),
            pairs = pairs.len(),
            parallel = self.parallel,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Similarity matrix built"
        );

        matrix
    }

    fn score_parallel(&self, ratings: &RatingMatrix, users: &[&str], pairs: &[(usize, usize)]) -> Vec<f64> {
        let run = || -> Vec<f64> {
            pairs
                .par_iter()
                .map(|&(i, j)| self.measure.similarity(ratings, users[i], users[j]))
                .collect()
        };

        if self.workers == 0 {
            return run();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!("Failed to build a {}-thread pool, using the global pool: {}", self.workers, e);
                run()
            }
        }
    }
}

/// Index pairs (i, j) with i < j, in row-major order.
fn unordered_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect()
}
