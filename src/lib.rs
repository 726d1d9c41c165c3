pub mod algorithms;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod utils;

pub use algorithms::{
    build, predict, Cosine, LazySimilarityMatrix, Pearson, SimilarityKind, SimilarityLookup,
    SimilarityMatrixBuilder, SimilarityMeasure, UserBasedPredictor,
};
pub use crate::config::Config;
pub use error::{PredictionError, RatingError};
pub use models::*;

use tracing_subscriber::EnvFilter;

/// Logs go to stderr so command output on stdout stays machine-readable.
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
