use crate::algorithms::{SimilarityKind, SimilarityMatrixBuilder};
use crate::io::CsvFormat;
use crate::utils::validation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub similarity: SimilarityConfig,
    pub prediction: PredictionConfig,
    pub input: InputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub measure: SimilarityKind,
    /// Score user pairs on a thread pool.
    pub parallel: bool,
    pub workers: usize,
    /// Compute only the pairs a prediction touches instead of the full matrix.
    pub lazy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub rating_min: f64,
    pub rating_max: f64,
    /// Clamp reported predictions into [rating_min, rating_max].
    pub clamp: bool,
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub format: CsvFormat,
    pub delimiter: String,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            measure: SimilarityKind::Pearson,
            parallel: false,
            workers: num_cpus::get(),
            lazy: false,
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            rating_min: 1.0,
            rating_max: 10.0,
            clamp: true,
            top_n: 10,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            format: CsvFormat::Wide,
            delimiter: ",".to_string(),
        }
    }
}

impl SimilarityConfig {
    pub fn builder(&self) -> SimilarityMatrixBuilder<SimilarityKind> {
        SimilarityMatrixBuilder::new(self.measure)
            .parallel(self.parallel)
            .workers(self.workers)
    }
}

impl PredictionConfig {
    /// Applies the configured clamping policy to a raw estimate.
    pub fn adjust(&self, rating: f64) -> f64 {
        if self.clamp {
            crate::utils::clamp_rating(rating, self.rating_min, self.rating_max)
        } else {
            rating
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("USERCF").separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_rating_scale(self.prediction.rating_min, self.prediction.rating_max)?;
        validation::validate_workers(self.similarity.workers)?;
        validation::validate_delimiter(&self.input.delimiter)?;
        Ok(())
    }
}
