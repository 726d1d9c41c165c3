use thiserror::Error;

/// Failures surfaced by the rating predictor.
///
/// Similarity-stage degeneracies (no co-rated items, zero variance) never show
/// up here; they resolve to a similarity of 0.0 inside the builder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("no user other than '{user}' has rated item '{item}'")]
    NoNeighbors { user: String, item: String },

    #[error("every neighbor of '{user}' for item '{item}' has zero similarity")]
    NoSignal { user: String, item: String },

    #[error("user '{user}' has no ratings")]
    UnknownUser { user: String },
}

/// Rejected entry when building a rating matrix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RatingError {
    #[error("rating for user '{user}', item '{item}' is not finite: {value}")]
    NonFinite { user: String, item: String, value: f64 },

    #[error("{0} id cannot be empty")]
    EmptyId(&'static str),
}
