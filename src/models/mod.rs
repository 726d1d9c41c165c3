use crate::error::RatingError;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type UserId = String;
pub type ItemId = String;

/// A single observed (user, item, rating) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub user: UserId,
    pub item: ItemId,
    pub rating: f64,
}

impl RatingEntry {
    pub fn new(user: impl Into<UserId>, item: impl Into<ItemId>, rating: f64) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            rating,
        }
    }
}

/// Sparse user -> item -> rating map. A missing key means "not rated".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingMatrix {
    ratings: BTreeMap<UserId, BTreeMap<ItemId, f64>>,
}

impl RatingMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Result<Self, RatingError>
    where
        I: IntoIterator<Item = RatingEntry>,
    {
        let mut matrix = Self::new();
        for entry in entries {
            matrix.insert(entry.user, entry.item, entry.rating)?;
        }
        Ok(matrix)
    }

    /// Records a rating, replacing any previous rating for the same pair.
    pub fn insert(
        &mut self,
        user: impl Into<UserId>,
        item: impl Into<ItemId>,
        rating: f64,
    ) -> Result<Option<f64>, RatingError> {
        let user = user.into();
        let item = item.into();

        if user.is_empty() {
            return Err(RatingError::EmptyId("user"));
        }
        if item.is_empty() {
            return Err(RatingError::EmptyId("item"));
        }
        if !rating.is_finite() {
            return Err(RatingError::NonFinite { user, item, value: rating });
        }

        Ok(self.ratings.entry(user).or_default().insert(item, rating))
    }

    pub fn rating(&self, user: &str, item: &str) -> Option<f64> {
        self.ratings.get(user).and_then(|items| items.get(item)).copied()
    }

    pub fn user_ratings(&self, user: &str) -> Option<&BTreeMap<ItemId, f64>> {
        self.ratings.get(user)
    }

    pub fn contains_user(&self, user: &str) -> bool {
        self.ratings.contains_key(user)
    }

    /// Users in sorted order.
    pub fn users(&self) -> impl Iterator<Item = &str> + '_ {
        self.ratings.keys().map(String::as_str)
    }

    pub fn items(&self) -> BTreeSet<&str> {
        self.ratings
            .values()
            .flat_map(|items| items.keys().map(String::as_str))
            .collect()
    }

    /// Users who rated `item`, in sorted user order, with their rating.
    pub fn raters<'a>(&'a self, item: &'a str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.ratings
            .iter()
            .filter_map(move |(user, items)| items.get(item).map(|r| (user.as_str(), *r)))
    }

    pub fn entries(&self) -> impl Iterator<Item = RatingEntry> + '_ {
        self.ratings.iter().flat_map(|(user, items)| {
            items
                .iter()
                .map(move |(item, rating)| RatingEntry::new(user.clone(), item.clone(), *rating))
        })
    }

    pub fn num_users(&self) -> usize {
        self.ratings.len()
    }

    pub fn num_items(&self) -> usize {
        self.items().len()
    }

    pub fn num_ratings(&self) -> usize {
        self.ratings.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

/// Mean of each user's own ratings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserAverages {
    averages: BTreeMap<UserId, f64>,
}

impl UserAverages {
    pub fn from_ratings(ratings: &RatingMatrix) -> Self {
        let averages = ratings
            .ratings
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(user, items)| {
                let sum: f64 = items.values().sum();
                (user.clone(), sum / items.len() as f64)
            })
            .collect();

        Self { averages }
    }

    pub fn get(&self, user: &str) -> Option<f64> {
        self.averages.get(user).copied()
    }

    pub fn len(&self) -> usize {
        self.averages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.averages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.averages.iter().map(|(u, avg)| (u.as_str(), *avg))
    }
}

/// Symmetric pairwise user similarities. Self-similarity is never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityMatrix {
    scores: BTreeMap<UserId, BTreeMap<UserId, f64>>,
}

impl SimilarityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty matrix with a row registered for every user, so users without
    /// any partner still show up in `users()` and `to_dense()`.
    pub fn with_users<'a, I>(users: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let scores = users
            .into_iter()
            .map(|u| (u.to_string(), BTreeMap::new()))
            .collect();
        Self { scores }
    }

    /// Stores `score` under both (u, v) and (v, u). A self pair is ignored.
    pub fn insert(&mut self, u: &str, v: &str, score: f64) {
        if u == v {
            return;
        }
        self.scores
            .entry(u.to_string())
            .or_default()
            .insert(v.to_string(), score);
        self.scores
            .entry(v.to_string())
            .or_default()
            .insert(u.to_string(), score);
    }

    pub fn get(&self, u: &str, v: &str) -> Option<f64> {
        self.scores.get(u).and_then(|row| row.get(v)).copied()
    }

    /// Number of unordered pairs held.
    pub fn num_pairs(&self) -> usize {
        self.scores.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    pub fn users(&self) -> impl Iterator<Item = &str> + '_ {
        self.scores.keys().map(String::as_str)
    }

    pub fn neighbors<'a>(&'a self, user: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.scores
            .get(user)
            .into_iter()
            .flat_map(|row| row.iter().map(|(v, s)| (v.as_str(), *s)))
    }

    /// The `k` users most similar to `user`, highest score first.
    pub fn most_similar(&self, user: &str, k: usize) -> Vec<(UserId, f64)> {
        let mut ranked: Vec<(UserId, f64)> = self
            .neighbors(user)
            .map(|(v, s)| (v.to_string(), s))
            .collect();

        // Stable sort keeps user-id order among equal scores
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);
        ranked
    }

    /// Dense export in sorted user order. The diagonal is left at 0.0.
    pub fn to_dense(&self) -> (Vec<UserId>, Array2<f64>) {
        let users: Vec<UserId> = self.scores.keys().cloned().collect();
        let n = users.len();
        let mut dense = Array2::<f64>::zeros((n, n));

        for (i, u) in users.iter().enumerate() {
            for (j, v) in users.iter().enumerate() {
                if let Some(score) = self.get(u, v) {
                    dense[[i, j]] = score;
                }
            }
        }

        (users, dense)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub user: UserId,
    pub item: ItemId,
    pub rating: f64,
    /// Users other than the target who rated the item.
    pub neighbors: usize,
    /// Sum of absolute neighbor similarities.
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub item_id: ItemId,
    pub predicted_rating: f64,
    pub neighbors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub recommendations: Vec<RecommendationItem>,
    /// Unrated items for which no estimate could be made.
    pub skipped: usize,
    pub generated_at: DateTime<Utc>,
}
