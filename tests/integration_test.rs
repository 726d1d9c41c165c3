use std::collections::BTreeMap;
use usercf::algorithms::SimilarityLookup;
use usercf::utils::{metrics, split_holdout, synthetic_ratings};
use usercf::*;

fn ratings_from(triples: &[(&str, &str, f64)]) -> RatingMatrix {
    RatingMatrix::from_entries(
        triples
            .iter()
            .map(|(user, item, rating)| RatingEntry::new(*user, *item, *rating)),
    )
    .unwrap()
}

fn scenario() -> RatingMatrix {
    ratings_from(&[
        ("A", "m1", 5.0),
        ("A", "m2", 3.0),
        ("B", "m1", 4.0),
        ("B", "m2", 2.0),
        ("C", "m2", 4.0),
    ])
}

#[test]
fn test_scenario_perfect_correlation() {
    let sims = build(&scenario());

    // avg_A = 4, avg_B = 3 over {m1, m2}: num = 2, denom = 2
    assert!((sims.get("A", "B").unwrap() - 1.0).abs() < 1e-9);
    // C shares only m2 with each of them: zero variance
    assert_eq!(sims.get("A", "C"), Some(0.0));
    assert_eq!(sims.get("B", "C"), Some(0.0));
}

#[test]
fn test_scenario_prediction_has_no_signal() {
    let ratings = scenario();
    let sims = build(&ratings);
    let averages = UserAverages::from_ratings(&ratings);

    // A and B rated m1 but neither correlates with C
    assert_eq!(
        predict(&ratings, &averages, &sims, "C", "m1"),
        Err(PredictionError::NoSignal {
            user: "C".to_string(),
            item: "m1".to_string()
        })
    );
}

#[test]
fn test_no_neighbors_when_item_unrated_by_others() {
    let mut ratings = scenario();
    ratings.insert("C", "m3", 2.0).unwrap();

    let sims = build(&ratings);
    let averages = UserAverages::from_ratings(&ratings);

    // Only C rated m3, and an unseen item has no raters at all
    assert!(matches!(
        predict(&ratings, &averages, &sims, "C", "m3"),
        Err(PredictionError::NoNeighbors { .. })
    ));
    assert!(matches!(
        predict(&ratings, &averages, &sims, "A", "m9"),
        Err(PredictionError::NoNeighbors { .. })
    ));
}

#[test]
fn test_analytic_prediction() {
    let ratings = ratings_from(&[
        ("A", "m1", 5.0),
        ("A", "m2", 3.0),
        ("A", "m3", 2.0),
        ("B", "m1", 4.0),
        ("B", "m2", 2.0),
        ("B", "m3", 5.0),
        ("C", "m1", 2.0),
        ("C", "m2", 4.0),
        ("C", "m3", 4.0),
        ("T", "m1", 3.0),
        ("T", "m2", 1.0),
    ]);
    let sims = build(&ratings);
    let averages = UserAverages::from_ratings(&ratings);

    // T is perfectly correlated with A and B and anti-correlated with C on {m1, m2}
    assert!((sims.get("T", "A").unwrap() - 1.0).abs() < 1e-9);
    assert!((sims.get("T", "B").unwrap() - 1.0).abs() < 1e-9);
    assert!((sims.get("T", "C").unwrap() + 1.0).abs() < 1e-9);

    let (avg_a, avg_b, avg_c, avg_t) = (10.0 / 3.0, 11.0 / 3.0, 10.0 / 3.0, 2.0);
    let numerator = (2.0 - avg_a) + (5.0 - avg_b) - (4.0 - avg_c);
    let expected = avg_t + numerator / 3.0;

    let predicted = predict(&ratings, &averages, &sims, "T", "m3").unwrap();
    assert!((predicted - expected).abs() < 1e-9);
}

#[test]
fn test_equal_weights_reduce_to_mean_deviation() {
    let ratings = ratings_from(&[
        ("N1", "x", 6.0),
        ("N1", "y", 2.0),
        ("N2", "x", 3.0),
        ("N2", "y", 5.0),
        ("N2", "z", 1.0),
        ("N3", "x", 9.0),
        ("N3", "z", 7.0),
        ("T", "y", 4.0),
        ("T", "z", 6.0),
    ]);
    let averages = UserAverages::from_ratings(&ratings);

    let w = 0.4;
    let mut sims = SimilarityMatrix::new();
    for neighbor in ["N1", "N2", "N3"] {
        sims.insert("T", neighbor, w);
    }

    let deviations: f64 = [("N1", 6.0), ("N2", 3.0), ("N3", 9.0)]
        .iter()
        .map(|(v, r)| r - averages.get(v).unwrap())
        .sum();
    let weighted = averages.get("T").unwrap() + w * deviations / (3.0 * w);
    let plain = averages.get("T").unwrap() + deviations / 3.0;

    let predicted = predict(&ratings, &averages, &sims, "T", "x").unwrap();
    assert!((predicted - weighted).abs() < 1e-9);
    assert!((predicted - plain).abs() < 1e-9);
}

#[test]
fn test_symmetry_range_and_fallback_on_random_data() {
    let ratings = synthetic_ratings(40, 25, 0.25, (1, 10), 2024);
    let sims = build(&ratings);
    let users: Vec<&str> = ratings.users().collect();

    for (i, u) in users.iter().enumerate() {
        for v in &users[i + 1..] {
            let uv = sims.get(u, v).unwrap();
            let vu = sims.get(v, u).unwrap();
            assert_eq!(uv, vu);
            assert!((-1.0..=1.0).contains(&uv));

            let ru = ratings.user_ratings(u).unwrap();
            let rv = ratings.user_ratings(v).unwrap();
            if !ru.keys().any(|item| rv.contains_key(item)) {
                assert_eq!(uv, 0.0);
            }
        }
    }
    assert_eq!(sims.num_pairs(), users.len() * (users.len() - 1) / 2);
}

#[test]
fn test_build_is_idempotent_and_does_not_mutate() {
    let ratings = synthetic_ratings(25, 20, 0.4, (1, 5), 9);
    let before = ratings.clone();

    let first = build(&ratings);
    let second = build(&ratings);

    assert_eq!(first, second);
    assert_eq!(ratings, before);
}

#[test]
fn test_parallel_and_lazy_agree_with_sequential() {
    let ratings = synthetic_ratings(30, 20, 0.35, (1, 10), 77);
    let sequential = build(&ratings);
    let parallel = SimilarityMatrixBuilder::new(Pearson)
        .parallel(true)
        .workers(4)
        .build(&ratings);
    let lazy = LazySimilarityMatrix::pearson(&ratings);

    assert_eq!(sequential, parallel);
    for (u, v, score) in sequential
        .users()
        .flat_map(|u| sequential.neighbors(u).map(move |(v, s)| (u, v, s)))
    {
        assert_eq!(lazy.similarity(u, v), Some(score));
    }
}

#[test]
fn test_prediction_is_deterministic() {
    let ratings = synthetic_ratings(30, 15, 0.5, (1, 10), 5);
    let sims = build(&ratings);
    let predictor = UserBasedPredictor::new(&ratings, &sims);

    let mut first = BTreeMap::new();
    let mut second = BTreeMap::new();
    for user in ratings.users() {
        for item in ratings.items() {
            if let Ok(p) = predictor.predict(user, item) {
                first.insert((user.to_string(), item.to_string()), p.rating.to_bits());
            }
        }
    }
    for user in ratings.users() {
        for item in ratings.items() {
            if let Ok(p) = predictor.predict(user, item) {
                second.insert((user.to_string(), item.to_string()), p.rating.to_bits());
            }
        }
    }

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_evaluate_holdout() {
    let ratings = synthetic_ratings(40, 30, 0.4, (1, 10), 13);
    let (train, test) = split_holdout(&ratings, 0.2, 1);
    let sims = build(&train);
    let predictor = UserBasedPredictor::new(&train, &sims);

    let report = metrics::evaluate(&predictor, &test, |r| utils::clamp_rating(r, 1.0, 10.0));

    let attempted = report.predicted + report.no_neighbors + report.no_signal + report.unknown_user;
    assert_eq!(attempted as usize, test.len());
    assert!(report.predicted > 0);
    assert!(report.mae >= 0.0 && report.mae <= 9.0);
    assert!(report.rmse >= report.mae);
    assert!(report.coverage > 0.0 && report.coverage <= 1.0);
}

#[test]
fn test_similarity_matrix_serializes() {
    let sims = build(&scenario());
    let json = serde_json::to_value(&sims).unwrap();

    assert_eq!(json["A"]["B"], serde_json::json!(1.0));
    let back: SimilarityMatrix = serde_json::from_value(json).unwrap();
    assert_eq!(back, sims);
}
