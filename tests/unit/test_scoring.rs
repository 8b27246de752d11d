use lessonlens::analyzer::{calculate_weighted_score, validate_analysis, PLACEHOLDER_SCORE};
use lessonlens::{AggregateAnalysis, AnalysisError, Criterion};
use proptest::prelude::*;
use serde_json::json;

fn analysis_of(entries: &[(&str, f64)]) -> AggregateAnalysis {
    let mut analysis = AggregateAnalysis {
        coaching_summary: "Summary.".to_string(),
        ..Default::default()
    };
    for (name, score) in entries {
        analysis
            .detailed_feedback
            .insert(name.to_string(), json!({"score": score, "feedback": "f"}));
    }
    analysis
}

#[test]
fn weights_shift_the_overall_score() {
    let analysis = analysis_of(&[("High", 100.0), ("Low", 0.0)]);

    let even = vec![Criterion::new("High", 50.0), Criterion::new("Low", 50.0)];
    assert_eq!(calculate_weighted_score(&even, &analysis).0, 50.0);

    let skewed = vec![Criterion::new("High", 90.0), Criterion::new("Low", 10.0)];
    assert_eq!(calculate_weighted_score(&skewed, &analysis).0, 90.0);
}

#[test]
fn placeholder_scores_participate_like_any_other() {
    let analysis = analysis_of(&[("Real", 95.0), ("Fallback", PLACEHOLDER_SCORE)]);
    let criteria = vec![Criterion::new("Real", 50.0), Criterion::new("Fallback", 50.0)];
    assert_eq!(calculate_weighted_score(&criteria, &analysis).0, 75.0);
}

#[test]
fn skipped_criteria_are_reported_in_rubric_order() {
    let analysis = analysis_of(&[("B", 80.0)]);
    let criteria = vec![
        Criterion::new("A", 30.0),
        Criterion::new("B", 40.0),
        Criterion::new("C", 30.0),
    ];

    let (score, skipped) = calculate_weighted_score(&criteria, &analysis);
    assert_eq!(score, 80.0);
    assert_eq!(skipped, vec!["A".to_string(), "C".to_string()]);
}

#[test]
fn unweighted_mean_fallback_then_zero() {
    let analysis = analysis_of(&[("X", 40.0), ("Y", 60.0)]);
    let criteria = vec![Criterion::new("Nothing Matches", 100.0)];
    assert_eq!(calculate_weighted_score(&criteria, &analysis).0, 50.0);

    let empty = AggregateAnalysis::default();
    assert_eq!(calculate_weighted_score(&criteria, &empty).0, 0.0);
}

#[test]
fn validation_gates_scoring_input() {
    let ok = analysis_of(&[("A", 70.0)]);
    assert!(validate_analysis(&ok).is_ok());

    let mut bad = ok.clone();
    bad.detailed_feedback
        .insert("B".to_string(), json!({"feedback": "no score"}));
    match validate_analysis(&bad).unwrap_err() {
        AnalysisError::ValidationError(message) => assert!(message.contains("'B'")),
        other => panic!("unexpected error: {:?}", other),
    }
}

proptest! {
    // The weighted score never leaves the convex hull of the clamped
    // per-criterion scores, for any positive weights.
    #[test]
    fn weighted_score_stays_within_score_bounds(
        scores in proptest::collection::vec(-50.0f64..150.0, 1..8),
        weights in proptest::collection::vec(0.1f64..100.0, 8),
    ) {
        let criteria: Vec<Criterion> = scores
            .iter()
            .enumerate()
            .map(|(i, _)| Criterion::new(format!("C{}", i), weights[i]))
            .collect();
        let entries: Vec<(String, f64)> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| (format!("C{}", i), *s))
            .collect();
        let borrowed: Vec<(&str, f64)> = entries.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let analysis = analysis_of(&borrowed);

        let (overall, skipped) = calculate_weighted_score(&criteria, &analysis);
        prop_assert!(skipped.is_empty());

        let clamped: Vec<f64> = scores.iter().map(|s| s.clamp(0.0, 100.0)).collect();
        let min = clamped.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = clamped.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(overall >= min - 0.01 && overall <= max + 0.01);
    }
}
