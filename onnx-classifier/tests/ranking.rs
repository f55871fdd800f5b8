use onnx_classifier::service::{
    labels::{LabelTable, PRODUCE},
    prepare::softmax,
    InferenceOutput,
};
use proptest::prelude::*;

fn logits() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-50.0f32..50.0, 1..64)
}

proptest! {
    #[test]
    fn softmax_is_a_distribution(logits in logits()) {
        let probabilities = softmax(&logits).unwrap();
        prop_assert_eq!(probabilities.len(), logits.len());
        prop_assert!(probabilities.iter().all(|&p| p > 0.0 && p <= 1.0));
        let sum: f64 = probabilities.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn softmax_is_shift_invariant(logits in logits(), shift in -100.0f32..100.0) {
        let shifted = logits.iter().map(|x| x + shift).collect::<Vec<_>>();
        let original = softmax(&logits).unwrap();
        let moved = softmax(&shifted).unwrap();
        for (a, b) in original.iter().zip(moved) {
            prop_assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn produce_ranking_is_sorted(logits in prop::collection::vec(-10.0f32..10.0, 45)) {
        let output = InferenceOutput::new(&logits, PRODUCE).unwrap();
        let ranked = output.top_k(PRODUCE.len());
        prop_assert_eq!(ranked.len(), PRODUCE.len());

        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.confidence > b.confidence
                    || (a.confidence == b.confidence && a.index < b.index)
            );
        }
        prop_assert_eq!(output.top_k(5).len(), 5);
        prop_assert_eq!(output.best(), ranked[0].clone());
    }
}

#[test]
fn three_classes_scenario() {
    let labels = LabelTable::new("scenario", &["A", "B", "C"]);
    let output = InferenceOutput::new(&[1.0, 3.0, 2.0], labels).unwrap();

    let expected = [0.0900, 0.6652, 0.2447];
    for (p, e) in output.probabilities().iter().zip(expected) {
        assert!((p - e).abs() < 1e-4);
    }

    let best = output.best();
    assert_eq!(best.label, "B");
    assert_eq!(best.confidence, 66.52);
}

#[test]
fn equal_scores_keep_table_order() {
    let labels = LabelTable::new("scenario", &["left", "right"]);
    let output = InferenceOutput::new(&[5.0, 5.0], labels).unwrap();

    assert_eq!(output.probabilities(), &[0.5, 0.5]);
    let indices = output
        .top_k(5)
        .iter()
        .map(|prediction| prediction.index)
        .collect::<Vec<_>>();
    assert_eq!(indices, vec![0, 1]);
}
