//! Precision / recall of two entity sets at an overlap threshold

use contracts::Overlap;
use serde::Serialize;

/// Matching result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrecisionRecall {
    pub true_positives: usize,
    pub precision: f64,
    pub recall: f64,
}

/// Greedy one-to-one matching of `first` against `second`.
///
/// Candidate pairs are all `(i, j)` whose overlap reaches `threshold`; they
/// are taken in descending overlap order, skipping pairs whose members are
/// already matched. Ties keep `(i, j)` order.
///
/// `precision = TP / |first|` and `recall = TP / |second|`, each 0 when the
/// denominator is 0.
pub fn precision_recall<E: Overlap>(first: &[E], second: &[E], threshold: f64) -> PrecisionRecall {
    let mut candidates: Vec<(usize, usize, f64)> = first
        .iter()
        .enumerate()
        .flat_map(|(i, a)| {
            second
                .iter()
                .enumerate()
                .map(move |(j, b)| (i, j, a.overlap(b)))
        })
        .filter(|(_, _, overlap)| *overlap >= threshold)
        .collect();
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut first_matched = vec![false; first.len()];
    let mut second_matched = vec![false; second.len()];
    let mut true_positives = 0;
    for (i, j, _) in candidates {
        if !first_matched[i] && !second_matched[j] {
            first_matched[i] = true;
            second_matched[j] = true;
            true_positives += 1;
        }
    }

    PrecisionRecall {
        true_positives,
        precision: ratio(true_positives, first.len()),
        recall: ratio(true_positives, second.len()),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
