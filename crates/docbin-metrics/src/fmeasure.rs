//! Pixel-count metrics: precision, recall, F-measure, pseudo F-measure and
//! the two negative-rate forms.

use serde::{Deserialize, Serialize};

use crate::confusion::Confusion;
use crate::report::{EdgeCase, Metric};

/// `num / den`, or `None` when `den` is zero.
pub(crate) fn ratio(num: u64, den: u64) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FScores {
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub pseudo_f_measure: f64,
    pub nrm: f64,
    pub nrm_ratio: f64,
}

/// Weighted harmonic mean of precision and recall.
pub fn f_beta(precision: f64, recall: f64, beta: f64) -> Option<f64> {
    let b2 = beta * beta;
    let den = b2 * precision + recall;
    (den > 0.0).then(|| (1.0 + b2) * precision * recall / den)
}

/// Negative rate metric `(FN/(FN+TP) + FP/(FP+TN)) / 2`.
///
/// Each term with a zero denominator counts as 0.
pub fn negative_rate(c: &Confusion) -> f64 {
    let miss = ratio(c.false_neg, c.false_neg + c.true_pos).unwrap_or(0.0);
    let clutter = ratio(c.false_pos, c.false_pos + c.true_neg).unwrap_or(0.0);
    (miss + clutter) / 2.0
}

/// Error-to-correct pixel ratio `(FN+FP) / (2(TP+TN))`.
///
/// `None` when no pixel is classified correctly.
pub fn error_ratio(c: &Confusion) -> Option<f64> {
    ratio(c.false_neg + c.false_pos, 2 * (c.true_pos + c.true_neg))
}

/// All count-based scores. Zero denominators become 0 and are listed.
pub fn f_scores(c: &Confusion, beta: f64) -> (FScores, Vec<EdgeCase>) {
    let mut edges = Vec::new();
    let mut or_zero = |v: Option<f64>, metric: Metric| {
        v.unwrap_or_else(|| {
            edges.push(EdgeCase::ZeroDenominator { metric });
            0.0
        })
    };

    let precision = or_zero(ratio(c.true_pos, c.true_pos + c.false_pos), Metric::Precision);
    let recall = or_zero(ratio(c.true_pos, c.true_pos + c.false_neg), Metric::Recall);
    let f_measure = or_zero(f_beta(precision, recall, 1.0), Metric::FMeasure);
    let pseudo_f_measure = or_zero(f_beta(precision, recall, beta), Metric::PseudoFMeasure);
    if c.false_neg + c.true_pos == 0 || c.false_pos + c.true_neg == 0 {
        edges.push(EdgeCase::ZeroDenominator { metric: Metric::Nrm });
    }
    let nrm_ratio = error_ratio(c).unwrap_or_else(|| {
        edges.push(EdgeCase::NoCorrectPixels);
        1.0
    });
    let scores = FScores {
        precision,
        recall,
        f_measure,
        pseudo_f_measure,
        nrm: negative_rate(c),
        nrm_ratio,
    };
    (scores, edges)
}
