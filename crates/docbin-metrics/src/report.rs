use std::collections::BTreeMap;

use docbin_core::{BinaryMask, GrayImageView};
use serde::{Deserialize, Serialize};

use crate::confusion::Confusion;
use crate::contrast::{contrast, ContrastStats};
use crate::drd::drd;
use crate::error::{ensure_dims, MetricsError};
use crate::fmeasure::f_scores;
use crate::mpm::mpm;
use crate::skeleton::skeleton_similarity;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Scalar metrics carried by a [`QualityReport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Precision,
    Recall,
    FMeasure,
    PseudoFMeasure,
    /// DIBCO negative rate, the mean of the miss and false-alarm rates.
    Nrm,
    /// Error pixels over twice the correct pixels.
    NrmRatio,
    Drd,
    Mpm,
    SkeletonSimilarity,
    FisherSeparation,
}

/// A boundary value substituted for an undefined quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeCase {
    /// A ratio had a zero denominator; the value (or term) is 0.
    ZeroDenominator { metric: Metric },
    /// No pixel is classified correctly; the NRM ratio is 1.
    NoCorrectPixels,
    /// Every 8x8 ground-truth block is uniform; DRD is normalized by 1.
    UniformGroundTruth,
    /// Neither mask has foreground objects above the noise size; MPM is 0.
    NoObjects,
    /// Neither mask has a skeleton; similarity is 1.
    EmptySkeletons,
    /// Both classes are flat in the original; Fisher separation divides by 1.
    ZeroVariance,
    /// One produced class is empty; Fisher separation is not reported.
    EmptyClass,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// β of the pseudo F-measure.
    pub pseudo_beta: f64,
    /// Produced objects farther than this from any ground-truth object are
    /// charged in MPM.
    pub mpm_unmatched_distance: f64,
    /// Objects with at most this many boundary pixels are noise for MPM.
    pub mpm_max_noise_points: usize,
    /// Chebyshev distance within which skeleton pixels match.
    pub skeleton_tolerance: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            pseudo_beta: 0.5,
            mpm_unmatched_distance: 5.0,
            mpm_max_noise_points: 10,
            skeleton_tolerance: 1,
        }
    }
}

/// Evaluation of one produced mask against its ground truth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub confusion: Confusion,
    pub metrics: BTreeMap<Metric, f64>,
    pub edge_cases: Vec<EdgeCase>,
    pub contrast: Option<ContrastStats>,
}

impl QualityReport {
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}

#[cfg(feature = "rayon")]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

#[cfg(not(feature = "rayon"))]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA,
    B: FnOnce() -> RB,
{
    (a(), b())
}

/// Compute every metric of `mask` against `gt`.
///
/// Contrast statistics need the `original` image and are skipped without
/// it. Independent metric families run concurrently.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(mask, gt, original, cfg), fields(width = gt.width, height = gt.height))
)]
pub fn evaluate(
    mask: &BinaryMask,
    gt: &BinaryMask,
    original: Option<&GrayImageView<'_>>,
    cfg: &MetricsConfig,
) -> Result<QualityReport, MetricsError> {
    let confusion = Confusion::count(mask, gt)?;
    if let Some(img) = original {
        ensure_dims("original image", gt.dims(), img.dims())?;
    }

    let ((drd_score, mpm_score), (skeleton, contrast_stats)) = join(
        || {
            join(
                || drd(mask, gt),
                || mpm(mask, gt, cfg.mpm_unmatched_distance, cfg.mpm_max_noise_points),
            )
        },
        || {
            join(
                || skeleton_similarity(mask, gt, cfg.skeleton_tolerance),
                || original.map(|img| contrast(mask, img)).transpose(),
            )
        },
    );
    let (drd_score, mpm_score) = (drd_score?, mpm_score?);
    let (skeleton, contrast_stats) = (skeleton?, contrast_stats?);

    let (scores, mut edge_cases) = f_scores(&confusion, cfg.pseudo_beta);
    let mut metrics = BTreeMap::from([
        (Metric::Precision, scores.precision),
        (Metric::Recall, scores.recall),
        (Metric::FMeasure, scores.f_measure),
        (Metric::PseudoFMeasure, scores.pseudo_f_measure),
        (Metric::Nrm, scores.nrm),
        (Metric::NrmRatio, scores.nrm_ratio),
        (Metric::Drd, drd_score.value),
    ]);
    if drd_score.uniform_ground_truth {
        edge_cases.push(EdgeCase::UniformGroundTruth);
    }
    metrics.insert(
        Metric::Mpm,
        mpm_score.unwrap_or_else(|| {
            edge_cases.push(EdgeCase::NoObjects);
            0.0
        }),
    );
    metrics.insert(
        Metric::SkeletonSimilarity,
        skeleton.unwrap_or_else(|| {
            edge_cases.push(EdgeCase::EmptySkeletons);
            1.0
        }),
    );
    if let Some(stats) = &contrast_stats {
        match stats.fisher_separation {
            Some(f) => {
                metrics.insert(Metric::FisherSeparation, f);
                if stats.zero_variance {
                    edge_cases.push(EdgeCase::ZeroVariance);
                }
            }
            None => edge_cases.push(EdgeCase::EmptyClass),
        }
    }

    Ok(QualityReport {
        confusion,
        metrics,
        edge_cases,
        contrast: contrast_stats,
    })
}
