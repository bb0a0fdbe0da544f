//! DIBCO-style quality metrics for binarized documents.
//!
//! All metrics compare a produced [`BinaryMask`](docbin_core::BinaryMask)
//! with a ground-truth mask of the same size; foreground (ink) is the
//! positive class. [`evaluate`] runs the whole suite and collects the
//! results in a [`QualityReport`]. Quantities that are undefined for the
//! given inputs (zero denominators, empty masks) are replaced by documented
//! boundary values and listed in [`QualityReport::edge_cases`].

mod confusion;
mod contrast;
mod drd;
mod error;
mod fmeasure;
mod mpm;
mod report;
mod skeleton;

pub use confusion::Confusion;
pub use contrast::{contrast, ClassStats, ContrastStats};
pub use drd::{drd, non_uniform_blocks, weight_matrix, DrdScore};
pub use error::MetricsError;
pub use fmeasure::{error_ratio, f_beta, f_scores, negative_rate, FScores};
pub use mpm::{hausdorff, mpm};
pub use report::{evaluate, EdgeCase, Metric, MetricsConfig, QualityReport};
pub use skeleton::{skeleton_similarity, zhang_suen};
