//! Exhaustive 2D Otsu threshold search.
//!
//! For a cutoff `(s, t)` the foreground class is the quadrant `i <= s, j <= t`
//! and the background class the quadrant `i > s, j > t`. The score is the
//! between-class variance `w0 |mu0 - muT|^2 + w1 |mu1 - muT|^2` over both
//! axes, evaluated in O(1) per candidate from prefix sums of mass and first
//! moments.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::histogram::{bin_of, Histogram2D};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Cutoff bins on the intensity and neighbourhood-mean axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub intensity: usize,
    pub mean: usize,
}

impl ThresholdPair {
    /// Mid-range cutoff used when the histogram cannot be separated.
    pub fn mid_range(bins: usize) -> Self {
        let c = (bins / 2).saturating_sub(1);
        Self {
            intensity: c,
            mean: c,
        }
    }

    /// A pixel is foreground when both of its bins are at or below the cutoff.
    #[inline]
    pub fn is_foreground(&self, value: u8, mean: u8, bins: usize) -> bool {
        bin_of(value, bins) <= self.intensity && bin_of(mean, bins) <= self.mean
    }
}

/// Result of a search over one histogram.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub pair: ThresholdPair,
    pub bins: usize,
    pub best_score: f64,
    pub mean_score: f64,
    /// `true` when the mid-range cutoff replaced the search.
    pub fallback: bool,
}

impl SearchOutcome {
    pub fn degenerate(bins: usize) -> Self {
        Self {
            pair: ThresholdPair::mid_range(bins),
            bins,
            best_score: 0.0,
            mean_score: 0.0,
            fallback: true,
        }
    }

    /// Best score relative to the mean candidate score.
    pub fn separation_ratio(&self) -> f64 {
        if self.mean_score > 0.0 {
            self.best_score / self.mean_score
        } else {
            0.0
        }
    }
}

/// Inclusive prefix sums of mass and of mass-weighted bin coordinates.
pub struct MomentTable {
    bins: usize,
    stride: usize,
    mass: Vec<f64>,
    moment: Vec<Vector2<f64>>,
}

impl MomentTable {
    pub fn new(hist: &Histogram2D) -> Self {
        let n = hist.bins();
        let stride = n + 1;
        let mut mass = vec![0.0; stride * stride];
        let mut moment = vec![Vector2::zeros(); stride * stride];
        for i in 0..n {
            let mut row_mass = 0.0;
            let mut row_moment = Vector2::zeros();
            for j in 0..n {
                let c = hist.get(i, j);
                row_mass += c;
                row_moment += Vector2::new(i as f64, j as f64) * c;
                let k = (i + 1) * stride + j + 1;
                mass[k] = mass[k - stride] + row_mass;
                moment[k] = moment[k - stride] + row_moment;
            }
        }
        Self {
            bins: n,
            stride,
            mass,
            moment,
        }
    }

    /// Mass and moment of the half-open block `[i0, i1) x [j0, j1)`.
    #[inline]
    fn block(&self, i0: usize, i1: usize, j0: usize, j1: usize) -> (f64, Vector2<f64>) {
        let s = self.stride;
        let m = self.mass[i1 * s + j1] - self.mass[i0 * s + j1] - self.mass[i1 * s + j0]
            + self.mass[i0 * s + j0];
        let v = self.moment[i1 * s + j1] - self.moment[i0 * s + j1] - self.moment[i1 * s + j0]
            + self.moment[i0 * s + j0];
        (m, v)
    }

    pub fn total(&self) -> f64 {
        self.mass[self.bins * self.stride + self.bins]
    }

    /// Between-class variance of cutoff `(s, t)`; zero when a class is empty.
    pub fn score(&self, s: usize, t: usize) -> f64 {
        let n = self.bins;
        let (total, total_moment) = self.block(0, n, 0, n);
        if total <= 0.0 {
            return 0.0;
        }
        let (m0, v0) = self.block(0, s + 1, 0, t + 1);
        let (m1, v1) = self.block(s + 1, n, t + 1, n);
        if m0 <= 0.0 || m1 <= 0.0 {
            return 0.0;
        }
        let mu_t = total_moment / total;
        let d0 = v0 / m0 - mu_t;
        let d1 = v1 / m1 - mu_t;
        (m0 / total) * d0.norm_squared() + (m1 / total) * d1.norm_squared()
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    s: usize,
    t: usize,
    score: f64,
    center_dist: f64,
}

/// Total order: higher score, then (optionally) closer to the grid centre,
/// then lexicographically smaller.
fn better(a: Candidate, b: Candidate, center_tie_break: bool) -> Candidate {
    if a.score != b.score {
        return if a.score > b.score { a } else { b };
    }
    if center_tie_break && a.center_dist != b.center_dist {
        return if a.center_dist < b.center_dist { a } else { b };
    }
    if (a.s, a.t) <= (b.s, b.t) {
        a
    } else {
        b
    }
}

/// Search every cutoff of `hist` for the maximum between-class variance.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(hist, cfg), fields(bins = hist.bins()))
)]
pub fn search_otsu_2d(hist: &Histogram2D, cfg: &SearchConfig) -> SearchOutcome {
    let n = hist.bins();
    let table = MomentTable::new(hist);
    if table.total() <= 0.0 {
        return SearchOutcome::degenerate(n);
    }
    let c = (n as f64 - 1.0) / 2.0;
    let tie = cfg.center_tie_break;

    let scan_row = |s: usize| -> (Candidate, f64) {
        let mut best: Option<Candidate> = None;
        let mut sum = 0.0;
        for t in 0..n {
            let score = table.score(s, t);
            sum += score;
            let cand = Candidate {
                s,
                t,
                score,
                center_dist: (s as f64 - c).powi(2) + (t as f64 - c).powi(2),
            };
            best = Some(match best {
                Some(b) => better(b, cand, tie),
                None => cand,
            });
        }
        let best = best.unwrap_or(Candidate {
            s,
            t: 0,
            score: 0.0,
            center_dist: f64::INFINITY,
        });
        (best, sum)
    };

    #[cfg(feature = "rayon")]
    let rows: Vec<(Candidate, f64)> = (0..n).into_par_iter().map(scan_row).collect();
    #[cfg(not(feature = "rayon"))]
    let rows: Vec<(Candidate, f64)> = (0..n).map(scan_row).collect();

    // reduce in row order so the mean is reproducible
    let mut best = rows[0].0;
    let mut sum = 0.0;
    for &(cand, row_sum) in &rows {
        best = better(best, cand, tie);
        sum += row_sum;
    }

    if best.score <= 0.0 {
        return SearchOutcome::degenerate(n);
    }
    SearchOutcome {
        pair: ThresholdPair {
            intensity: best.s,
            mean: best.t,
        },
        bins: n,
        best_score: best.score,
        mean_score: sum / (n * n) as f64,
        fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hist_from(bins: usize, cells: &[(usize, usize, f64)]) -> Histogram2D {
        let mut values = Vec::new();
        let mut means = Vec::new();
        for &(i, j, c) in cells {
            for _ in 0..c as usize {
                values.push((i * 256 / bins) as u8);
                means.push((j * 256 / bins) as u8);
            }
        }
        let mut h = Histogram2D::new(bins);
        h.accumulate(&values, &means);
        h
    }

    #[test]
    fn two_clusters_are_separated() {
        let h = hist_from(32, &[(4, 5, 30.0), (25, 24, 70.0)]);
        let out = search_otsu_2d(&h, &SearchConfig::default());
        assert!(!out.fallback);
        assert!((4..25).contains(&out.pair.intensity));
        assert!((5..24).contains(&out.pair.mean));
        assert!(out.separation_ratio() > 1.5);
    }

    #[test]
    fn ties_prefer_the_grid_centre() {
        // every cutoff between the two clusters scores the same
        let h = hist_from(32, &[(0, 0, 10.0), (31, 31, 10.0)]);
        let out = search_otsu_2d(&h, &SearchConfig::default());
        assert_eq!(
            out.pair,
            ThresholdPair {
                intensity: 15,
                mean: 15
            }
        );
        let lex = search_otsu_2d(
            &h,
            &SearchConfig {
                center_tie_break: false,
                ..SearchConfig::default()
            },
        );
        assert_eq!(
            lex.pair,
            ThresholdPair {
                intensity: 0,
                mean: 0
            }
        );
    }

    #[test]
    fn empty_histogram_falls_back() {
        let h = Histogram2D::new(32);
        let out = search_otsu_2d(&h, &SearchConfig::default());
        assert!(out.fallback);
        assert_eq!(out.pair, ThresholdPair::mid_range(32));
    }

    #[test]
    fn mid_range_saturates_for_tiny_bin_counts() {
        assert_eq!(ThresholdPair::mid_range(32).intensity, 15);
        assert_eq!(ThresholdPair::mid_range(1).intensity, 0);
        assert_eq!(ThresholdPair::mid_range(0).mean, 0);
    }

    #[test]
    fn score_is_symmetric_under_relabeling() {
        let cells = [(3, 4, 12.0), (9, 6, 5.0), (20, 22, 30.0), (27, 25, 8.0)];
        let bins = 32;
        let h = hist_from(bins, &cells);
        let mirrored: Vec<_> = cells
            .iter()
            .map(|&(i, j, c)| (bins - 1 - i, bins - 1 - j, c))
            .collect();
        let r = hist_from(bins, &mirrored);
        let (a, b) = (MomentTable::new(&h), MomentTable::new(&r));
        for s in 0..bins - 1 {
            for t in 0..bins - 1 {
                assert_relative_eq!(
                    a.score(s, t),
                    b.score(bins - 2 - s, bins - 2 - t),
                    max_relative = 1e-9,
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn repeated_searches_are_identical() {
        let h = hist_from(64, &[(10, 12, 40.0), (11, 30, 9.0), (50, 52, 90.0)]);
        let first = search_otsu_2d(&h, &SearchConfig::default());
        for _ in 0..5 {
            assert_eq!(search_otsu_2d(&h, &SearchConfig::default()), first);
        }
    }

    #[test]
    fn classification_uses_both_axes() {
        let pair = ThresholdPair {
            intensity: 10,
            mean: 20,
        };
        assert!(pair.is_foreground(40, 80, 64));
        assert!(!pair.is_foreground(44, 80, 64));
        assert!(!pair.is_foreground(40, 84, 64));
    }
}
