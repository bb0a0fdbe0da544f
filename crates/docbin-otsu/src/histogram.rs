//! Joint histogram of pixel intensity and neighbourhood mean.
//!
//! Both axes share the same uniform bucketing, so a pixel lands in cell
//! `(bin_of(value), bin_of(mean))`. Counts are accumulated per row band
//! (one band per worker with `rayon`) and merged, then refined by log
//! scaling, normalization and Gaussian smoothing as configured.

use docbin_core::{GrayImageView, ImageError};

use crate::config::HistogramConfig;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Joint histogram of (intensity bin, neighbourhood-mean bin).
///
/// Stored row-major as `counts[i * bins + j]` with `i` the intensity bin.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram2D {
    bins: usize,
    counts: Vec<f64>,
}

/// Uniform bucketing with width `256 / bins`.
#[inline]
pub fn bin_of(value: u8, bins: usize) -> usize {
    value as usize * bins / 256
}

impl Histogram2D {
    pub fn new(bins: usize) -> Self {
        Self {
            bins,
            counts: vec![0.0; bins * bins],
        }
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.counts[i * self.bins + j]
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Number of cells with positive mass.
    pub fn occupied_cells(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0.0).count()
    }

    /// Count every pixel of a row band.
    pub fn accumulate(&mut self, intensity: &[u8], means: &[u8]) {
        let bins = self.bins;
        for (&v, &m) in intensity.iter().zip(means) {
            self.counts[bin_of(v, bins) * bins + bin_of(m, bins)] += 1.0;
        }
    }

    /// Elementwise addition; associative and commutative.
    pub fn merge(&mut self, other: &Histogram2D) {
        debug_assert_eq!(self.bins, other.bins);
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += *b;
        }
    }

    pub fn log_scale(&mut self) {
        for c in &mut self.counts {
            *c = c.ln_1p();
        }
    }

    pub fn normalize(&mut self) {
        let total = self.total();
        if total > 0.0 {
            for c in &mut self.counts {
                *c /= total;
            }
        }
    }

    /// Separable Gaussian smoothing that keeps the total mass.
    ///
    /// Each source cell scatters its mass over the in-range cells only, with
    /// the kernel renormalized over them, so truncation at the histogram
    /// edges does not leak mass.
    pub fn smooth(&mut self, sigma: f64) {
        if sigma <= 0.0 {
            return;
        }
        let radius = (3.0 * sigma).ceil() as isize;
        let kernel: Vec<f64> = (-radius..=radius)
            .map(|d| (-((d * d) as f64) / (2.0 * sigma * sigma)).exp())
            .collect();
        let n = self.bins;
        let scatter = |src: &[f64], stride: usize, dst: &mut [f64]| {
            for k in 0..n {
                let c = src[k * stride];
                if c == 0.0 {
                    continue;
                }
                let lo = (k as isize - radius).max(0);
                let hi = (k as isize + radius).min(n as isize - 1);
                let norm: f64 = (lo..=hi).map(|t| kernel[(t - k as isize + radius) as usize]).sum();
                for t in lo..=hi {
                    let w = kernel[(t - k as isize + radius) as usize] / norm;
                    dst[t as usize * stride] += c * w;
                }
            }
        };

        // along the mean axis (within each row)
        let mut tmp = vec![0.0; n * n];
        for i in 0..n {
            scatter(&self.counts[i * n..], 1, &mut tmp[i * n..]);
        }
        // along the intensity axis (down each column)
        let mut out = vec![0.0; n * n];
        for j in 0..n {
            scatter(&tmp[j..], n, &mut out[j..]);
        }
        self.counts = out;
    }
}

/// Accumulate over `bands` row partitions and merge the partial histograms.
pub fn accumulate_partitioned(
    src: &GrayImageView<'_>,
    means: &GrayImageView<'_>,
    bins: usize,
    bands: usize,
) -> Histogram2D {
    let band_rows = src.height.div_ceil(bands.max(1)).max(1);
    let chunk = band_rows * src.width;
    let partial = |(a, b): (&[u8], &[u8])| {
        let mut h = Histogram2D::new(bins);
        h.accumulate(a, b);
        h
    };
    let merge = |mut a: Histogram2D, b: Histogram2D| {
        a.merge(&b);
        a
    };

    #[cfg(feature = "rayon")]
    let hist = src
        .data
        .par_chunks(chunk)
        .zip(means.data.par_chunks(chunk))
        .map(partial)
        .reduce(|| Histogram2D::new(bins), merge);
    #[cfg(not(feature = "rayon"))]
    let hist = src
        .data
        .chunks(chunk)
        .zip(means.data.chunks(chunk))
        .map(partial)
        .fold(Histogram2D::new(bins), merge);
    hist
}

pub(crate) fn default_bands() -> usize {
    #[cfg(feature = "rayon")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "rayon"))]
    {
        1
    }
}

/// Build the refined histogram of an image and its neighbourhood means.
pub fn build_histogram(
    src: &GrayImageView<'_>,
    means: &GrayImageView<'_>,
    bins: usize,
    cfg: &HistogramConfig,
) -> Result<Histogram2D, ImageError> {
    src.validate()?;
    means.validate()?;
    if src.dims() != means.dims() {
        return Err(ImageError::DimensionMismatch {
            expected: src.dims(),
            actual: means.dims(),
        });
    }
    let hist = accumulate_partitioned(src, means, bins, default_bands());
    Ok(refine_histogram(hist, cfg))
}

/// Apply log scaling, normalization and smoothing, in that order.
pub fn refine_histogram(mut hist: Histogram2D, cfg: &HistogramConfig) -> Histogram2D {
    if cfg.log_scale {
        hist.log_scale();
    }
    if cfg.normalize {
        hist.normalize();
    }
    hist.smooth(cfg.smoothing);
    hist
}
