//! Neighbourhood means, histogram and search bundled into one reusable step.

use docbin_core::{BinaryMask, GrayImage, GrayImageView, ImageError, Warning};

use crate::config::{HistogramConfig, NeighborhoodConfig, ProcessingConfig, SearchConfig, WindowSize};
use crate::histogram::{accumulate_partitioned, default_bands, refine_histogram, Histogram2D};
use crate::neighborhood::local_means;
use crate::search::{search_otsu_2d, SearchOutcome, ThresholdPair};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Threshold of one image (or tile, or pyramid level).
#[derive(Clone, Debug)]
pub struct Thresholded {
    pub mask: BinaryMask,
    pub outcome: SearchOutcome,
    pub warnings: Vec<Warning>,
}

/// The shared search core: local means, 2D histogram, Otsu search and
/// classification.
#[derive(Clone, Debug)]
pub struct ThresholdEngine {
    neighborhood: NeighborhoodConfig,
    histogram: HistogramConfig,
    search: SearchConfig,
}

impl ThresholdEngine {
    pub fn new(
        neighborhood: NeighborhoodConfig,
        histogram: HistogramConfig,
        search: SearchConfig,
    ) -> Self {
        Self {
            neighborhood,
            histogram,
            search,
        }
    }

    pub fn from_config(cfg: &ProcessingConfig) -> Self {
        Self::new(
            cfg.neighborhood.clone(),
            cfg.histogram.clone(),
            cfg.search.clone(),
        )
    }

    /// Same engine with a different window rule.
    pub fn with_window(&self, window: WindowSize) -> Self {
        let mut out = self.clone();
        out.neighborhood.window = window;
        out
    }

    #[inline]
    pub fn neighborhood(&self) -> &NeighborhoodConfig {
        &self.neighborhood
    }

    #[inline]
    pub fn histogram(&self) -> &HistogramConfig {
        &self.histogram
    }

    /// Explicit bin count, or the auto policy applied to `src`.
    pub fn resolve_bins(&self, src: &GrayImageView<'_>) -> usize {
        match self.histogram.bins {
            Some(b) => b,
            None => {
                let (lo, hi) = src.min_max();
                self.histogram
                    .auto
                    .bins_for(src.width * src.height, lo, hi)
            }
        }
    }

    pub fn means(&self, src: &GrayImageView<'_>) -> Result<GrayImage, ImageError> {
        local_means(src, &self.neighborhood)
    }

    /// Histogram of `src` against its means, plus the raw occupied-cell count.
    pub fn histogram_of(
        &self,
        src: &GrayImageView<'_>,
        means: &GrayImageView<'_>,
        bins: usize,
    ) -> (Histogram2D, usize) {
        let raw = accumulate_partitioned(src, means, bins, default_bands());
        let occupied = raw.occupied_cells();
        (refine_histogram(raw, &self.histogram), occupied)
    }

    /// Search the cutoffs of `src` without classifying it.
    pub fn search(
        &self,
        src: &GrayImageView<'_>,
        bins: usize,
    ) -> Result<(GrayImage, SearchOutcome), ImageError> {
        src.validate()?;
        let means = self.means(src)?;
        let (hist, occupied) = self.histogram_of(src, &means.view(), bins);
        let outcome = if occupied <= 1 {
            SearchOutcome::degenerate(bins)
        } else {
            search_otsu_2d(&hist, &self.search)
        };
        Ok((means, outcome))
    }

    /// Warnings implied by a search outcome.
    pub fn assess(&self, outcome: &SearchOutcome, context: &str) -> Option<Warning> {
        let ratio = outcome.separation_ratio();
        if outcome.fallback || ratio < self.search.poor_separation_ratio {
            Some(Warning::PoorSeparation {
                context: context.to_string(),
                ratio,
                fallback: outcome.fallback,
            })
        } else {
            None
        }
    }

    /// Search and classify `src`.
    pub fn threshold(
        &self,
        src: &GrayImageView<'_>,
        bins: usize,
        context: &str,
    ) -> Result<Thresholded, ImageError> {
        let (means, outcome) = self.search(src, bins)?;
        let mask = classify(src, &means.view(), outcome.pair, bins);
        let warnings = self.assess(&outcome, context).into_iter().collect();
        Ok(Thresholded {
            mask,
            outcome,
            warnings,
        })
    }

    /// Classify `src` with a cutoff found elsewhere.
    pub fn apply_pair(
        &self,
        src: &GrayImageView<'_>,
        pair: ThresholdPair,
        bins: usize,
    ) -> Result<BinaryMask, ImageError> {
        src.validate()?;
        let means = self.means(src)?;
        Ok(classify(src, &means.view(), pair, bins))
    }
}

/// Per-pixel lookup of both bins against the cutoff.
pub fn classify(
    src: &GrayImageView<'_>,
    means: &GrayImageView<'_>,
    pair: ThresholdPair,
    bins: usize,
) -> BinaryMask {
    #[cfg(feature = "rayon")]
    let data = src
        .data
        .par_iter()
        .zip(means.data.par_iter())
        .map(|(&v, &m)| pair.is_foreground(v, m, bins))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let data = src
        .data
        .iter()
        .zip(means.data.iter())
        .map(|(&v, &m)| pair.is_foreground(v, m, bins))
        .collect();
    BinaryMask {
        width: src.width,
        height: src.height,
        data,
    }
}
