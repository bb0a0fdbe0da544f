//! Multi-scale thresholding over an area-averaged image pyramid.
//!
//! Every level is thresholded independently with a window and bin count
//! scaled to its resolution. Masks are then merged coarse to fine: the
//! running mask is upsampled to soft coverage of the next finer level and
//! combined with that level's own mask by the configured [`CombineRule`].

use docbin_core::{mask_coverage, BinaryMask, GrayImage, GrayImageView, ImageError, Interpolation};
use serde::{Deserialize, Serialize};

use super::{BinarizationMethod, MethodDetails, MethodOutput, RunContext};
use crate::config::{CombineRule, PyramidConfig, WindowSize};
use crate::engine::{ThresholdEngine, Thresholded};
use crate::error::BinarizeError;
use crate::search::ThresholdPair;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// One pyramid level and its own thresholding result.
#[derive(Clone, Debug)]
pub struct PyramidLevel {
    pub index: usize,
    /// Downsampling factor relative to level 0.
    pub scale: usize,
    pub image: GrayImage,
    pub mask: BinaryMask,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub index: usize,
    pub width: usize,
    pub height: usize,
    pub window: usize,
    pub bins: usize,
    pub pair: ThresholdPair,
    pub fallback: bool,
    pub foreground: usize,
}

/// Halve both sides (rounding up), averaging the samples of each 2x2 block
/// that fall inside the image.
pub fn downsample2(src: &GrayImageView<'_>) -> GrayImage {
    let (w, h) = (src.width.div_ceil(2), src.height.div_ceil(2));
    GrayImage::from_fn(w, h, |x, y| {
        let mut sum = 0u32;
        let mut n = 0u32;
        for sy in 2 * y..(2 * y + 2).min(src.height) {
            for sx in 2 * x..(2 * x + 2).min(src.width) {
                sum += src.get(sx, sy) as u32;
                n += 1;
            }
        }
        ((sum + n / 2) / n) as u8
    })
}

/// Level 0 is a copy of `src`; each further level halves the previous one.
pub fn build_pyramid(src: &GrayImageView<'_>, levels: usize) -> Vec<GrayImage> {
    let mut out = vec![src.to_image()];
    for _ in 1..levels {
        let next = match out.last() {
            Some(prev) => downsample2(&prev.view()),
            None => break,
        };
        out.push(next);
    }
    out
}

fn odd_at_least_3(v: usize) -> usize {
    let v = v.max(3);
    if v % 2 == 0 {
        v + 1
    } else {
        v
    }
}

/// Merge level masks from the coarsest to level 0.
///
/// Each level's mask must match its image, and the running mask must be the
/// half-resolution size of the next finer level; anything else is a
/// [`BinarizeError::Combination`].
pub fn recombine(
    levels: &[PyramidLevel],
    rule: CombineRule,
    interpolation: Interpolation,
) -> Result<BinaryMask, BinarizeError> {
    for level in levels {
        if level.mask.dims() != level.image.dims() {
            return Err(BinarizeError::Combination {
                level: level.index,
                expected: level.image.dims(),
                actual: level.mask.dims(),
            });
        }
    }
    let Some((coarsest, finer)) = levels.split_last() else {
        return Err(BinarizeError::Combination {
            level: 0,
            expected: (0, 0),
            actual: (0, 0),
        });
    };

    let mut running = coarsest.mask.clone();
    let mut running_level = coarsest.index;
    for fine in finer.iter().rev() {
        let (fw, fh) = fine.image.dims();
        let expected = (fw.div_ceil(2), fh.div_ceil(2));
        if running.dims() != expected {
            return Err(BinarizeError::Combination {
                level: running_level,
                expected,
                actual: running.dims(),
            });
        }
        let coverage = mask_coverage(&running, fw, fh, interpolation);
        let data = fine
            .mask
            .data
            .iter()
            .zip(&coverage)
            .map(|(&f, &c)| match rule {
                CombineRule::Agreement => f && c >= 0.5,
                CombineRule::Vote { fine_weight } => {
                    let fv = if f { 1.0 } else { 0.0 };
                    fine_weight * fv + (1.0 - fine_weight) * c >= 0.5
                }
            })
            .collect();
        running = BinaryMask {
            width: fw,
            height: fh,
            data,
        };
        running_level = fine.index;
    }
    Ok(running)
}

/// Pyramid method: global layout from coarse levels, detail from fine ones.
pub struct MultiScale {
    engine: ThresholdEngine,
    config: PyramidConfig,
}

impl MultiScale {
    pub fn new(engine: ThresholdEngine, config: PyramidConfig) -> Self {
        Self { engine, config }
    }

    /// Engine and bin count for level `k` of an image whose level-k copy is
    /// `img`.
    fn level_engine(&self, k: usize, img: &GrayImageView<'_>) -> (ThresholdEngine, usize, usize) {
        let engine = match &self.engine.neighborhood().window {
            WindowSize::Fixed(w) => self
                .engine
                .with_window(WindowSize::Fixed(odd_at_least_3(w >> k))),
            WindowSize::Adaptive(_) => self.engine.clone(),
        };
        let window = engine.neighborhood().window.max_window();
        let bins = match self.engine.histogram().bins {
            Some(b) => (b >> k).max(32),
            None => engine.resolve_bins(img),
        };
        (engine, window, bins)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, images), fields(levels = images.len()))
    )]
    fn threshold_levels(
        &self,
        images: &[GrayImage],
    ) -> Result<Vec<(usize, usize, Thresholded)>, BinarizeError> {
        let run = |(k, img): (usize, &GrayImage)| {
            let view = img.view();
            let (engine, window, bins) = self.level_engine(k, &view);
            let context = format!("pyramid level {k}");
            engine
                .threshold(&view, bins, &context)
                .map(|t| (window, bins, t))
        };
        #[cfg(feature = "rayon")]
        let results: Result<Vec<_>, ImageError> = images.par_iter().enumerate().map(run).collect();
        #[cfg(not(feature = "rayon"))]
        let results: Result<Vec<_>, ImageError> = images.iter().enumerate().map(run).collect();
        results.map_err(BinarizeError::from)
    }
}

impl BinarizationMethod for MultiScale {
    fn name(&self) -> &'static str {
        "multi_scale"
    }

    fn binarize(
        &self,
        src: &GrayImageView<'_>,
        ctx: &RunContext<'_>,
    ) -> Result<MethodOutput, BinarizeError> {
        let images = ctx.stage("pyramid.build", || build_pyramid(src, self.config.levels));
        let results = ctx.stage("pyramid.threshold", || self.threshold_levels(&images))?;

        let mut levels = Vec::with_capacity(images.len());
        let mut summaries = Vec::with_capacity(images.len());
        let mut warnings = Vec::new();
        for (index, (image, (window, bins, t))) in images.into_iter().zip(results).enumerate() {
            summaries.push(LevelSummary {
                index,
                width: image.width,
                height: image.height,
                window,
                bins,
                pair: t.outcome.pair,
                fallback: t.outcome.fallback,
                foreground: t.mask.foreground_count(),
            });
            warnings.extend(t.warnings);
            levels.push(PyramidLevel {
                index,
                scale: 1 << index,
                image,
                mask: t.mask,
            });
        }

        let mask = ctx.stage("pyramid.recombine", || {
            recombine(&levels, self.config.combine, ctx.interpolation)
        })?;
        Ok(MethodOutput {
            mask,
            details: MethodDetails::MultiScale { levels: summaries },
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(index: usize, mask: BinaryMask) -> PyramidLevel {
        PyramidLevel {
            index,
            scale: 1 << index,
            image: GrayImage::filled(mask.width, mask.height, 0),
            mask,
        }
    }

    #[test]
    fn downsample_averages_blocks_and_rounds_up_dims() {
        let img = GrayImage::from_fn(5, 3, |x, y| (x * 10 + y * 100) as u8);
        let d = downsample2(&img.view());
        assert_eq!(d.dims(), (3, 2));
        assert_eq!(d.get(0, 0), 55); // (0 + 10 + 100 + 110) / 4
        assert_eq!(d.get(2, 0), 90); // (40 + 140) / 2
        assert_eq!(d.get(2, 1), 240);
    }

    #[test]
    fn pyramid_has_requested_depth() {
        let img = GrayImage::filled(33, 20, 7);
        let p = build_pyramid(&img.view(), 3);
        let dims: Vec<_> = p.iter().map(|l| l.dims()).collect();
        assert_eq!(dims, vec![(33, 20), (17, 10), (9, 5)]);
    }

    #[test]
    fn window_and_bins_shrink_per_level() {
        let engine = ThresholdEngine::new(
            crate::config::NeighborhoodConfig {
                window: WindowSize::Fixed(9),
                ..Default::default()
            },
            crate::config::HistogramConfig {
                bins: Some(128),
                ..Default::default()
            },
            Default::default(),
        );
        let m = MultiScale::new(engine, PyramidConfig::default());
        let img = GrayImage::filled(16, 16, 0);
        let (_, w1, b1) = m.level_engine(1, &img.view());
        let (_, w2, b2) = m.level_engine(2, &img.view());
        let (_, w3, b3) = m.level_engine(3, &img.view());
        assert_eq!((w1, b1), (5, 64));
        assert_eq!((w2, b2), (3, 32));
        assert_eq!((w3, b3), (3, 32));
    }

    #[test]
    fn vote_fills_holes_under_solid_coarse_foreground() {
        let mut fine = BinaryMask::from_fn(8, 8, |x, y| (2..6).contains(&x) && (2..6).contains(&y));
        fine.set(3, 3, false);
        let coarse = BinaryMask::from_fn(4, 4, |x, y| (1..3).contains(&x) && (1..3).contains(&y));
        let levels = [level(0, fine.clone()), level(1, coarse)];

        let voted = recombine(&levels, CombineRule::default(), Interpolation::Bilinear)
            .expect("recombine");
        assert!(voted.get(3, 3));
        assert_eq!(voted.foreground_count(), 16);

        let agreed = recombine(&levels, CombineRule::Agreement, Interpolation::Bilinear)
            .expect("recombine");
        assert!(!agreed.get(3, 3));
    }

    #[test]
    fn mismatched_level_is_a_combination_error() {
        let levels = [
            level(0, BinaryMask::new(8, 8)),
            level(1, BinaryMask::new(3, 4)),
        ];
        let err = recombine(&levels, CombineRule::default(), Interpolation::Nearest).unwrap_err();
        assert_eq!(
            err,
            BinarizeError::Combination {
                level: 1,
                expected: (4, 4),
                actual: (3, 4)
            }
        );
    }

    #[test]
    fn mask_not_matching_its_image_is_rejected() {
        let mut bad = level(1, BinaryMask::new(4, 4));
        bad.image = GrayImage::filled(4, 5, 0);
        let levels = [level(0, BinaryMask::new(8, 8)), bad];
        let err = recombine(&levels, CombineRule::Agreement, Interpolation::Nearest).unwrap_err();
        assert!(matches!(err, BinarizeError::Combination { level: 1, .. }));
    }
}
