use docbin_core::{GrayImage, GrayImageView, ImageError, ImageF32, Warning};

use super::gaussian::blur_f32;
use crate::config::HomomorphicConfig;

/// Illumination flattening in the log domain.
///
/// The log image is split into a low-pass illumination part (Gaussian with
/// `cfg.sigma`) and the reflectance residual, which are recombined with
/// `low_gain` and `high_gain` and min-max rescaled to 8 bits. A flat input is
/// returned unchanged together with a warning.
pub fn homomorphic_filter(
    src: &GrayImageView<'_>,
    cfg: &HomomorphicConfig,
) -> Result<(GrayImage, Option<Warning>), ImageError> {
    src.validate()?;
    let flat = |reason: &str| {
        (
            src.to_image(),
            Some(Warning::DegenerateInput {
                stage: "homomorphic".to_string(),
                reason: reason.to_string(),
            }),
        )
    };
    let (lo, hi) = src.min_max();
    if lo == hi {
        return Ok(flat("zero-variance input"));
    }

    let log = ImageF32 {
        width: src.width,
        height: src.height,
        data: src.data.iter().map(|&v| (v as f32).ln_1p()).collect(),
    };
    let illum = blur_f32(&log, cfg.sigma);
    let filtered: Vec<f32> = log
        .data
        .iter()
        .zip(&illum.data)
        .map(|(&l, &i)| (cfg.low_gain * i + cfg.high_gain * (l - i)).exp())
        .collect();

    let (min, max) = filtered
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(a, b), &v| {
            (a.min(v), b.max(v))
        });
    let span = max - min;
    if !(span.is_finite() && span > 0.0) {
        return Ok(flat("filtered image has no dynamic range"));
    }
    let out = ImageF32 {
        width: src.width,
        height: src.height,
        data: filtered
            .into_iter()
            .map(|v| (v - min) / span * 255.0)
            .collect(),
    };
    Ok((out.to_gray(), None))
}
