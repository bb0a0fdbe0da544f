//! Intensity statistics of the original image under the produced classes.

use docbin_core::{BinaryMask, GrayImageView};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_dims, MetricsError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub pixels: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContrastStats {
    pub foreground: ClassStats,
    pub background: ClassStats,
    /// `(mean_bg - mean_fg)² / (var_bg + var_fg)`; `None` when a class is
    /// empty. Zero pooled variance divides by 1 instead.
    pub fisher_separation: Option<f64>,
    pub zero_variance: bool,
}

fn stats(sum: f64, sq: f64, n: usize) -> ClassStats {
    if n == 0 {
        return ClassStats::default();
    }
    let mean = sum / n as f64;
    let var = (sq / n as f64 - mean * mean).max(0.0);
    ClassStats {
        pixels: n,
        mean,
        std_dev: var.sqrt(),
    }
}

pub fn contrast(mask: &BinaryMask, original: &GrayImageView<'_>) -> Result<ContrastStats, MetricsError> {
    original.validate()?;
    ensure_dims("original image", mask.dims(), original.dims())?;
    let mut acc = [(0.0f64, 0.0f64, 0usize); 2];
    for (&fg, &v) in mask.data.iter().zip(original.data) {
        let a = &mut acc[usize::from(fg)];
        let v = v as f64;
        a.0 += v;
        a.1 += v * v;
        a.2 += 1;
    }
    let background = stats(acc[0].0, acc[0].1, acc[0].2);
    let foreground = stats(acc[1].0, acc[1].1, acc[1].2);

    let pooled = background.std_dev.powi(2) + foreground.std_dev.powi(2);
    let zero_variance = pooled == 0.0;
    let fisher_separation = (background.pixels > 0 && foreground.pixels > 0).then(|| {
        let d = background.mean - foreground.mean;
        d * d / if zero_variance { 1.0 } else { pooled }
    });
    Ok(ContrastStats {
        foreground,
        background,
        fisher_separation,
        zero_variance: zero_variance && fisher_separation.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use docbin_core::GrayImage;

    #[test]
    fn separates_two_levels() {
        let img = GrayImage::from_fn(4, 4, |x, y| match (x < 2, y % 2) {
            (true, 0) => 10,
            (true, _) => 30,
            (false, 0) => 200,
            (false, _) => 220,
        });
        let mask = BinaryMask::from_fn(4, 4, |x, _| x < 2);
        let s = contrast(&mask, &img.view()).expect("contrast");
        assert_eq!(s.foreground.pixels, 8);
        assert_relative_eq!(s.foreground.mean, 20.0);
        assert_relative_eq!(s.foreground.std_dev, 10.0);
        assert_relative_eq!(s.background.mean, 210.0);
        assert_relative_eq!(s.fisher_separation.expect("fisher"), 190.0 * 190.0 / 200.0);
        assert!(!s.zero_variance);
    }

    #[test]
    fn flat_classes_divide_by_one() {
        let img = GrayImage::from_fn(4, 4, |x, _| if x < 2 { 0 } else { 100 });
        let mask = BinaryMask::from_fn(4, 4, |x, _| x < 2);
        let s = contrast(&mask, &img.view()).expect("contrast");
        assert!(s.zero_variance);
        assert_relative_eq!(s.fisher_separation.expect("fisher"), 10_000.0);
    }

    #[test]
    fn empty_class_has_no_separation() {
        let img = GrayImage::filled(4, 4, 50);
        let s = contrast(&BinaryMask::new(4, 4), &img.view()).expect("contrast");
        assert_eq!(s.fisher_separation, None);
        assert_eq!(s.foreground.pixels, 0);
    }

    #[test]
    fn original_must_match_mask() {
        let img = GrayImage::filled(4, 5, 50);
        assert!(contrast(&BinaryMask::new(4, 4), &img.view()).is_err());
    }
}
