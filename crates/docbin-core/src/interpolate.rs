//! Resampling of gray images and masks.
//!
//! Coordinates are pixel-centre aligned: destination pixel `x` maps to source
//! coordinate `(x + 0.5) * src_w / dst_w - 0.5`. Samples outside the source
//! are clamped to the nearest edge.

use serde::{Deserialize, Serialize};

use crate::image::{clamp_index, GrayImage, GrayImageView};
use crate::mask::BinaryMask;

/// Resampling kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    /// Keys cubic convolution with `a = -0.5`.
    Bicubic,
}

const KEYS_A: f32 = -0.5;

#[inline]
fn keys_weight(t: f32) -> f32 {
    let t = t.abs();
    if t <= 1.0 {
        ((KEYS_A + 2.0) * t - (KEYS_A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((KEYS_A * t - 5.0 * KEYS_A) * t + 8.0 * KEYS_A) * t - 4.0 * KEYS_A
    } else {
        0.0
    }
}

fn sample<F>(get: &F, w: usize, h: usize, x: f32, y: f32, method: Interpolation) -> f32
where
    F: Fn(usize, usize) -> f32,
{
    match method {
        Interpolation::Nearest => {
            let xi = clamp_index(x.round() as isize, w);
            let yi = clamp_index(y.round() as isize, h);
            get(xi, yi)
        }
        Interpolation::Bilinear => {
            let x0 = x.floor() as isize;
            let y0 = y.floor() as isize;
            let fx = x - x0 as f32;
            let fy = y - y0 as f32;
            let at = |dx: isize, dy: isize| get(clamp_index(x0 + dx, w), clamp_index(y0 + dy, h));
            let (p00, p10, p01, p11) = (at(0, 0), at(1, 0), at(0, 1), at(1, 1));
            let a = p00 + fx * (p10 - p00);
            let b = p01 + fx * (p11 - p01);
            a + fy * (b - a)
        }
        Interpolation::Bicubic => {
            let x0 = x.floor() as isize;
            let y0 = y.floor() as isize;
            let fx = x - x0 as f32;
            let fy = y - y0 as f32;
            let mut acc = 0.0f32;
            for j in -1..=2isize {
                let wy = keys_weight(fy - j as f32);
                let yi = clamp_index(y0 + j, h);
                for i in -1..=2isize {
                    let wx = keys_weight(fx - i as f32);
                    acc += wx * wy * get(clamp_index(x0 + i, w), yi);
                }
            }
            acc
        }
    }
}

fn resample<F>(
    get: F,
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
    method: Interpolation,
) -> Vec<f32>
where
    F: Fn(usize, usize) -> f32,
{
    let sx = src_w as f32 / dst_w as f32;
    let sy = src_h as f32 / dst_h as f32;
    let mut out = Vec::with_capacity(dst_w * dst_h);
    for y in 0..dst_h {
        let fy = (y as f32 + 0.5) * sy - 0.5;
        for x in 0..dst_w {
            let fx = (x as f32 + 0.5) * sx - 0.5;
            out.push(sample(&get, src_w, src_h, fx, fy, method));
        }
    }
    out
}

/// Resize a gray image to `width × height`.
pub fn resize_gray(
    src: &GrayImageView<'_>,
    width: usize,
    height: usize,
    method: Interpolation,
) -> GrayImage {
    let values = resample(
        |x, y| src.get(x, y) as f32,
        src.width,
        src.height,
        width,
        height,
        method,
    );
    GrayImage {
        width,
        height,
        data: values
            .into_iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect(),
    }
}

/// Upsample a mask to soft foreground coverage in `[0, 1]`.
///
/// Bicubic is evaluated as bilinear so that coverage never overshoots.
pub fn mask_coverage(
    mask: &BinaryMask,
    width: usize,
    height: usize,
    method: Interpolation,
) -> Vec<f32> {
    let method = match method {
        Interpolation::Bicubic => Interpolation::Bilinear,
        m => m,
    };
    resample(
        |x, y| if mask.get(x, y) { 1.0 } else { 0.0 },
        mask.width,
        mask.height,
        width,
        height,
        method,
    )
}

/// Resize a mask; a pixel is foreground when its coverage reaches one half.
pub fn resize_mask(
    mask: &BinaryMask,
    width: usize,
    height: usize,
    method: Interpolation,
) -> BinaryMask {
    let cov = mask_coverage(mask, width, height, method);
    BinaryMask {
        width,
        height,
        data: cov.into_iter().map(|c| c >= 0.5).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn keys_kernel_interpolates_and_sums_to_one() {
        assert_abs_diff_eq!(keys_weight(0.0), 1.0);
        assert_abs_diff_eq!(keys_weight(1.0), 0.0);
        assert_abs_diff_eq!(keys_weight(2.0), 0.0);
        let t = 0.3f32;
        let sum: f32 = (-1..=2).map(|i| keys_weight(t - i as f32)).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn identity_resize_keeps_pixels() {
        let img = GrayImage::from_fn(5, 4, |x, y| (x * 40 + y * 7) as u8);
        for method in [
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Bicubic,
        ] {
            assert_eq!(resize_gray(&img.view(), 5, 4, method), img);
        }
    }

    #[test]
    fn solid_coarse_block_gives_full_coverage_inside() {
        let coarse = BinaryMask::from_fn(4, 4, |x, y| (1..3).contains(&x) && (1..3).contains(&y));
        let cov = mask_coverage(&coarse, 8, 8, Interpolation::Bilinear);
        // fine (3..5) lies between coarse centres 1 and 2
        assert_eq!(cov[3 * 8 + 3], 1.0);
        assert_eq!(cov[4 * 8 + 4], 1.0);
        assert!(cov[2 * 8 + 2] < 1.0);
        assert_eq!(cov[0], 0.0);
    }

    #[test]
    fn nearest_upscale_doubles_pixels() {
        let m = BinaryMask::from_fn(2, 1, |x, _| x == 1);
        let up = resize_mask(&m, 4, 1, Interpolation::Nearest);
        assert_eq!(up.data, vec![false, false, true, true]);
    }
}
