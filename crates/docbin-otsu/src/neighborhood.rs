//! Per-pixel neighbourhood means, the second axis of the 2D histogram.
//!
//! The source is padded once with reflect-101 borders (`dcb|abcd|cba`), so
//! every strategy reads inside the padded buffer and never out of bounds.
//! Rectangular windows use a summed-area table; circular and
//! distance-weighted windows use precomputed kernel taps per radius.

use docbin_core::{reflect101, GrayImage, GrayImageView, ImageError};

use crate::config::{NeighborhoodConfig, NeighborhoodKind, WindowSize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Source image extended by `pad` reflected samples on every side.
pub(crate) struct Padded {
    pad: usize,
    stride: usize,
    data: Vec<u8>,
}

impl Padded {
    pub(crate) fn new(src: &GrayImageView<'_>, pad: usize) -> Self {
        let stride = src.width + 2 * pad;
        let rows = src.height + 2 * pad;
        let mut data = Vec::with_capacity(stride * rows);
        for py in 0..rows {
            let sy = reflect101(py as isize - pad as isize, src.height);
            let row = src.row(sy);
            for px in 0..stride {
                data.push(row[reflect101(px as isize - pad as isize, src.width)]);
            }
        }
        Self { pad, stride, data }
    }

    #[inline]
    fn at(&self, x: usize, y: usize, dx: isize, dy: isize) -> u8 {
        let px = (x + self.pad) as isize + dx;
        let py = (y + self.pad) as isize + dy;
        self.data[py as usize * self.stride + px as usize]
    }
}

/// Integral images of values and squared values over a padded buffer.
pub(crate) struct SummedArea<'a> {
    padded: &'a Padded,
    stride: usize,
    sum: Vec<u64>,
    sq: Vec<u64>,
}

impl<'a> SummedArea<'a> {
    pub(crate) fn new(padded: &'a Padded) -> Self {
        let w = padded.stride;
        let h = padded.data.len() / w;
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sq = vec![0u64; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = padded.data[y * w + x] as u64;
                row_sum += v;
                row_sq += v * v;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row_sum;
                sq[i] = sq[i - stride] + row_sq;
            }
        }
        Self {
            padded,
            stride,
            sum,
            sq,
        }
    }

    /// Sum, squared sum and sample count of the square window of radius `r`
    /// centred on source pixel `(x, y)`.
    #[inline]
    fn window(&self, x: usize, y: usize, r: usize) -> (u64, u64, u64) {
        let p = self.padded.pad;
        let (x0, y0) = (x + p - r, y + p - r);
        let (x1, y1) = (x + p + r + 1, y + p + r + 1);
        let s = self.stride;
        let rect = |t: &[u64]| t[y1 * s + x1] + t[y0 * s + x0] - t[y0 * s + x1] - t[y1 * s + x0];
        let side = (2 * r + 1) as u64;
        (rect(&self.sum), rect(&self.sq), side * side)
    }

    pub(crate) fn variance(&self, x: usize, y: usize, r: usize) -> f64 {
        let (s, q, n) = self.window(x, y, r);
        let n = n as f64;
        let mean = s as f64 / n;
        (q as f64 / n - mean * mean).max(0.0)
    }
}

/// Neighbourhood averaging strategy, chosen once per operation.
pub trait LocalMean: Sync {
    /// Mean over the odd `window` centred on `(x, y)`.
    fn mean_at(&self, x: usize, y: usize, window: usize) -> f64;
}

struct RectangularMean<'a> {
    sat: SummedArea<'a>,
}

impl LocalMean for RectangularMean<'_> {
    fn mean_at(&self, x: usize, y: usize, window: usize) -> f64 {
        let (s, _, n) = self.sat.window(x, y, window / 2);
        s as f64 / n as f64
    }
}

struct Kernel {
    taps: Vec<(isize, isize, f64)>,
    total: f64,
}

/// Weighted taps indexed by radius, used by the circular and Gaussian shapes.
struct KernelMean<'a> {
    padded: &'a Padded,
    kernels: Vec<Kernel>,
}

impl<'a> KernelMean<'a> {
    fn new(padded: &'a Padded, max_radius: usize, weight: impl Fn(isize, isize, usize) -> f64) -> Self {
        let kernels = (0..=max_radius)
            .map(|r| {
                let ri = r as isize;
                let mut taps = Vec::new();
                for dy in -ri..=ri {
                    for dx in -ri..=ri {
                        let w = weight(dx, dy, r);
                        if w > 0.0 {
                            taps.push((dx, dy, w));
                        }
                    }
                }
                let total = taps.iter().map(|t| t.2).sum();
                Kernel { taps, total }
            })
            .collect();
        Self { padded, kernels }
    }
}

impl LocalMean for KernelMean<'_> {
    fn mean_at(&self, x: usize, y: usize, window: usize) -> f64 {
        let k = &self.kernels[window / 2];
        let acc: f64 = k
            .taps
            .iter()
            .map(|&(dx, dy, w)| w * self.padded.at(x, y, dx, dy) as f64)
            .sum();
        acc / k.total
    }
}

fn disk_weight(dx: isize, dy: isize, r: usize) -> f64 {
    let r = r as isize;
    if dx * dx + dy * dy <= r * r {
        1.0
    } else {
        0.0
    }
}

fn gaussian_weight(dx: isize, dy: isize, r: usize) -> f64 {
    let sigma = (r as f64 / 2.0).max(0.5);
    let d2 = (dx * dx + dy * dy) as f64;
    (-d2 / (2.0 * sigma * sigma)).exp()
}

/// Fill `out` one row of `width` samples at a time, in parallel with `rayon`.
pub(crate) fn fill_rows<T: Send>(
    out: &mut [T],
    width: usize,
    f: impl Fn(usize, &mut [T]) + Sync + Send,
) {
    #[cfg(feature = "rayon")]
    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
    #[cfg(not(feature = "rayon"))]
    out.chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

/// Per-pixel window sizes for the configured sizing rule.
pub fn window_map(
    src: &GrayImageView<'_>,
    window: &WindowSize,
) -> Result<Vec<usize>, ImageError> {
    src.validate()?;
    let mut out = vec![0usize; src.width * src.height];
    match window {
        WindowSize::Fixed(w) => out.fill(*w),
        WindowSize::Adaptive(policy) => {
            let r = policy.probe_window / 2;
            let padded = Padded::new(src, r);
            let sat = SummedArea::new(&padded);
            fill_rows(&mut out, src.width, |y, row| {
                for (x, w) in row.iter_mut().enumerate() {
                    *w = policy.window_for(sat.variance(x, y, r));
                }
            });
        }
    }
    Ok(out)
}

/// Rounded neighbourhood mean of every pixel.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, cfg), fields(width = src.width, height = src.height))
)]
pub fn local_means(
    src: &GrayImageView<'_>,
    cfg: &NeighborhoodConfig,
) -> Result<GrayImage, ImageError> {
    let windows = window_map(src, &cfg.window)?;
    let max_radius = cfg.window.max_window() / 2;
    let padded = Padded::new(src, max_radius);
    let strategy: Box<dyn LocalMean + '_> = match cfg.kind {
        NeighborhoodKind::Rectangular => Box::new(RectangularMean {
            sat: SummedArea::new(&padded),
        }),
        NeighborhoodKind::Circular => Box::new(KernelMean::new(&padded, max_radius, disk_weight)),
        NeighborhoodKind::DistanceWeighted => {
            Box::new(KernelMean::new(&padded, max_radius, gaussian_weight))
        }
    };

    let width = src.width;
    let mut data = vec![0u8; width * src.height];
    fill_rows(&mut data, width, |y, row| {
        for (x, v) in row.iter_mut().enumerate() {
            let m = strategy.mean_at(x, y, windows[y * width + x]);
            *v = m.round().clamp(0.0, 255.0) as u8;
        }
    });
    Ok(GrayImage {
        width,
        height: src.height,
        data,
    })
}
