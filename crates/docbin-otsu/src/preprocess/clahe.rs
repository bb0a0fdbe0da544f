//! Contrast-limited adaptive histogram equalization (Zuiderveld, 1994).

use docbin_core::{GrayImage, GrayImageView, ImageError};

use crate::config::ClaheConfig;
use crate::neighborhood::fill_rows;

const MIN_TILE_SIDE: usize = 8;

/// Clip bins above `clip_limit × uniform height` and spread the excess evenly.
fn clip_histogram(hist: &mut [u32; 256], tile_pixels: usize, clip_limit: f32) {
    let clip = ((tile_pixels as f32 / 256.0) * clip_limit).ceil().max(1.0) as u32;
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let per_bin = excess / 256;
    let remainder = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if remainder > 0 {
        let step = (256 / remainder).max(1);
        for bin in hist.iter_mut().step_by(step).take(remainder) {
            *bin += 1;
        }
    }
}

fn build_lut(hist: &[u32; 256], tile_pixels: usize) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (i, &h) in hist.iter().enumerate() {
        cdf += h;
        lut[i] = (cdf as f32 * 255.0 / tile_pixels as f32)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Tiles per axis, reduced so that no tile is narrower than 8 pixels.
fn tiles_along(len: usize, requested: usize) -> usize {
    requested.min((len / MIN_TILE_SIDE).max(1))
}

pub fn clahe(src: &GrayImageView<'_>, cfg: &ClaheConfig) -> Result<GrayImage, ImageError> {
    src.validate()?;
    let (w, h) = src.dims();
    let cols = tiles_along(w, cfg.tiles);
    let rows = tiles_along(h, cfg.tiles);
    let tile_w = w.div_ceil(cols);
    let tile_h = h.div_ceil(rows);
    let (cols, rows) = (w.div_ceil(tile_w), h.div_ceil(tile_h));

    let mut luts = Vec::with_capacity(cols * rows);
    for ty in 0..rows {
        for tx in 0..cols {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            let (x1, y1) = ((x0 + tile_w).min(w), (y0 + tile_h).min(h));
            let pixels = (x1 - x0) * (y1 - y0);
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for &v in &src.row(y)[x0..x1] {
                    hist[v as usize] += 1;
                }
            }
            clip_histogram(&mut hist, pixels, cfg.clip_limit);
            luts.push(build_lut(&hist, pixels));
        }
    }

    // bilinear blend of the four surrounding tile mappings
    let neighbours = |p: usize, tile: usize, n: usize| -> (usize, usize, f32) {
        let f = (p as f32 + 0.5) / tile as f32 - 0.5;
        if f <= 0.0 {
            return (0, 0, 0.0);
        }
        let i0 = (f.floor() as usize).min(n - 1);
        let i1 = (i0 + 1).min(n - 1);
        let a = if i0 == i1 { 0.0 } else { f - i0 as f32 };
        (i0, i1, a)
    };

    let mut out = GrayImage::filled(w, h, 0);
    fill_rows(&mut out.data, w, |y, row| {
        let (ty0, ty1, ay) = neighbours(y, tile_h, rows);
        for (x, px) in row.iter_mut().enumerate() {
            let (tx0, tx1, ax) = neighbours(x, tile_w, cols);
            let v = src.get(x, y) as usize;
            let at = |tx: usize, ty: usize| luts[ty * cols + tx][v] as f32;
            let top = at(tx0, ty0) * (1.0 - ax) + at(tx1, ty0) * ax;
            let bottom = at(tx0, ty1) * (1.0 - ax) + at(tx1, ty1) * ax;
            let val = top * (1.0 - ay) + bottom * ay;
            *px = val.round().clamp(0.0, 255.0) as u8;
        }
    });
    Ok(out)
}
