//! Distance-reciprocal distortion (Lu, Kot and Shi, 2004).

use docbin_core::BinaryMask;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_dims, MetricsError};

const RADIUS: usize = 2;
const SIZE: usize = 2 * RADIUS + 1;
const BLOCK: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrdScore {
    pub value: f64,
    /// Non-uniform 8x8 ground-truth blocks.
    pub nubn: usize,
    /// The normalizer fell back to 1 because every block is uniform.
    pub uniform_ground_truth: bool,
}

/// 5x5 reciprocal-distance weights, centre 0, summing to 1.
pub fn weight_matrix() -> [[f64; SIZE]; SIZE] {
    let mut w = [[0.0; SIZE]; SIZE];
    let mut sum = 0.0;
    for (i, row) in w.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let di = i as f64 - RADIUS as f64;
            let dj = j as f64 - RADIUS as f64;
            if di != 0.0 || dj != 0.0 {
                *cell = 1.0 / (di * di + dj * dj).sqrt();
                sum += *cell;
            }
        }
    }
    for row in &mut w {
        for cell in row {
            *cell /= sum;
        }
    }
    w
}

/// Number of `BLOCK`-sized ground-truth blocks holding both classes.
/// Partial blocks at the right and bottom edges count too.
pub fn non_uniform_blocks(gt: &BinaryMask) -> usize {
    let (w, h) = gt.dims();
    let mut n = 0;
    for by in (0..h).step_by(BLOCK) {
        for bx in (0..w).step_by(BLOCK) {
            let first = gt.get(bx, by);
            let mixed = (by..(by + BLOCK).min(h))
                .any(|y| (bx..(bx + BLOCK).min(w)).any(|x| gt.get(x, y) != first));
            if mixed {
                n += 1;
            }
        }
    }
    n
}

/// Distortion of one flipped pixel: weighted disagreement between its
/// produced value and the ground truth around it.
fn pixel_distortion(gt: &BinaryMask, x: usize, y: usize, value: bool, w: &[[f64; SIZE]; SIZE]) -> f64 {
    let (width, height) = gt.dims();
    let mut d = 0.0;
    for (i, row) in w.iter().enumerate() {
        let Some(ny) = (y + i).checked_sub(RADIUS).filter(|&ny| ny < height) else {
            continue;
        };
        for (j, &weight) in row.iter().enumerate() {
            let Some(nx) = (x + j).checked_sub(RADIUS).filter(|&nx| nx < width) else {
                continue;
            };
            if gt.get(nx, ny) != value {
                d += weight;
            }
        }
    }
    d
}

pub fn drd(mask: &BinaryMask, gt: &BinaryMask) -> Result<DrdScore, MetricsError> {
    ensure_dims("mask", gt.dims(), mask.dims())?;
    let w = weight_matrix();
    let (width, _) = gt.dims();
    let total: f64 = mask
        .data
        .iter()
        .zip(&gt.data)
        .enumerate()
        .filter(|(_, (m, g))| m != g)
        .map(|(i, (&m, _))| pixel_distortion(gt, i % width, i / width, m, &w))
        .sum();
    let nubn = non_uniform_blocks(gt);
    let uniform_ground_truth = nubn == 0;
    Ok(DrdScore {
        value: total / nubn.max(1) as f64,
        nubn,
        uniform_ground_truth,
    })
}
