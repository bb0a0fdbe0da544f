use docbin_core::BinaryMask;

use crate::error::{ensure_dims, MetricsError};

/// Neighbours P2..P9 of `(x, y)`, clockwise from north. Outside is background.
fn neighbours(m: &BinaryMask, x: usize, y: usize) -> [bool; 8] {
    const OFFSETS: [(isize, isize); 8] = [
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
    ];
    let (w, h) = m.dims();
    OFFSETS.map(|(dx, dy)| {
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        nx >= 0 && ny >= 0 && nx < w as isize && ny < h as isize && m.get(nx as usize, ny as usize)
    })
}

/// Zhang-Suen thinning to a one-pixel-wide skeleton.
pub fn zhang_suen(mask: &BinaryMask) -> BinaryMask {
    let mut m = mask.clone();
    let (w, h) = m.dims();
    loop {
        let mut changed = false;
        for pass in 0..2 {
            let mut remove = Vec::new();
            for y in 0..h {
                for x in 0..w {
                    if !m.get(x, y) {
                        continue;
                    }
                    let p = neighbours(&m, x, y);
                    let b = p.iter().filter(|&&v| v).count();
                    let a = (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count();
                    let [p2, _, p4, _, p6, _, p8, _] = p;
                    let cut = if pass == 0 {
                        !(p2 && p4 && p6) && !(p4 && p6 && p8)
                    } else {
                        !(p2 && p4 && p8) && !(p2 && p6 && p8)
                    };
                    if (2..=6).contains(&b) && a == 1 && cut {
                        remove.push((x, y));
                    }
                }
            }
            changed |= !remove.is_empty();
            for (x, y) in remove {
                m.set(x, y, false);
            }
        }
        if !changed {
            return m;
        }
    }
}

fn near(m: &BinaryMask, x: usize, y: usize, tolerance: usize) -> bool {
    let (w, h) = m.dims();
    let ys = y.saturating_sub(tolerance)..(y + tolerance + 1).min(h);
    ys.into_iter().any(|ny| {
        (x.saturating_sub(tolerance)..(x + tolerance + 1).min(w)).any(|nx| m.get(nx, ny))
    })
}

/// F1 of skeleton pixels matched within `tolerance` (Chebyshev) pixels;
/// `None` when both skeletons are empty.
pub fn skeleton_similarity(
    mask: &BinaryMask,
    gt: &BinaryMask,
    tolerance: usize,
) -> Result<Option<f64>, MetricsError> {
    ensure_dims("mask", gt.dims(), mask.dims())?;
    let (sm, sg) = (zhang_suen(mask), zhang_suen(gt));
    let (nm, ng) = (sm.foreground_count(), sg.foreground_count());
    if nm == 0 && ng == 0 {
        return Ok(None);
    }
    if nm == 0 || ng == 0 {
        return Ok(Some(0.0));
    }
    let (w, h) = sm.dims();
    let matched = |a: &BinaryMask, b: &BinaryMask| {
        (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .filter(|&(x, y)| a.get(x, y) && near(b, x, y, tolerance))
            .count()
    };
    let precision = matched(&sm, &sg) as f64 / nm as f64;
    let recall = matched(&sg, &sm) as f64 / ng as f64;
    if precision + recall == 0.0 {
        return Ok(Some(0.0));
    }
    Ok(Some(2.0 * precision * recall / (precision + recall)))
}
