//! Mask clean-up: morphology, speckle removal and output resizing.

use docbin_core::{connected_components, resize_mask, BinaryMask};

use crate::config::PostprocessConfig;

/// Offsets of a disk structuring element with odd diameter `size`.
fn disk(size: usize) -> Vec<(isize, isize)> {
    let r = (size / 2) as isize;
    let mut out = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                out.push((dx, dy));
            }
        }
    }
    out
}

/// `all = true` erodes, `all = false` dilates. Samples outside the mask are
/// ignored.
fn morph(mask: &BinaryMask, se: &[(isize, isize)], all: bool) -> BinaryMask {
    let (w, h) = mask.dims();
    BinaryMask::from_fn(w, h, |x, y| {
        let mut hits = se.iter().filter_map(|&(dx, dy)| {
            let nx = x as isize + dx;
            let ny = y as isize + dy;
            (nx >= 0 && ny >= 0 && nx < w as isize && ny < h as isize)
                .then(|| mask.get(nx as usize, ny as usize))
        });
        if all {
            hits.all(|v| v)
        } else {
            hits.any(|v| v)
        }
    })
}

pub fn erode(mask: &BinaryMask, size: usize) -> BinaryMask {
    morph(mask, &disk(size), true)
}

pub fn dilate(mask: &BinaryMask, size: usize) -> BinaryMask {
    morph(mask, &disk(size), false)
}

/// Opening followed by closing with the same disk.
pub fn open_close(mask: &BinaryMask, size: usize) -> BinaryMask {
    let se = disk(size);
    let opened = morph(&morph(mask, &se, true), &se, false);
    morph(&morph(&opened, &se, false), &se, true)
}

/// Clear 8-connected foreground components smaller than `min_area`.
pub fn remove_small_components(mask: &BinaryMask, min_area: usize) -> BinaryMask {
    let mut out = mask.clone();
    for comp in connected_components(mask) {
        if comp.area() < min_area {
            for &(x, y) in &comp.pixels {
                out.set(x, y, false);
            }
        }
    }
    out
}

/// Apply morphology, speckle removal and resizing, each when configured.
pub fn postprocess(mask: BinaryMask, cfg: &PostprocessConfig) -> BinaryMask {
    let mut mask = mask;
    if let Some(m) = &cfg.morphology {
        mask = open_close(&mask, m.kernel_size);
    }
    if cfg.min_component_area > 0 {
        mask = remove_small_components(&mask, cfg.min_component_area);
    }
    if let Some((w, h)) = cfg.output_size {
        if (w, h) != mask.dims() {
            mask = resize_mask(&mask, w, h, cfg.interpolation);
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MorphologyConfig;
    use docbin_core::Interpolation;

    fn square(n: usize, lo: usize, hi: usize) -> BinaryMask {
        BinaryMask::from_fn(n, n, |x, y| (lo..hi).contains(&x) && (lo..hi).contains(&y))
    }

    #[test]
    fn disk_of_three_is_a_cross() {
        assert_eq!(disk(3).len(), 5);
        assert_eq!(disk(1), vec![(0, 0)]);
    }

    #[test]
    fn opening_removes_isolated_pixels_and_keeps_blocks() {
        let mut m = square(12, 3, 9);
        m.set(0, 11, true);
        let out = open_close(&m, 3);
        assert!(!out.get(0, 11));
        assert!(out.get(5, 5));
        assert_eq!(out.foreground_count(), square(12, 3, 9).foreground_count() - 4);
    }

    #[test]
    fn closing_fills_pinholes() {
        let mut m = square(10, 1, 9);
        m.set(4, 4, false);
        let out = open_close(&m, 3);
        assert!(out.get(4, 4));
    }

    #[test]
    fn speckles_below_area_are_cleared() {
        let mut m = square(10, 2, 6);
        m.set(8, 8, true);
        m.set(9, 9, true);
        let out = remove_small_components(&m, 3);
        assert_eq!(out, square(10, 2, 6));
    }

    #[test]
    fn pipeline_resizes_last() {
        let cfg = PostprocessConfig {
            morphology: Some(MorphologyConfig { kernel_size: 1 }),
            min_component_area: 0,
            interpolation: Interpolation::Nearest,
            output_size: Some((20, 20)),
        };
        let out = postprocess(square(10, 2, 6), &cfg);
        assert_eq!(out.dims(), (20, 20));
        assert_eq!(out.foreground_count(), 64);
    }
}
