use docbin_core::{GrayImage, GrayImageView, ImageError, ImageF32};

use crate::config::DiffusionConfig;
use crate::neighborhood::fill_rows;

const RATE: f32 = 0.25;

/// Perona-Malik anisotropic diffusion.
///
/// Conduction `exp(-(g / kappa)^2)` over the four neighbours; edges stronger
/// than `kappa` diffuse little. The border is zero-flux.
pub fn anisotropic_diffusion(
    src: &GrayImageView<'_>,
    cfg: &DiffusionConfig,
) -> Result<GrayImage, ImageError> {
    src.validate()?;
    let (w, h) = (src.width, src.height);
    let mut cur = ImageF32::from_gray(src);
    let mut next = ImageF32::zeros(w, h);
    let k2 = cfg.kappa * cfg.kappa;
    let conduct = |g: f32| (-(g * g) / k2).exp() * g;

    for _ in 0..cfg.iterations {
        let src = &cur;
        fill_rows(&mut next.data, w, |y, row| {
            for (x, out) in row.iter_mut().enumerate() {
                let c = src.get(x, y);
                let n = if y > 0 { src.get(x, y - 1) } else { c };
                let s = if y + 1 < h { src.get(x, y + 1) } else { c };
                let e = if x + 1 < w { src.get(x + 1, y) } else { c };
                let wv = if x > 0 { src.get(x - 1, y) } else { c };
                let flux = conduct(n - c) + conduct(s - c) + conduct(e - c) + conduct(wv - c);
                *out = c + RATE * flux;
            }
        });
        std::mem::swap(&mut cur, &mut next);
    }
    Ok(cur.to_gray())
}
