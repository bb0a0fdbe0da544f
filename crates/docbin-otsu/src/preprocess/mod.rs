//! Optional denoising and contrast normalization ahead of thresholding.
//!
//! Stages run in a fixed order: median, Gaussian, homomorphic, diffusion,
//! CLAHE. Each is a pure function from an image to a new image.

mod clahe;
mod diffusion;
mod gaussian;
mod homomorphic;
mod median;

pub use clahe::clahe;
pub use diffusion::anisotropic_diffusion;
pub use gaussian::gaussian_blur;
pub use homomorphic::homomorphic_filter;
pub use median::median3x3;

use docbin_core::{GrayImage, GrayImageView, ImageError, Warning};

use crate::config::PreprocessConfig;

/// Image after preprocessing and the stages that were applied.
#[derive(Clone, Debug)]
pub struct Preprocessed {
    pub image: GrayImage,
    pub applied: Vec<&'static str>,
    pub warnings: Vec<Warning>,
}

/// Run the enabled stages in order. With nothing enabled the output is a
/// copy of the input.
pub fn preprocess(
    src: &GrayImageView<'_>,
    cfg: &PreprocessConfig,
) -> Result<Preprocessed, ImageError> {
    src.validate()?;
    let mut image = src.to_image();
    let mut applied = Vec::new();
    let mut warnings = Vec::new();

    if cfg.median {
        image = median3x3(&image.view())?;
        applied.push("median");
    }
    if let Some(g) = &cfg.gaussian {
        image = gaussian_blur(&image.view(), g.sigma)?;
        applied.push("gaussian");
    }
    if let Some(hm) = &cfg.homomorphic {
        let (out, warning) = homomorphic_filter(&image.view(), hm)?;
        image = out;
        warnings.extend(warning);
        applied.push("homomorphic");
    }
    if let Some(d) = &cfg.diffusion {
        image = anisotropic_diffusion(&image.view(), d)?;
        applied.push("diffusion");
    }
    if let Some(c) = &cfg.clahe {
        image = clahe(&image.view(), c)?;
        applied.push("clahe");
    }
    Ok(Preprocessed {
        image,
        applied,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClaheConfig, GaussianConfig, HomomorphicConfig};

    #[test]
    fn disabled_stages_copy_the_input() {
        let img = GrayImage::from_fn(9, 9, |x, y| (x * y) as u8);
        let out = preprocess(&img.view(), &PreprocessConfig::default()).expect("preprocess");
        assert_eq!(out.image, img);
        assert!(out.applied.is_empty());
    }

    #[test]
    fn stages_run_in_documented_order() {
        let img = GrayImage::from_fn(16, 16, |x, _| (x * 10) as u8);
        let cfg = PreprocessConfig {
            median: true,
            gaussian: Some(GaussianConfig::default()),
            homomorphic: Some(HomomorphicConfig::default()),
            diffusion: None,
            clahe: Some(ClaheConfig::default()),
        };
        let out = preprocess(&img.view(), &cfg).expect("preprocess");
        assert_eq!(out.applied, vec!["median", "gaussian", "homomorphic", "clahe"]);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let data = [1u8, 2, 3];
        let view = GrayImageView {
            width: 2,
            height: 2,
            data: &data,
        };
        assert!(matches!(
            preprocess(&view, &PreprocessConfig::default()),
            Err(ImageError::BufferLength { .. })
        ));
    }
}
