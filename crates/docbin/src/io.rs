//! Image files in and out of the core types.

use std::path::Path;

use ::image::ImageReader;

use crate::core::{BinaryMask, GrayImage, GrayImageView, ImageError};
use crate::error::DocbinError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Borrow an `image::GrayImage` as a core view.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Decode any format the `image` crate supports and convert it to luma.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(path = %path.as_ref().display())))]
pub fn load_gray(path: impl AsRef<Path>) -> Result<GrayImage, DocbinError> {
    let path = path.as_ref();
    let decoded = ImageReader::open(path)
        .map_err(|source| DocbinError::File {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()?
        .decode()
        .map_err(|source| DocbinError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();
    let (w, h) = (decoded.width() as usize, decoded.height() as usize);
    Ok(GrayImage::new(w, h, decoded.into_raw())?)
}

/// Load a mask image: dark samples (< 128) are foreground.
pub fn load_mask(path: impl AsRef<Path>) -> Result<BinaryMask, DocbinError> {
    let img = load_gray(path)?;
    Ok(BinaryMask::from_gray(&img.view()))
}

/// Save a grayscale image; the format follows the file extension.
pub fn save_gray(img: &GrayImage, path: impl AsRef<Path>) -> Result<(), DocbinError> {
    let path = path.as_ref();
    let buffer = ::image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .ok_or(ImageError::BufferLength {
            expected: img.width * img.height,
            got: img.data.len(),
        })?;
    buffer.save(path).map_err(|source| DocbinError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

/// Save a mask with ink black (0) on a white (255) page.
pub fn save_mask(mask: &BinaryMask, path: impl AsRef<Path>) -> Result<(), DocbinError> {
    save_gray(&mask.to_gray(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_survives_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mask.png");
        let mask = BinaryMask::from_fn(9, 7, |x, y| (x + y) % 3 == 0);
        save_mask(&mask, &path).expect("save");
        assert_eq!(load_mask(&path).expect("load"), mask);
    }

    #[test]
    fn view_borrows_image_buffer() {
        let img = ::image::GrayImage::from_fn(5, 3, |x, y| ::image::Luma([(x * 10 + y) as u8]));
        let view = gray_view(&img);
        assert_eq!(view.dims(), (5, 3));
        assert_eq!(view.get(4, 2), 42);
    }

    #[test]
    fn undecodable_file_is_a_decode_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").expect("write");
        assert!(matches!(load_gray(&path), Err(DocbinError::Decode { .. })));
    }
}
