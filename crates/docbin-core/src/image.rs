/// Errors raised when an image buffer does not describe a usable image.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image is empty (width={width}, height={height})")]
    Empty { width: usize, height: usize },

    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    BufferLength { expected: usize, got: usize },

    #[error("image dimensions differ (expected {expected:?}, got {actual:?})")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

fn check_dims(width: usize, height: usize, len: usize) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::Empty { width, height });
    }
    let expected = width * height;
    if len != expected {
        return Err(ImageError::BufferLength { expected, got: len });
    }
    Ok(())
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer, validating its shape.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        check_dims(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Re-check the invariants of a view built by struct literal.
    pub fn validate(&self) -> Result<(), ImageError> {
        check_dims(self.width, self.height, self.data.len())
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Sample with reflect-101 border handling; any signed coordinate is valid.
    #[inline]
    pub fn get_reflect(&self, x: isize, y: isize) -> u8 {
        self.get(reflect101(x, self.width), reflect101(y, self.height))
    }

    /// Smallest and largest sample.
    pub fn min_max(&self) -> (u8, u8) {
        self.data
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Copy a rectangular window into a new image.
    pub fn crop(&self, x0: usize, y0: usize, width: usize, height: usize) -> GrayImage {
        let mut data = Vec::with_capacity(width * height);
        for y in y0..y0 + height {
            data.extend_from_slice(&self.row(y)[x0..x0 + width]);
        }
        GrayImage {
            width,
            height,
            data,
        }
    }

    pub fn to_image(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }
}

impl GrayImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        check_dims(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Image with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }
}

/// Floating point working buffer for stages that need headroom.
#[derive(Clone, Debug)]
pub struct ImageF32 {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ImageF32 {
    pub fn from_gray(src: &GrayImageView<'_>) -> Self {
        Self {
            width: src.width,
            height: src.height,
            data: src.data.iter().map(|&v| v as f32).collect(),
        }
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Round and clamp back to 8 bits.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&v| v.round().clamp(0.0, 255.0) as u8)
                .collect(),
        }
    }
}

/// Map a signed index into `[0, n)` by mirroring about the edge samples
/// without repeating them (`dcb|abcd|cba`).
#[inline]
pub fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m >= n as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

#[inline]
pub fn clamp_index(i: isize, n: usize) -> usize {
    i.clamp(0, n as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect101_mirrors_without_repeating_edge() {
        let idx: Vec<usize> = (-3..8).map(|i| reflect101(i, 5)).collect();
        assert_eq!(idx, vec![3, 2, 1, 0, 1, 2, 3, 4, 3, 2, 1]);
        assert_eq!(reflect101(-7, 1), 0);
        assert_eq!(reflect101(9, 2), 1);
    }

    #[test]
    fn view_rejects_bad_buffers() {
        let data = [0u8; 5];
        assert_eq!(
            GrayImageView::new(2, 3, &data).unwrap_err(),
            ImageError::BufferLength {
                expected: 6,
                got: 5
            }
        );
        assert!(matches!(
            GrayImageView::new(0, 3, &[]),
            Err(ImageError::Empty { .. })
        ));
    }

    #[test]
    fn crop_copies_window() {
        let img = GrayImage::from_fn(4, 3, |x, y| (y * 4 + x) as u8);
        let c = img.view().crop(1, 1, 2, 2);
        assert_eq!(c.data, vec![5, 6, 9, 10]);
    }
}
