use crate::image::{GrayImage, GrayImageView, ImageError};

/// Binary segmentation result. `true` marks foreground (ink).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>, // row-major, len = w*h
}

impl BinaryMask {
    /// All-background mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<bool>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty { width, height });
        }
        if data.len() != width * height {
            return Err(ImageError::BufferLength {
                expected: width * height,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
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

    /// Read a rendered mask: dark samples (`< 128`) are foreground.
    pub fn from_gray(src: &GrayImageView<'_>) -> Self {
        Self {
            width: src.width,
            height: src.height,
            data: src.data.iter().map(|&v| v < 128).collect(),
        }
    }

    /// Render as black ink (0) on white paper (255).
    pub fn to_gray(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&fg| if fg { 0 } else { 255 })
                .collect(),
        }
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.data[y * self.width + x] = value;
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Every pixel is foreground.
    pub fn is_full(&self) -> bool {
        self.data.iter().all(|&v| v)
    }

    /// Fail unless `other` has the same width and height.
    pub fn ensure_same_dims(&self, other: (usize, usize)) -> Result<(), ImageError> {
        if self.dims() != other {
            return Err(ImageError::DimensionMismatch {
                expected: self.dims(),
                actual: other,
            });
        }
        Ok(())
    }

    /// Copy `tile` into this mask with its top-left corner at `(x0, y0)`.
    pub fn paste(&mut self, tile: &BinaryMask, x0: usize, y0: usize) {
        for y in 0..tile.height {
            let dst = (y0 + y) * self.width + x0;
            let src = y * tile.width;
            self.data[dst..dst + tile.width].copy_from_slice(&tile.data[src..src + tile.width]);
        }
    }

    pub fn crop(&self, x0: usize, y0: usize, width: usize, height: usize) -> BinaryMask {
        let mut data = Vec::with_capacity(width * height);
        for y in y0..y0 + height {
            let start = y * self.width + x0;
            data.extend_from_slice(&self.data[start..start + width]);
        }
        BinaryMask {
            width,
            height,
            data,
        }
    }
}
