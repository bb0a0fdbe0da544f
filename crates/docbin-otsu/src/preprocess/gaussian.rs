use docbin_core::{reflect101, GrayImage, GrayImageView, ImageError, ImageF32};

/// Normalized 1D Gaussian taps of radius `ceil(3 sigma)`.
pub(crate) fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as isize;
    let mut k: Vec<f32> = (-radius..=radius)
        .map(|d| (-((d * d) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = k.iter().sum();
    for v in &mut k {
        *v /= sum;
    }
    k
}

/// Separable Gaussian blur of a float buffer with reflect-101 borders.
pub(crate) fn blur_f32(src: &ImageF32, sigma: f32) -> ImageF32 {
    let k = gaussian_kernel(sigma);
    let r = (k.len() / 2) as isize;
    let (w, h) = (src.width, src.height);

    let mut tmp = ImageF32::zeros(w, h);
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (i, &kv) in k.iter().enumerate() {
                acc += kv * row[reflect101(x as isize + i as isize - r, w)];
            }
            tmp.data[y * w + x] = acc;
        }
    }

    let mut out = ImageF32::zeros(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, &kv) in k.iter().enumerate() {
                acc += kv * tmp.data[reflect101(y as isize + i as isize - r, h) * w + x];
            }
            out.data[y * w + x] = acc;
        }
    }
    out
}

/// Gaussian blur of an 8-bit image.
pub fn gaussian_blur(src: &GrayImageView<'_>, sigma: f32) -> Result<GrayImage, ImageError> {
    src.validate()?;
    Ok(blur_f32(&ImageF32::from_gray(src), sigma).to_gray())
}
