use docbin_core::{GrayImage, GrayImageView, ImageError};

/// 3x3 median with reflect-101 borders; removes salt-and-pepper noise while
/// keeping stroke edges.
pub fn median3x3(src: &GrayImageView<'_>) -> Result<GrayImage, ImageError> {
    src.validate()?;
    let mut out = GrayImage::filled(src.width, src.height, 0);
    let mut win = [0u8; 9];
    for y in 0..src.height {
        for x in 0..src.width {
            let mut n = 0;
            for dy in -1..=1isize {
                for dx in -1..=1isize {
                    win[n] = src.get_reflect(x as isize + dx, y as isize + dy);
                    n += 1;
                }
            }
            win.sort_unstable();
            out.set(x, y, win[4]);
        }
    }
    Ok(out)
}
