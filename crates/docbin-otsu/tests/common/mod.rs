#![allow(dead_code)]

use docbin_core::{BinaryMask, GrayImage};

/// Deterministic Gaussian noise (xorshift64* + Box-Muller).
pub struct Noise {
    state: u64,
    spare: Option<f64>,
}

impl Noise {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
            spare: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    /// Uniform in (0, 1].
    fn uniform(&mut self) -> f64 {
        ((self.next_u64() >> 11) as f64 + 1.0) / (1u64 << 53) as f64
    }

    pub fn gaussian(&mut self, sigma: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return z * sigma;
        }
        let (u1, u2) = (self.uniform(), self.uniform());
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        self.spare = Some(r * theta.sin());
        r * theta.cos() * sigma
    }
}

/// White page with one black square `[lo, hi)²`.
pub fn square_page(size: usize, lo: usize, hi: usize) -> (GrayImage, BinaryMask) {
    let inside = |x: usize, y: usize| (lo..hi).contains(&x) && (lo..hi).contains(&y);
    let img = GrayImage::from_fn(size, size, |x, y| if inside(x, y) { 0 } else { 255 });
    (img, BinaryMask::from_fn(size, size, inside))
}

/// 32x32 page with four 12x12 ink blocks and additive Gaussian noise.
pub fn noisy_blocks(sigma: f64, seed: u64) -> (GrayImage, BinaryMask) {
    let inside = |x: usize, y: usize| {
        let block = |v: usize| (2..14).contains(&v) || (18..30).contains(&v);
        block(x) && block(y)
    };
    let mut noise = Noise::new(seed);
    let img = GrayImage::from_fn(32, 32, |x, y| {
        let base = if inside(x, y) { 115.0 } else { 145.0 };
        (base + noise.gaussian(sigma)).round().clamp(0.0, 255.0) as u8
    });
    (img, BinaryMask::from_fn(32, 32, inside))
}

/// Horizontal text-like stripes: 3 rows dark, 3 rows light.
pub fn stripes(width: usize, height: usize) -> GrayImage {
    GrayImage::from_fn(width, height, |_, y| if (y / 3) % 2 == 0 { 40 } else { 210 })
}
