use docbin_core::BinaryMask;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_dims, MetricsError};

/// Pixel-wise agreement of a produced mask with the ground truth.
/// Foreground is the positive class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusion {
    pub true_pos: u64,
    pub false_pos: u64,
    pub true_neg: u64,
    pub false_neg: u64,
}

impl Confusion {
    pub fn count(mask: &BinaryMask, gt: &BinaryMask) -> Result<Self, MetricsError> {
        ensure_dims("mask", gt.dims(), mask.dims())?;
        let mut c = Confusion::default();
        for (&m, &g) in mask.data.iter().zip(&gt.data) {
            match (m, g) {
                (true, true) => c.true_pos += 1,
                (true, false) => c.false_pos += 1,
                (false, false) => c.true_neg += 1,
                (false, true) => c.false_neg += 1,
            }
        }
        Ok(c)
    }

    pub fn total(&self) -> u64 {
        self.true_pos + self.false_pos + self.true_neg + self.false_neg
    }

    pub fn mismatched(&self) -> u64 {
        self.false_pos + self.false_neg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_pixel_once() {
        let gt = BinaryMask::from_fn(4, 4, |x, _| x < 2);
        let mask = BinaryMask::from_fn(4, 4, |x, y| (x < 2 && y > 0) || (x == 3 && y == 0));
        let c = Confusion::count(&mask, &gt).expect("counts");
        assert_eq!(
            c,
            Confusion {
                true_pos: 6,
                false_pos: 1,
                true_neg: 7,
                false_neg: 2,
            }
        );
        assert_eq!(c.total(), 16);
        assert_eq!(c.mismatched(), 3);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let err = Confusion::count(&BinaryMask::new(3, 4), &BinaryMask::new(4, 4)).unwrap_err();
        assert_eq!(
            err,
            MetricsError::DimensionMismatch {
                what: "mask",
                expected: (4, 4),
                actual: (3, 4)
            }
        );
    }
}
