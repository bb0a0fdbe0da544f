use docbin_core::ImageError;

/// Errors returned when metric inputs cannot be compared.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("{what} is {actual:?} but the ground truth is {expected:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

pub(crate) fn ensure_dims(
    what: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<(), MetricsError> {
    if expected == actual {
        Ok(())
    } else {
        Err(MetricsError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}
