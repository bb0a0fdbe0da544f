use docbin_core::ImageError;

use crate::config::ConfigError;

/// Errors returned by the binarization pipeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BinarizeError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "pyramid level {level}: mask is {actual:?} but the level expects {expected:?}"
    )]
    Combination {
        level: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}
