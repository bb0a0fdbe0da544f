use std::path::PathBuf;

use crate::{core, metrics, otsu};

/// Errors produced by the facade helpers and the command-line tool.
#[derive(thiserror::Error, Debug)]
pub enum DocbinError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "image")]
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[cfg(feature = "image")]
    #[error("failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Image(#[from] core::ImageError),

    #[error(transparent)]
    Binarize(#[from] otsu::BinarizeError),

    #[error(transparent)]
    Metrics(#[from] metrics::MetricsError),
}
