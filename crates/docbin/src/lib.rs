//! Facade crate for the `docbin-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, binarization and metrics crates,
//! - JSON helpers for configuration files and run reports,
//! - (feature `image`) loading and saving images and masks,
//! - (feature `cli`) the `docbin` command-line tool.
//!
//! ## Quickstart
//!
//! ```no_run
//! use docbin::io::{load_gray, save_mask};
//! use docbin::otsu::{Binarizer, ProcessingConfig};
//!
//! # fn main() -> Result<(), docbin::DocbinError> {
//! let page = load_gray("page.png")?;
//! let output = Binarizer::new(ProcessingConfig::default())?.run(&page.view())?;
//! save_mask(&output.mask, "page_mask.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `docbin::core`: images, masks, interpolation, observer events.
//! - `docbin::otsu`: configuration, preprocessing, the 2D Otsu search and
//!   the single-scale, multi-scale and region-adaptive methods.
//! - `docbin::metrics`: DIBCO quality metrics.
//! - `docbin::io` (feature `image`): file helpers.

pub use docbin_core as core;
pub use docbin_metrics as metrics;
pub use docbin_otsu as otsu;

pub use docbin_core::{BinaryMask, GrayImage, GrayImageView};
pub use docbin_metrics::{evaluate, QualityReport};
pub use docbin_otsu::{binarize, Binarizer, ProcessingConfig};

mod error;
mod report;

pub use error::DocbinError;
pub use report::{load_json, write_json, BinarizationReport};

#[cfg(feature = "image")]
pub mod io;
