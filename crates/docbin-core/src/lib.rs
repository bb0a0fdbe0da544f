//! Core types for document binarization.
//!
//! Gray images and binary masks, border handling, resampling, and the
//! observer seam used to report progress. Nothing here touches the
//! filesystem.

mod components;
mod events;
mod image;
mod interpolate;
mod logger;
mod mask;

pub use components::{connected_components, Component};
pub use events::{Event, LogObserver, NoopObserver, Observer, OperationId, Warning};
pub use image::{clamp_index, reflect101, GrayImage, GrayImageView, ImageError, ImageF32};
pub use interpolate::{mask_coverage, resize_gray, resize_mask, Interpolation};
pub use mask::BinaryMask;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{filter_directive, init_with_level, level_for_verbosity};
