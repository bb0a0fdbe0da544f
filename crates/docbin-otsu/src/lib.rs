//! Two-dimensional Otsu binarization of document images.
//!
//! Each pixel is described by its intensity and the mean of its
//! neighbourhood. A joint histogram of both is searched for the cutoff pair
//! that maximizes the between-class variance, and a pixel becomes foreground
//! (ink) when both of its values fall at or below the cutoffs.
//!
//! Three methods share the same core ([`ThresholdEngine`]):
//! - [`SingleScale`]: one global search,
//! - [`MultiScale`]: an image pyramid merged coarse to fine,
//! - [`RegionAdaptive`]: independent searches per tile.
//!
//! ```
//! use docbin_core::GrayImage;
//! use docbin_otsu::{Binarizer, ProcessingConfig};
//!
//! let page = GrayImage::from_fn(32, 32, |x, y| if (8..24).contains(&x) && y == 16 { 10 } else { 240 });
//! let out = Binarizer::new(ProcessingConfig::default())?.run(&page.view())?;
//! assert_eq!(out.mask.dims(), (32, 32));
//! # Ok::<(), docbin_otsu::BinarizeError>(())
//! ```

mod config;
mod engine;
mod error;
mod histogram;
mod methods;
mod neighborhood;
mod pipeline;
mod postprocess;
mod preprocess;
mod search;

pub use config::{
    pyramid_dims, AdaptiveWindowPolicy, AutoBinPolicy, ClaheConfig, CombineRule, ConfigError,
    DiffusionConfig, GaussianConfig, HistogramConfig, HomomorphicConfig, MethodConfig,
    MorphologyConfig, NeighborhoodConfig, NeighborhoodKind, PostprocessConfig, PreprocessConfig,
    ProcessingConfig, PyramidConfig, RegionConfig, SearchConfig, WindowSize,
};
pub use engine::{classify, ThresholdEngine, Thresholded};
pub use error::BinarizeError;
pub use histogram::{accumulate_partitioned, bin_of, build_histogram, refine_histogram, Histogram2D};
pub use methods::{
    build_pyramid, downsample2, recombine, BinarizationMethod, LevelSummary, MethodDetails,
    MethodOutput, MultiScale, PyramidLevel, RegionAdaptive, RegionDetails, RunContext,
    SingleScale, TileSummary, TileThresholdSource,
};
pub use neighborhood::{local_means, window_map, LocalMean};
pub use pipeline::{binarize, BinarizationOutput, Binarizer};
pub use postprocess::{dilate, erode, open_close, postprocess, remove_small_components};
pub use preprocess::{
    anisotropic_diffusion, clahe, gaussian_blur, homomorphic_filter, median3x3, preprocess,
    Preprocessed,
};
pub use search::{search_otsu_2d, MomentTable, SearchOutcome, ThresholdPair};
