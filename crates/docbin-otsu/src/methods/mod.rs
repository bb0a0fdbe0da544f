//! Thresholding strategies built on the shared [`ThresholdEngine`].

mod pyramid;
mod region;
mod single;

pub use pyramid::{build_pyramid, downsample2, recombine, LevelSummary, MultiScale, PyramidLevel};
pub use region::{RegionAdaptive, RegionDetails, TileSummary, TileThresholdSource};
pub use single::SingleScale;

use std::time::Instant;

use docbin_core::{BinaryMask, Event, GrayImageView, Interpolation, Observer, OperationId, Warning};
use serde::{Deserialize, Serialize};

use crate::error::BinarizeError;
use crate::search::SearchOutcome;

/// Per-run services handed to a method.
pub struct RunContext<'a> {
    pub id: OperationId,
    pub observer: &'a dyn Observer,
    /// Resampling used when a mask changes resolution.
    pub interpolation: Interpolation,
}

impl RunContext<'_> {
    /// Run `f` between stage-start and stage-finish events.
    pub fn stage<T>(&self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        self.observer.on_event(&Event::StageStarted { id: self.id, stage });
        let started = Instant::now();
        let out = f();
        self.observer.on_event(&Event::StageFinished {
            id: self.id,
            stage,
            elapsed: started.elapsed(),
        });
        out
    }
}

/// What a method found, beyond the mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MethodDetails {
    SingleScale { outcome: SearchOutcome },
    MultiScale { levels: Vec<LevelSummary> },
    RegionAdaptive(RegionDetails),
}

#[derive(Clone, Debug)]
pub struct MethodOutput {
    pub mask: BinaryMask,
    pub details: MethodDetails,
    pub warnings: Vec<Warning>,
}

/// A way of turning a (preprocessed) image into a mask.
pub trait BinarizationMethod {
    fn name(&self) -> &'static str;

    fn binarize(
        &self,
        src: &GrayImageView<'_>,
        ctx: &RunContext<'_>,
    ) -> Result<MethodOutput, BinarizeError>;
}
