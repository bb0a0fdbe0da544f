use docbin_core::GrayImageView;

use super::{BinarizationMethod, MethodDetails, MethodOutput, RunContext};
use crate::engine::ThresholdEngine;
use crate::error::BinarizeError;

/// One global search over the whole image.
pub struct SingleScale {
    engine: ThresholdEngine,
}

impl SingleScale {
    pub fn new(engine: ThresholdEngine) -> Self {
        Self { engine }
    }
}

impl BinarizationMethod for SingleScale {
    fn name(&self) -> &'static str {
        "single_scale"
    }

    fn binarize(
        &self,
        src: &GrayImageView<'_>,
        ctx: &RunContext<'_>,
    ) -> Result<MethodOutput, BinarizeError> {
        let bins = self.engine.resolve_bins(src);
        let t = ctx.stage("threshold", || self.engine.threshold(src, bins, "single-scale"))?;
        Ok(MethodOutput {
            mask: t.mask,
            details: MethodDetails::SingleScale { outcome: t.outcome },
            warnings: t.warnings,
        })
    }
}
