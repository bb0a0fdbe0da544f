use std::time::{Instant, SystemTime};

use docbin_core::{BinaryMask, Event, GrayImageView, NoopObserver, Observer, OperationId, Warning};

use crate::config::{MethodConfig, ProcessingConfig};
use crate::engine::ThresholdEngine;
use crate::error::BinarizeError;
use crate::methods::{
    BinarizationMethod, MethodDetails, MultiScale, RegionAdaptive, RunContext, SingleScale,
};
use crate::postprocess::postprocess;
use crate::preprocess::preprocess;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Everything one run produced.
#[derive(Clone, Debug)]
pub struct BinarizationOutput {
    pub operation_id: OperationId,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub mask: BinaryMask,
    /// Preprocessing stages that ran, in order.
    pub preprocessing: Vec<&'static str>,
    pub details: MethodDetails,
    pub warnings: Vec<Warning>,
}

/// Configured binarization pipeline: preprocess, threshold, postprocess.
pub struct Binarizer {
    config: ProcessingConfig,
    method: Box<dyn BinarizationMethod + Send + Sync>,
}

impl Binarizer {
    /// Validate `config` and build the selected method.
    pub fn new(config: ProcessingConfig) -> Result<Self, BinarizeError> {
        config.validate()?;
        let engine = ThresholdEngine::from_config(&config);
        let method: Box<dyn BinarizationMethod + Send + Sync> = match &config.method {
            MethodConfig::SingleScale => Box::new(SingleScale::new(engine)),
            MethodConfig::MultiScale(p) => Box::new(MultiScale::new(engine, p.clone())),
            MethodConfig::RegionAdaptive(r) => Box::new(RegionAdaptive::new(engine, r.clone())),
        };
        Ok(Self { config, method })
    }

    /// Validate `config` but run a caller-supplied method in place of the
    /// one `config.method` selects.
    pub fn with_method(
        config: ProcessingConfig,
        method: Box<dyn BinarizationMethod + Send + Sync>,
    ) -> Result<Self, BinarizeError> {
        config.validate()?;
        Ok(Self { config, method })
    }

    #[inline]
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Name of the configured method.
    pub fn method_name(&self) -> &'static str {
        self.method.name()
    }

    pub fn run(&self, src: &GrayImageView<'_>) -> Result<BinarizationOutput, BinarizeError> {
        self.run_with_observer(src, &NoopObserver)
    }

    /// Run the pipeline, reporting lifecycle events and warnings to `observer`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, src, observer), fields(width = src.width, height = src.height, method = self.method.name()))
    )]
    pub fn run_with_observer(
        &self,
        src: &GrayImageView<'_>,
        observer: &dyn Observer,
    ) -> Result<BinarizationOutput, BinarizeError> {
        let id = OperationId::next();
        let started_at = SystemTime::now();
        let clock = Instant::now();
        observer.on_event(&Event::OperationStarted { id, at: started_at });

        let result = self.execute(src, id, observer);
        if let Err(err) = &result {
            observer.on_event(&Event::OperationFailed {
                id,
                message: err.to_string(),
            });
        }

        let finished_at = SystemTime::now();
        observer.on_event(&Event::OperationFinished {
            id,
            at: finished_at,
            elapsed: clock.elapsed(),
            success: result.is_ok(),
        });
        let (mask, preprocessing, details, warnings) = result?;
        Ok(BinarizationOutput {
            operation_id: id,
            started_at,
            finished_at,
            mask,
            preprocessing,
            details,
            warnings,
        })
    }

    #[allow(clippy::type_complexity)]
    fn execute(
        &self,
        src: &GrayImageView<'_>,
        id: OperationId,
        observer: &dyn Observer,
    ) -> Result<(BinaryMask, Vec<&'static str>, MethodDetails, Vec<Warning>), BinarizeError> {
        src.validate()?;
        self.config.validate_for(src.width, src.height)?;
        let ctx = RunContext {
            id,
            observer,
            interpolation: self.config.postprocess.interpolation,
        };

        let pre = ctx.stage("preprocess", || preprocess(src, &self.config.preprocess))?;
        report(observer, id, &pre.warnings);
        let mut warnings = pre.warnings;
        let out = self.method.binarize(&pre.image.view(), &ctx)?;
        report(observer, id, &out.warnings);
        warnings.extend(out.warnings);
        let mask = ctx.stage("postprocess", || postprocess(out.mask, &self.config.postprocess));
        Ok((mask, pre.applied, out.details, warnings))
    }
}

fn report(observer: &dyn Observer, id: OperationId, warnings: &[Warning]) {
    for warning in warnings {
        observer.on_event(&Event::Warning {
            id,
            warning: warning.clone(),
        });
    }
}

/// Binarize `src` with `config` in one call.
pub fn binarize(
    src: &GrayImageView<'_>,
    config: &ProcessingConfig,
) -> Result<BinarizationOutput, BinarizeError> {
    Binarizer::new(config.clone())?.run(src)
}
