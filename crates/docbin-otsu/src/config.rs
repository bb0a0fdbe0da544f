//! Processing configuration.
//!
//! [`ProcessingConfig`] is the single parameter object of a run. Every field
//! has a documented valid range; [`ProcessingConfig::validate`] rejects
//! out-of-range values instead of clamping them. All structs deserialize
//! with defaults for missing keys so partial JSON files work.

use docbin_core::Interpolation;
use serde::{Deserialize, Serialize};

/// An option outside its valid range.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid configuration: {field} = {value} ({reason})")]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub reason: &'static str,
}

impl ConfigError {
    fn new(field: &'static str, value: impl ToString, reason: &'static str) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason,
        }
    }
}

fn ensure(
    ok: bool,
    field: &'static str,
    value: impl ToString,
    reason: &'static str,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::new(field, value, reason))
    }
}

fn is_odd_in(v: usize, lo: usize, hi: usize) -> bool {
    v % 2 == 1 && (lo..=hi).contains(&v)
}

/// Full set of user parameters for one binarization run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub method: MethodConfig,
    pub neighborhood: NeighborhoodConfig,
    pub histogram: HistogramConfig,
    pub search: SearchConfig,
    pub preprocess: PreprocessConfig,
    pub postprocess: PostprocessConfig,
}

/// Thresholding strategy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MethodConfig {
    #[default]
    SingleScale,
    MultiScale(PyramidConfig),
    RegionAdaptive(RegionConfig),
}

/// How a finer level's mask is merged with the upsampled coarser decision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombineRule {
    /// Foreground only where the fine level and the coarse coverage (≥ 0.5)
    /// agree.
    Agreement,
    /// `fine_weight * fine + (1 - fine_weight) * coarse >= 0.5`.
    Vote { fine_weight: f32 },
}

impl Default for CombineRule {
    fn default() -> Self {
        Self::Vote { fine_weight: 0.5 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidConfig {
    /// Total number of levels including the full-resolution one, 2–8.
    pub levels: usize,
    /// Smallest admissible side length of the coarsest level.
    pub min_level_size: usize,
    pub combine: CombineRule,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            levels: 3,
            min_level_size: 8,
            combine: CombineRule::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Tile side in pixels; `None` derives `max(16, min(w, h) / 4)`.
    pub tile_size: Option<usize>,
    /// Tiles with fewer pixels borrow the cutoffs of the nearest searched tile.
    pub min_tile_pixels: usize,
    /// Tiles whose intensity range is below this are left background.
    pub min_tile_contrast: u8,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            tile_size: None,
            min_tile_pixels: 256,
            min_tile_contrast: 5,
        }
    }
}

impl RegionConfig {
    pub fn resolved_tile_size(&self, width: usize, height: usize) -> usize {
        self.tile_size
            .unwrap_or_else(|| (width.min(height) / 4).max(16))
    }
}

/// Shape of the neighbourhood averaged for the second histogram axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodKind {
    #[default]
    Rectangular,
    Circular,
    DistanceWeighted,
}

/// Maps local variance to a per-pixel window: flat regions get
/// `max_window`, busy regions `min_window`, linear in between.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveWindowPolicy {
    pub min_window: usize,
    pub max_window: usize,
    /// Window used to measure the local variance.
    pub probe_window: usize,
    pub low_variance: f64,
    pub high_variance: f64,
}

impl Default for AdaptiveWindowPolicy {
    fn default() -> Self {
        Self {
            min_window: 3,
            max_window: 21,
            probe_window: 7,
            low_variance: 100.0,
            high_variance: 1600.0,
        }
    }
}

impl AdaptiveWindowPolicy {
    /// Odd window for a pixel with the given local variance.
    pub fn window_for(&self, variance: f64) -> usize {
        let t = if variance <= self.low_variance {
            0.0
        } else if variance >= self.high_variance {
            1.0
        } else {
            (variance - self.low_variance) / (self.high_variance - self.low_variance)
        };
        let span = (self.max_window - self.min_window) as f64;
        let w = (self.max_window as f64 - t * span).round() as usize;
        let w = if w % 2 == 0 { w - 1 } else { w };
        w.clamp(self.min_window, self.max_window)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WindowSize {
    /// Odd side length, 3–21.
    Fixed(usize),
    Adaptive(AdaptiveWindowPolicy),
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::Fixed(7)
    }
}

impl WindowSize {
    /// Largest window any pixel may use.
    pub fn max_window(&self) -> usize {
        match self {
            WindowSize::Fixed(w) => *w,
            WindowSize::Adaptive(p) => p.max_window,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborhoodConfig {
    pub kind: NeighborhoodKind,
    pub window: WindowSize,
}

/// Heuristic bin count used when `HistogramConfig::bins` is `None`.
///
/// A base count is chosen from the pixel count, doubled for a wide dynamic
/// range, halved for a narrow one, and clamped to `[min_bins, max_bins]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoBinPolicy {
    pub small_image_pixels: usize,
    pub large_image_pixels: usize,
    pub small_bins: usize,
    pub medium_bins: usize,
    pub large_bins: usize,
    pub wide_range: u8,
    pub narrow_range: u8,
    pub min_bins: usize,
    pub max_bins: usize,
}

impl Default for AutoBinPolicy {
    fn default() -> Self {
        Self {
            small_image_pixels: 100_000,
            large_image_pixels: 1_000_000,
            small_bins: 32,
            medium_bins: 64,
            large_bins: 128,
            wide_range: 192,
            narrow_range: 64,
            min_bins: 32,
            max_bins: 256,
        }
    }
}

impl AutoBinPolicy {
    pub fn bins_for(&self, pixels: usize, min: u8, max: u8) -> usize {
        let base = if pixels < self.small_image_pixels {
            self.small_bins
        } else if pixels <= self.large_image_pixels {
            self.medium_bins
        } else {
            self.large_bins
        };
        let range = max.saturating_sub(min);
        let bins = if range >= self.wide_range {
            base * 2
        } else if range < self.narrow_range {
            base / 2
        } else {
            base
        };
        bins.clamp(self.min_bins, self.max_bins)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Bins per axis, 32–256; `None` uses `auto`.
    pub bins: Option<usize>,
    pub auto: AutoBinPolicy,
    /// Gaussian smoothing sigma in bins, 0–5 (0 disables).
    pub smoothing: f64,
    /// Replace counts by `ln(1 + count)` before smoothing.
    pub log_scale: bool,
    /// Scale the histogram to unit mass.
    pub normalize: bool,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bins: None,
            auto: AutoBinPolicy::default(),
            smoothing: 1.0,
            log_scale: false,
            normalize: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Break exact score ties toward the centre of the bin grid before
    /// falling back to lexicographic order.
    pub center_tie_break: bool,
    /// Best-to-mean score ratio under which a poor-separation warning is raised.
    pub poor_separation_ratio: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            center_tie_break: true,
            poor_separation_ratio: 1.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianConfig {
    /// 0.1–10.
    pub sigma: f32,
}

impl Default for GaussianConfig {
    fn default() -> Self {
        Self { sigma: 1.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomomorphicConfig {
    /// Sigma of the illumination low-pass, 1–100.
    pub sigma: f32,
    /// Gain on the illumination component.
    pub low_gain: f32,
    /// Gain on the reflectance component.
    pub high_gain: f32,
}

impl Default for HomomorphicConfig {
    fn default() -> Self {
        Self {
            sigma: 15.0,
            low_gain: 0.5,
            high_gain: 1.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionConfig {
    /// 1–50.
    pub iterations: usize,
    /// Edge threshold, 1–100.
    pub kappa: f32,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            kappa: 30.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheConfig {
    /// Histogram clip relative to the uniform bin height, 1–40.
    pub clip_limit: f32,
    /// Tiles per axis, 1–64.
    pub tiles: usize,
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles: 8,
        }
    }
}

/// Optional stages, applied in the order median, gaussian, homomorphic,
/// diffusion, clahe.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub median: bool,
    pub gaussian: Option<GaussianConfig>,
    pub homomorphic: Option<HomomorphicConfig>,
    pub diffusion: Option<DiffusionConfig>,
    pub clahe: Option<ClaheConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Odd disk diameter, 1–15.
    pub kernel_size: usize,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self { kernel_size: 3 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessConfig {
    pub morphology: Option<MorphologyConfig>,
    /// Foreground components smaller than this are removed; 0 disables.
    pub min_component_area: usize,
    /// Used for pyramid upsampling and for `output_size`.
    pub interpolation: Interpolation,
    /// Resize the final mask to `(width, height)`.
    pub output_size: Option<(usize, usize)>,
}

impl ProcessingConfig {
    /// Check every option against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.method {
            MethodConfig::SingleScale => {}
            MethodConfig::MultiScale(p) => {
                ensure(
                    (2..=8).contains(&p.levels),
                    "method.levels",
                    p.levels,
                    "expected 2..=8",
                )?;
                ensure(
                    p.min_level_size >= 1,
                    "method.min_level_size",
                    p.min_level_size,
                    "must be positive",
                )?;
                if let CombineRule::Vote { fine_weight } = p.combine {
                    ensure(
                        (0.0..=1.0).contains(&fine_weight),
                        "method.combine.fine_weight",
                        fine_weight,
                        "expected 0..=1",
                    )?;
                }
            }
            MethodConfig::RegionAdaptive(r) => {
                if let Some(t) = r.tile_size {
                    ensure(t >= 8, "method.tile_size", t, "must be at least 8")?;
                }
                ensure(
                    r.min_tile_pixels >= 1,
                    "method.min_tile_pixels",
                    r.min_tile_pixels,
                    "must be positive",
                )?;
            }
        }

        match &self.neighborhood.window {
            WindowSize::Fixed(w) => ensure(
                is_odd_in(*w, 3, 21),
                "neighborhood.window",
                w,
                "expected odd 3..=21",
            )?,
            WindowSize::Adaptive(p) => {
                ensure(
                    is_odd_in(p.min_window, 3, 21),
                    "neighborhood.window.min_window",
                    p.min_window,
                    "expected odd 3..=21",
                )?;
                ensure(
                    is_odd_in(p.max_window, p.min_window, 21),
                    "neighborhood.window.max_window",
                    p.max_window,
                    "expected odd min_window..=21",
                )?;
                ensure(
                    is_odd_in(p.probe_window, 3, 21),
                    "neighborhood.window.probe_window",
                    p.probe_window,
                    "expected odd 3..=21",
                )?;
                ensure(
                    p.low_variance >= 0.0 && p.high_variance > p.low_variance,
                    "neighborhood.window.high_variance",
                    p.high_variance,
                    "must exceed low_variance",
                )?;
            }
        }

        let h = &self.histogram;
        if let Some(bins) = h.bins {
            ensure(
                (32..=256).contains(&bins),
                "histogram.bins",
                bins,
                "expected 32..=256",
            )?;
        }
        let auto = &h.auto;
        ensure(
            32 <= auto.min_bins && auto.min_bins <= auto.max_bins && auto.max_bins <= 256,
            "histogram.auto",
            format!("{}..={}", auto.min_bins, auto.max_bins),
            "bounds must satisfy 32 <= min <= max <= 256",
        )?;
        for (field, bins) in [
            ("histogram.auto.small_bins", auto.small_bins),
            ("histogram.auto.medium_bins", auto.medium_bins),
            ("histogram.auto.large_bins", auto.large_bins),
        ] {
            ensure((32..=256).contains(&bins), field, bins, "expected 32..=256")?;
        }
        ensure(
            (0.0..=5.0).contains(&h.smoothing),
            "histogram.smoothing",
            h.smoothing,
            "expected 0..=5",
        )?;
        ensure(
            self.search.poor_separation_ratio >= 1.0,
            "search.poor_separation_ratio",
            self.search.poor_separation_ratio,
            "must be at least 1",
        )?;

        let pre = &self.preprocess;
        if let Some(g) = &pre.gaussian {
            ensure(
                (0.1..=10.0).contains(&g.sigma),
                "preprocess.gaussian.sigma",
                g.sigma,
                "expected 0.1..=10",
            )?;
        }
        if let Some(hm) = &pre.homomorphic {
            ensure(
                (1.0..=100.0).contains(&hm.sigma),
                "preprocess.homomorphic.sigma",
                hm.sigma,
                "expected 1..=100",
            )?;
            ensure(
                hm.low_gain > 0.0 && hm.high_gain > 0.0,
                "preprocess.homomorphic.gain",
                format!("{}/{}", hm.low_gain, hm.high_gain),
                "gains must be positive",
            )?;
        }
        if let Some(d) = &pre.diffusion {
            ensure(
                (1..=50).contains(&d.iterations),
                "preprocess.diffusion.iterations",
                d.iterations,
                "expected 1..=50",
            )?;
            ensure(
                (1.0..=100.0).contains(&d.kappa),
                "preprocess.diffusion.kappa",
                d.kappa,
                "expected 1..=100",
            )?;
        }
        if let Some(c) = &pre.clahe {
            ensure(
                (1.0..=40.0).contains(&c.clip_limit),
                "preprocess.clahe.clip_limit",
                c.clip_limit,
                "expected 1..=40",
            )?;
            ensure(
                (1..=64).contains(&c.tiles),
                "preprocess.clahe.tiles",
                c.tiles,
                "expected 1..=64",
            )?;
        }

        let post = &self.postprocess;
        if let Some(m) = &post.morphology {
            ensure(
                is_odd_in(m.kernel_size, 1, 15),
                "postprocess.morphology.kernel_size",
                m.kernel_size,
                "expected odd 1..=15",
            )?;
        }
        if let Some((w, h)) = post.output_size {
            ensure(
                w > 0 && h > 0,
                "postprocess.output_size",
                format!("{w}x{h}"),
                "must be non-empty",
            )?;
        }
        Ok(())
    }

    /// Check the options that depend on the input size. Windows may exceed
    /// the image; borders are reflected as often as needed.
    pub fn validate_for(&self, width: usize, height: usize) -> Result<(), ConfigError> {
        if let MethodConfig::MultiScale(p) = &self.method {
            let coarsest = pyramid_dims(width, height, p.levels - 1);
            ensure(
                coarsest.0.min(coarsest.1) >= p.min_level_size,
                "method.levels",
                p.levels,
                "coarsest pyramid level is smaller than min_level_size",
            )?;
        }
        Ok(())
    }
}

/// Dimensions of pyramid level `level` (each level halves, rounding up).
pub fn pyramid_dims(width: usize, height: usize, level: usize) -> (usize, usize) {
    (0..level).fold((width, height), |(w, h), _| (w.div_ceil(2), h.div_ceil(2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ProcessingConfig::default();
        cfg.validate().expect("default config");
        assert_eq!(cfg.neighborhood.window, WindowSize::Fixed(7));
        assert_eq!(cfg.histogram.bins, None);
    }

    #[test]
    fn even_window_is_rejected() {
        let mut cfg = ProcessingConfig::default();
        cfg.neighborhood.window = WindowSize::Fixed(8);
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.field, "neighborhood.window");
    }

    #[test]
    fn out_of_range_values_fail_fast() {
        let mut cfg = ProcessingConfig::default();
        cfg.histogram.bins = Some(300);
        assert!(cfg.validate().is_err());

        let mut cfg = ProcessingConfig::default();
        cfg.histogram.smoothing = 6.0;
        assert!(cfg.validate().is_err());

        let mut cfg = ProcessingConfig::default();
        cfg.method = MethodConfig::MultiScale(PyramidConfig {
            levels: 9,
            ..PyramidConfig::default()
        });
        assert!(cfg.validate().is_err());

        let mut cfg = ProcessingConfig::default();
        cfg.postprocess.morphology = Some(MorphologyConfig { kernel_size: 4 });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn windows_larger_than_the_image_are_accepted() {
        let cfg = ProcessingConfig::default();
        assert!(cfg.validate_for(8, 8).is_ok());
        assert!(cfg.validate_for(5, 5).is_ok());
        assert!(cfg.validate_for(1, 3).is_ok());
    }

    #[test]
    fn auto_bins_below_32_are_rejected() {
        let mut cfg = ProcessingConfig::default();
        cfg.histogram.auto.min_bins = 1;
        cfg.histogram.auto.small_bins = 1;
        assert_eq!(cfg.validate().unwrap_err().field, "histogram.auto");

        let mut cfg = ProcessingConfig::default();
        cfg.histogram.auto.min_bins = 4;
        assert_eq!(cfg.validate().unwrap_err().field, "histogram.auto");

        let mut cfg = ProcessingConfig::default();
        cfg.histogram.auto.small_bins = 16;
        assert_eq!(
            cfg.validate().unwrap_err().field,
            "histogram.auto.small_bins"
        );

        let mut cfg = ProcessingConfig::default();
        cfg.histogram.auto.large_bins = 512;
        assert_eq!(
            cfg.validate().unwrap_err().field,
            "histogram.auto.large_bins"
        );
    }

    #[test]
    fn pyramid_too_deep_for_image() {
        let mut cfg = ProcessingConfig::default();
        cfg.method = MethodConfig::MultiScale(PyramidConfig {
            levels: 4,
            ..PyramidConfig::default()
        });
        assert!(cfg.validate_for(32, 32).is_err());
        assert!(cfg.validate_for(64, 64).is_ok());
    }

    #[test]
    fn auto_bins_follow_size_and_range() {
        let p = AutoBinPolicy::default();
        assert_eq!(p.bins_for(64, 128, 128), 32);
        assert_eq!(p.bins_for(500_000, 0, 255), 128);
        assert_eq!(p.bins_for(500_000, 100, 150), 32);
        assert_eq!(p.bins_for(2_000_000, 0, 255), 256);
    }

    #[test]
    fn adaptive_window_narrows_with_variance() {
        let p = AdaptiveWindowPolicy::default();
        assert_eq!(p.window_for(0.0), 21);
        assert_eq!(p.window_for(5000.0), 3);
        let mid = p.window_for(850.0);
        assert!(mid % 2 == 1 && mid > 3 && mid < 21);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: ProcessingConfig = serde_json::from_str(
            r#"{ "method": { "kind": "multi_scale", "levels": 2 }, "histogram": { "bins": 64 } }"#,
        )
        .expect("parse");
        assert_eq!(
            cfg.method,
            MethodConfig::MultiScale(PyramidConfig {
                levels: 2,
                ..PyramidConfig::default()
            })
        );
        assert_eq!(cfg.histogram.bins, Some(64));
        assert_eq!(cfg.histogram.smoothing, 1.0);
    }
}
