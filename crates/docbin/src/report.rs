//! JSON files: configuration and run reports.

use std::{fs, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::core::Warning;
use crate::error::DocbinError;
use crate::metrics::QualityReport;
use crate::otsu::{BinarizationOutput, MethodDetails};

/// Read a JSON document, e.g. a [`ProcessingConfig`](crate::otsu::ProcessingConfig).
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, DocbinError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| DocbinError::File {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write `value` as pretty JSON.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), DocbinError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Summary of one binarization run, optionally with its evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinarizationReport {
    pub input: String,
    pub width: usize,
    pub height: usize,
    pub operation_id: u64,
    pub method: String,
    pub preprocessing: Vec<String>,
    pub foreground_pixels: usize,
    pub elapsed_ms: f64,
    pub details: MethodDetails,
    pub warnings: Vec<Warning>,
    #[serde(default)]
    pub quality: Option<QualityReport>,
}

impl BinarizationReport {
    pub fn new(
        input: impl Into<String>,
        method: &str,
        output: &BinarizationOutput,
        quality: Option<QualityReport>,
    ) -> Self {
        let elapsed_ms = output
            .finished_at
            .duration_since(output.started_at)
            .map(|d| d.as_secs_f64() * 1e3)
            .unwrap_or(0.0);
        Self {
            input: input.into(),
            width: output.mask.width,
            height: output.mask.height,
            operation_id: output.operation_id.0,
            method: method.to_string(),
            preprocessing: output.preprocessing.iter().map(|s| s.to_string()).collect(),
            foreground_pixels: output.mask.foreground_count(),
            elapsed_ms,
            details: output.details.clone(),
            warnings: output.warnings.clone(),
            quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otsu::{binarize, ProcessingConfig};

    #[test]
    fn config_round_trips_through_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let mut cfg = ProcessingConfig::default();
        cfg.histogram.bins = Some(128);
        write_json(&cfg, &path).expect("write");
        let back: ProcessingConfig = load_json(&path).expect("load");
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "histogram": { "bins": 64 } }"#).expect("write");
        let cfg: ProcessingConfig = load_json(&path).expect("load");
        assert_eq!(cfg.histogram.bins, Some(64));
        assert_eq!(cfg.neighborhood, ProcessingConfig::default().neighborhood);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_json::<ProcessingConfig>("/nonexistent/docbin.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/docbin.json"));
    }

    #[test]
    fn report_summarizes_output() {
        let img = crate::core::GrayImage::from_fn(16, 16, |x, _| if x < 8 { 20 } else { 230 });
        let out = binarize(&img.view(), &ProcessingConfig::default()).expect("binarize");
        let report = BinarizationReport::new("page.png", "single_scale", &out, None);
        assert_eq!((report.width, report.height), (16, 16));
        assert_eq!(report.foreground_pixels, out.mask.foreground_count());
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["details"]["method"], "single_scale");
    }
}
