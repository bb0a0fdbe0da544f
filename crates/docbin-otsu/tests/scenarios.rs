mod common;

use approx::assert_abs_diff_eq;
use common::{noisy_blocks, square_page, stripes};
use docbin_core::{BinaryMask, Warning};
use docbin_metrics::{evaluate, Metric, MetricsConfig};
use docbin_otsu::{
    binarize, Binarizer, CombineRule, MethodConfig, MethodDetails, ProcessingConfig,
    PyramidConfig, RegionConfig, ThresholdPair, TileThresholdSource,
};

fn with_bins(bins: usize) -> ProcessingConfig {
    let mut cfg = ProcessingConfig::default();
    cfg.histogram.bins = Some(bins);
    cfg
}

fn drd(mask: &BinaryMask, gt: &BinaryMask) -> f64 {
    evaluate(mask, gt, None, &MetricsConfig::default())
        .expect("evaluate")
        .metric(Metric::Drd)
        .expect("drd")
}

#[test]
fn flat_page_falls_back_to_mid_range() {
    let img = docbin_core::GrayImage::filled(8, 8, 128);
    let binarizer = Binarizer::new(ProcessingConfig::default()).expect("config");
    let first = binarizer.run(&img.view()).expect("run");
    let second = binarizer.run(&img.view()).expect("run");

    let MethodDetails::SingleScale { outcome } = &first.details else {
        panic!("expected single-scale details");
    };
    assert!(outcome.fallback);
    assert_eq!(outcome.pair, ThresholdPair::mid_range(32));
    assert!(first
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::PoorSeparation { fallback: true, .. })));
    assert!(first.mask.is_empty());
    assert_eq!(first.mask, second.mask);
    assert!(second.operation_id > first.operation_id);
}

#[test]
fn black_square_is_recovered_exactly() {
    let (img, gt) = square_page(16, 6, 10);
    let out = binarize(&img.view(), &with_bins(64)).expect("binarize");
    assert_eq!(out.mask.foreground_count(), 16);
    assert_eq!(out.mask, gt);

    let report = evaluate(&out.mask, &gt, Some(&img.view()), &MetricsConfig::default())
        .expect("evaluate");
    assert_abs_diff_eq!(report.metric(Metric::FMeasure).expect("f"), 1.0);
    assert_abs_diff_eq!(report.metric(Metric::Nrm).expect("nrm"), 0.0);
    assert_abs_diff_eq!(report.metric(Metric::Drd).expect("drd"), 0.0);
}

#[test]
fn pyramid_beats_single_scale_on_noisy_blocks() {
    let (img, gt) = noisy_blocks(10.0, 0x5eed);
    let single = binarize(&img.view(), &with_bins(64)).expect("single");

    let mut cfg = with_bins(64);
    cfg.method = MethodConfig::MultiScale(PyramidConfig {
        levels: 2,
        combine: CombineRule::Vote { fine_weight: 0.5 },
        ..PyramidConfig::default()
    });
    let multi = binarize(&img.view(), &cfg).expect("multi");

    let MethodDetails::MultiScale { levels } = &multi.details else {
        panic!("expected pyramid details");
    };
    assert_eq!(levels.len(), 2);
    assert_eq!((levels[1].width, levels[1].height), (16, 16));

    let (d_single, d_multi) = (drd(&single.mask, &gt), drd(&multi.mask, &gt));
    assert!(
        d_multi < d_single,
        "multi-scale DRD {d_multi} should be below single-scale {d_single}"
    );
}

#[test]
fn sparse_corner_tile_borrows_neighbour_cutoffs() {
    let img = stripes(64, 64);
    let mut cfg = ProcessingConfig::default();
    cfg.method = MethodConfig::RegionAdaptive(RegionConfig {
        tile_size: Some(18),
        min_tile_pixels: 150,
        min_tile_contrast: 5,
    });
    let out = binarize(&img.view(), &cfg).expect("binarize");

    let MethodDetails::RegionAdaptive(details) = &out.details else {
        panic!("expected region details");
    };
    assert_eq!((details.cols, details.rows), (4, 4));
    let tile = |col: usize, row: usize| &details.tiles[row * details.cols + col];
    assert_eq!(tile(3, 3).source, TileThresholdSource::Borrowed { from: (3, 2) });
    assert_eq!(tile(3, 2).source, TileThresholdSource::Searched);
    assert!(tile(3, 3).pair.is_some());
    assert_eq!(tile(3, 3).pair, tile(3, 2).pair);
    assert!(out.warnings.contains(&Warning::BorrowedThreshold {
        col: 3,
        row: 3,
        from: (3, 2)
    }));
    assert_eq!(
        details
            .tiles
            .iter()
            .filter(|t| matches!(t.source, TileThresholdSource::Borrowed { .. }))
            .count(),
        1
    );
}

#[test]
fn solid_ink_corner_tile_keeps_its_ink() {
    let stripes = stripes(64, 64);
    let img = docbin_core::GrayImage::from_fn(64, 64, |x, y| {
        if x >= 54 && y >= 54 {
            40
        } else {
            stripes.get(x, y)
        }
    });
    let mut cfg = ProcessingConfig::default();
    cfg.method = MethodConfig::RegionAdaptive(RegionConfig {
        tile_size: Some(18),
        min_tile_pixels: 150,
        min_tile_contrast: 5,
    });
    let out = binarize(&img.view(), &cfg).expect("binarize");

    let MethodDetails::RegionAdaptive(details) = &out.details else {
        panic!("expected region details");
    };
    let corner = &details.tiles[15];
    assert_eq!((corner.col, corner.row), (3, 3));
    assert_eq!(corner.source, TileThresholdSource::Borrowed { from: (3, 2) });
    assert_eq!(out.mask.crop(54, 54, 10, 10).foreground_count(), 100);
}

#[test]
fn single_scale_is_idempotent() {
    let (img, _) = noisy_blocks(10.0, 7);
    let cfg = with_bins(64);
    let a = binarize(&img.view(), &cfg).expect("first");
    let b = binarize(&img.view(), &cfg).expect("second");
    assert_eq!(a.mask, b.mask);
    assert_eq!(a.details, b.details);
}

#[test]
fn identical_masks_score_perfectly() {
    let (_, gt) = noisy_blocks(10.0, 11);
    let report = evaluate(&gt, &gt, None, &MetricsConfig::default()).expect("evaluate");
    assert_abs_diff_eq!(report.metric(Metric::FMeasure).expect("f"), 1.0);
    assert_abs_diff_eq!(report.metric(Metric::Drd).expect("drd"), 0.0);
}

#[test]
fn empty_mask_against_ink_scores_zero() {
    let (_, gt) = square_page(16, 6, 10);
    let empty = BinaryMask::new(16, 16);
    let report = evaluate(&empty, &gt, None, &MetricsConfig::default()).expect("evaluate");
    assert_abs_diff_eq!(report.metric(Metric::FMeasure).expect("f"), 0.0);
    assert_abs_diff_eq!(report.metric(Metric::Nrm).expect("nrm"), 0.5);
}

#[test]
fn report_details_serialize() {
    let (img, _) = square_page(16, 6, 10);
    let out = binarize(&img.view(), &with_bins(64)).expect("binarize");
    let json = serde_json::to_value(&out.details).expect("json");
    assert_eq!(json["method"], "single_scale");
}
