use docbin_core::{BinaryMask, GrayImageView, Warning};
use serde::{Deserialize, Serialize};

use super::{BinarizationMethod, MethodDetails, MethodOutput, RunContext};
use crate::config::RegionConfig;
use crate::engine::ThresholdEngine;
use crate::error::BinarizeError;
use crate::search::ThresholdPair;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Where a tile's cutoffs came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TileThresholdSource {
    Searched,
    /// Copied from the tile at grid position `(col, row)`.
    Borrowed { from: (usize, usize) },
    /// Intensity range below the contrast floor; left background.
    LowContrast,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileSummary {
    pub col: usize,
    pub row: usize,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub pair: Option<ThresholdPair>,
    pub source: TileThresholdSource,
}

impl TileSummary {
    fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    fn pixels(&self) -> usize {
        self.width * self.height
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionDetails {
    pub bins: usize,
    pub tile_size: usize,
    pub cols: usize,
    pub rows: usize,
    /// Row-major.
    pub tiles: Vec<TileSummary>,
    /// Whole-image cutoffs used when the stitched mask was all one class.
    pub global_fallback: Option<ThresholdPair>,
}

/// Tile method: one search per tile, masks concatenated without blending.
pub struct RegionAdaptive {
    engine: ThresholdEngine,
    config: RegionConfig,
}

enum TileState {
    Done(BinaryMask, Vec<Warning>),
    /// Too small to search; resolved from its neighbours afterwards.
    Sparse,
}

impl RegionAdaptive {
    pub fn new(engine: ThresholdEngine, config: RegionConfig) -> Self {
        Self { engine, config }
    }

    fn layout(&self, width: usize, height: usize) -> (usize, Vec<TileSummary>, usize, usize) {
        let tile = self.config.resolved_tile_size(width, height);
        let (cols, rows) = (width.div_ceil(tile), height.div_ceil(tile));
        let mut tiles = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = (col * tile, row * tile);
                tiles.push(TileSummary {
                    col,
                    row,
                    x,
                    y,
                    width: tile.min(width - x),
                    height: tile.min(height - y),
                    pair: None,
                    source: TileThresholdSource::Searched,
                });
            }
        }
        (tile, tiles, cols, rows)
    }

    fn process_tile(
        &self,
        src: &GrayImageView<'_>,
        tile: &mut TileSummary,
        bins: usize,
    ) -> Result<TileState, BinarizeError> {
        if tile.pixels() < self.config.min_tile_pixels {
            return Ok(TileState::Sparse);
        }
        let img = src.crop(tile.x, tile.y, tile.width, tile.height);
        let view = img.view();
        let (lo, hi) = view.min_max();
        let range = hi - lo;
        if range < self.config.min_tile_contrast {
            tile.source = TileThresholdSource::LowContrast;
            let warning = Warning::LowContrastTile {
                col: tile.col,
                row: tile.row,
                range,
            };
            return Ok(TileState::Done(
                BinaryMask::new(tile.width, tile.height),
                vec![warning],
            ));
        }
        let context = format!("tile ({}, {})", tile.col, tile.row);
        let t = self.engine.threshold(&view, bins, &context)?;
        tile.pair = Some(t.outcome.pair);
        Ok(TileState::Done(t.mask, t.warnings))
    }
}

/// Index of the searched tile nearest to `target` by centre distance; ties go
/// to the lowest row-major index.
fn nearest_searched(tiles: &[TileSummary], target: usize) -> Option<usize> {
    let (cx, cy) = tiles[target].center();
    let mut best: Option<(f64, usize)> = None;
    for (i, t) in tiles.iter().enumerate() {
        if i == target || t.source != TileThresholdSource::Searched || t.pair.is_none() {
            continue;
        }
        let (tx, ty) = t.center();
        let d = (tx - cx).powi(2) + (ty - cy).powi(2);
        if best.is_none_or(|(bd, _)| d < bd) {
            best = Some((d, i));
        }
    }
    best.map(|(_, i)| i)
}

impl BinarizationMethod for RegionAdaptive {
    fn name(&self) -> &'static str {
        "region_adaptive"
    }

    fn binarize(
        &self,
        src: &GrayImageView<'_>,
        ctx: &RunContext<'_>,
    ) -> Result<MethodOutput, BinarizeError> {
        let (tile_size, mut tiles, cols, rows) = self.layout(src.width, src.height);
        let bins = self.engine.resolve_bins(src);

        let states: Vec<TileState> = ctx.stage("tiles.threshold", || {
            #[cfg(feature = "rayon")]
            let iter = tiles.par_iter_mut();
            #[cfg(not(feature = "rayon"))]
            let iter = tiles.iter_mut();
            iter.map(|t| self.process_tile(src, t, bins))
                .collect::<Result<Vec<_>, _>>()
        })?;

        // sparse tiles read only the finished results of their siblings
        let mut mask = BinaryMask::new(src.width, src.height);
        let mut warnings = Vec::new();
        let mut pending = Vec::new();
        for (i, state) in states.into_iter().enumerate() {
            match state {
                TileState::Done(tile_mask, tile_warnings) => {
                    mask.paste(&tile_mask, tiles[i].x, tiles[i].y);
                    warnings.extend(tile_warnings);
                }
                TileState::Sparse => pending.push(i),
            }
        }
        ctx.stage("tiles.borrow", || -> Result<(), BinarizeError> {
            for &i in &pending {
                let img = src.crop(tiles[i].x, tiles[i].y, tiles[i].width, tiles[i].height);
                let tile_mask = match nearest_searched(&tiles, i) {
                    Some(donor) => {
                        let pair = tiles[donor].pair.unwrap_or(ThresholdPair::mid_range(bins));
                        let from = (tiles[donor].col, tiles[donor].row);
                        tiles[i].pair = Some(pair);
                        tiles[i].source = TileThresholdSource::Borrowed { from };
                        warnings.push(Warning::BorrowedThreshold {
                            col: tiles[i].col,
                            row: tiles[i].row,
                            from,
                        });
                        self.engine.apply_pair(&img.view(), pair, bins)?
                    }
                    None => {
                        // no tile was large enough; search this one anyway
                        let context = format!("tile ({}, {})", tiles[i].col, tiles[i].row);
                        let t = self.engine.threshold(&img.view(), bins, &context)?;
                        tiles[i].pair = Some(t.outcome.pair);
                        warnings.extend(t.warnings);
                        t.mask
                    }
                };
                mask.paste(&tile_mask, tiles[i].x, tiles[i].y);
            }
            Ok(())
        })?;

        let mut global_fallback = None;
        if mask.is_empty() || mask.is_full() {
            let t = ctx.stage("tiles.global_fallback", || {
                self.engine.threshold(src, bins, "region-adaptive global fallback")
            })?;
            warnings.push(Warning::GlobalFallback {
                method: self.name().to_string(),
            });
            warnings.extend(t.warnings);
            global_fallback = Some(t.outcome.pair);
            mask = t.mask;
        }

        Ok(MethodOutput {
            mask,
            details: MethodDetails::RegionAdaptive(RegionDetails {
                bins,
                tile_size,
                cols,
                rows,
                tiles,
                global_fallback,
            }),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use docbin_core::{GrayImage, Interpolation, NoopObserver, OperationId};

    fn ctx() -> RunContext<'static> {
        RunContext {
            id: OperationId::next(),
            observer: &NoopObserver,
            interpolation: Interpolation::Bilinear,
        }
    }

    fn method(config: RegionConfig) -> RegionAdaptive {
        let mut cfg = ProcessingConfig::default();
        cfg.neighborhood.window = crate::config::WindowSize::Fixed(5);
        RegionAdaptive::new(ThresholdEngine::from_config(&cfg), config)
    }

    #[test]
    fn layout_covers_image_with_smaller_last_tiles() {
        let m = method(RegionConfig {
            tile_size: Some(18),
            ..RegionConfig::default()
        });
        let (tile, tiles, cols, rows) = m.layout(64, 40);
        assert_eq!((tile, cols, rows), (18, 4, 3));
        assert_eq!(tiles.iter().map(|t| t.pixels()).sum::<usize>(), 64 * 40);
        assert_eq!((tiles[3].width, tiles[11].height), (10, 4));
    }

    #[test]
    fn flat_tiles_fall_back_to_a_global_threshold() {
        let img = GrayImage::from_fn(32, 32, |x, _| if x < 16 { 30 } else { 200 });
        let m = method(RegionConfig {
            tile_size: Some(16),
            min_tile_pixels: 16,
            min_tile_contrast: 5,
        });
        let out = m.binarize(&img.view(), &ctx()).expect("binarize");
        assert_eq!(out.mask.foreground_count(), 16 * 32);
        assert!(out.mask.get(0, 0) && !out.mask.get(31, 31));
        let low_contrast = out
            .warnings
            .iter()
            .filter(|w| matches!(w, Warning::LowContrastTile { .. }))
            .count();
        assert_eq!(low_contrast, 4);
        assert!(out.warnings.contains(&Warning::GlobalFallback {
            method: "region_adaptive".into()
        }));
        let MethodDetails::RegionAdaptive(details) = out.details else {
            panic!("wrong details");
        };
        assert!(details
            .tiles
            .iter()
            .all(|t| t.source == TileThresholdSource::LowContrast));
        assert!(details.global_fallback.is_some());
    }

    #[test]
    fn small_flat_ink_tile_borrows_instead_of_staying_background() {
        // the 8x8 corner tile is solid ink and below min_tile_pixels
        let img = GrayImage::from_fn(24, 24, |x, y| {
            if x >= 16 && y >= 16 {
                40
            } else if (y / 3) % 2 == 0 {
                40
            } else {
                210
            }
        });
        let m = method(RegionConfig {
            tile_size: Some(16),
            min_tile_pixels: 100,
            min_tile_contrast: 5,
        });
        let out = m.binarize(&img.view(), &ctx()).expect("binarize");
        let MethodDetails::RegionAdaptive(details) = out.details else {
            panic!("wrong details");
        };
        let corner = &details.tiles[3];
        assert_eq!((corner.col, corner.row), (1, 1));
        assert!(matches!(
            corner.source,
            TileThresholdSource::Borrowed { .. }
        ));
        assert_eq!(out.mask.crop(16, 16, 8, 8).foreground_count(), 64);
        assert!(details.global_fallback.is_none());
    }

    #[test]
    fn nearest_prefers_lower_index_on_ties() {
        let m = method(RegionConfig {
            tile_size: Some(18),
            ..RegionConfig::default()
        });
        let (_, mut tiles, _, _) = m.layout(64, 64);
        for t in &mut tiles {
            t.pair = Some(ThresholdPair::mid_range(32));
        }
        let last = tiles.len() - 1;
        let donor = nearest_searched(&tiles, last).expect("donor");
        assert_eq!((tiles[donor].col, tiles[donor].row), (3, 2));
    }
}
