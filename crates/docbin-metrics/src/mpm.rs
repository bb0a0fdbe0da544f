//! Object-level misalignment between produced and ground-truth masks.
//!
//! Objects are 8-connected foreground components represented by their
//! boundary pixels; components with too few boundary pixels are treated as
//! noise and ignored. Each ground-truth object is charged the symmetric
//! Hausdorff distance to the closest produced object (or `width + height`
//! when nothing was produced). Produced objects farther than the spurious
//! distance from every ground-truth object are charged the same way. The
//! score is the mean charge over charged objects.

use docbin_core::{connected_components, BinaryMask};
use nalgebra::Point2;

use crate::error::{ensure_dims, MetricsError};

struct Contour {
    points: Vec<Point2<f64>>,
    lo: Point2<f64>,
    hi: Point2<f64>,
}

impl Contour {
    fn new(points: Vec<Point2<f64>>) -> Self {
        let (lo, hi) = points.iter().fold(
            (
                Point2::new(f64::INFINITY, f64::INFINITY),
                Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            ),
            |(lo, hi), p| (lo.inf(p), hi.sup(p)),
        );
        Self { points, lo, hi }
    }

    /// Distance between the bounding boxes; never exceeds the Hausdorff
    /// distance of the two contours.
    fn gap(&self, other: &Contour) -> f64 {
        let dx = (other.lo.x - self.hi.x).max(self.lo.x - other.hi.x).max(0.0);
        let dy = (other.lo.y - self.hi.y).max(self.lo.y - other.hi.y).max(0.0);
        dx.hypot(dy)
    }
}

fn contours(mask: &BinaryMask, max_noise_points: usize) -> Vec<Contour> {
    connected_components(mask)
        .iter()
        .map(|c| c.boundary(mask))
        .filter(|boundary| boundary.len() > max_noise_points)
        .map(|boundary| {
            Contour::new(
                boundary
                    .into_iter()
                    .map(|(x, y)| Point2::new(x as f64, y as f64))
                    .collect(),
            )
        })
        .collect()
}

fn directed_hausdorff(from: &[Point2<f64>], to: &[Point2<f64>]) -> f64 {
    from.iter()
        .map(|p| {
            to.iter()
                .map(|q| nalgebra::distance(p, q))
                .fold(f64::INFINITY, f64::min)
        })
        .fold(0.0, f64::max)
}

pub fn hausdorff(a: &[Point2<f64>], b: &[Point2<f64>]) -> f64 {
    directed_hausdorff(a, b).max(directed_hausdorff(b, a))
}

/// Hausdorff distance to the nearest of `others`. Candidates are visited by
/// bounding-box gap and the scan stops once the gap reaches the best match.
fn closest(contour: &Contour, others: &[Contour]) -> Option<f64> {
    let mut order: Vec<(f64, &Contour)> = others.iter().map(|o| (contour.gap(o), o)).collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut best: Option<f64> = None;
    for (gap, other) in order {
        if best.is_some_and(|b| gap >= b) {
            break;
        }
        let d = hausdorff(&contour.points, &other.points);
        best = Some(best.map_or(d, |b| b.min(d)));
    }
    best
}

/// Mean object misalignment; `None` when neither mask has an object with
/// more than `max_noise_points` boundary pixels.
pub fn mpm(
    mask: &BinaryMask,
    gt: &BinaryMask,
    spurious_distance: f64,
    max_noise_points: usize,
) -> Result<Option<f64>, MetricsError> {
    ensure_dims("mask", gt.dims(), mask.dims())?;
    let produced = contours(mask, max_noise_points);
    let truth = contours(gt, max_noise_points);
    if produced.is_empty() && truth.is_empty() {
        return Ok(None);
    }
    let (w, h) = gt.dims();
    let unmatched = (w + h) as f64;

    let mut total = 0.0;
    let mut charged = 0usize;
    for object in &truth {
        total += closest(object, &produced).unwrap_or(unmatched);
        charged += 1;
    }
    for object in &produced {
        match closest(object, &truth) {
            Some(d) if d <= spurious_distance => {}
            Some(d) => {
                total += d;
                charged += 1;
            }
            None => {
                total += unmatched;
                charged += 1;
            }
        }
    }
    Ok(Some(if charged == 0 { 0.0 } else { total / charged as f64 }))
}
