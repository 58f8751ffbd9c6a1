//! Planar point-set helpers used by motion adaptation and landmark normalization.

use kurbo::{BezPath, Shape as _};

use crate::foundation::core::{Point, Vec2};
use crate::foundation::error::{AnimError, AnimResult};

/// Relative tolerance under which a hull is treated as having zero area.
const AREA_EPS: f64 = 1e-12;

/// Convex hull of `points` in counter-clockwise order (Andrew's monotone chain).
///
/// Fails with [`AnimError::DegenerateGeometry`] for fewer than three distinct points or a
/// collinear set, the cases where no two-dimensional hull exists.
pub fn convex_hull(points: &[Point]) -> AnimResult<Vec<Point>> {
    if points.iter().any(|p| !p.is_finite()) {
        return Err(AnimError::degenerate("point set contains non-finite values"));
    }

    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return Err(AnimError::degenerate(format!(
            "convex hull needs at least 3 distinct points, got {}",
            pts.len()
        )));
    }

    let mut hull: Vec<Point> = Vec::with_capacity(pts.len() + 1);
    for &p in &pts {
        push_turning_left(&mut hull, p, 2);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        push_turning_left(&mut hull, p, lower_len);
    }
    // The upper chain ends on the first point again.
    hull.pop();

    if hull.len() < 3 {
        return Err(AnimError::degenerate("point set is collinear"));
    }
    Ok(hull)
}

/// Area enclosed by the convex hull of `points` (scipy's `ConvexHull(...).volume` in 2D).
pub fn hull_area(points: &[Point]) -> AnimResult<f64> {
    let hull = convex_hull(points)?;
    let area = polygon_area(&hull);

    let extent = bounding_extent(&hull);
    if area <= AREA_EPS * extent * extent {
        return Err(AnimError::degenerate("convex hull has zero area"));
    }
    Ok(area)
}

/// Mean of `points`. Returns the origin for an empty set.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::ORIGIN;
    }
    let sum = points
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
    (sum / points.len() as f64).to_point()
}

fn polygon_area(hull: &[Point]) -> f64 {
    let mut path = BezPath::new();
    path.move_to(hull[0]);
    for &p in &hull[1..] {
        path.line_to(p);
    }
    path.close_path();
    path.area().abs()
}

fn bounding_extent(points: &[Point]) -> f64 {
    let (mut min, mut max) = (points[0], points[0]);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (max - min).hypot().max(f64::MIN_POSITIVE)
}

fn push_turning_left(hull: &mut Vec<Point>, p: Point, min_len: usize) {
    while hull.len() >= min_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
        hull.pop();
    }
    hull.push(p);
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a - o).cross(b - o)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/geometry.rs"]
mod tests;
