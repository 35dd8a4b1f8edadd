//! Geometric primitives shared by the feature extractors.
//!
//! Every function here is total: degenerate input (coincident points,
//! zero-length segments, zero denominators) yields a neutral value instead of
//! `NaN` or infinity, so nothing non-finite can reach a classifier score.

use crate::types::Point;

/// Denominators smaller than this are treated as zero.
pub const EPSILON: f32 = 1e-6;

/// Euclidean distance between two normalized points.
pub fn distance(a: Point, b: Point) -> f32 {
    a.distance(&b)
}

/// Divide, substituting `fallback` for a near-zero denominator or a
/// non-finite quotient.
pub fn safe_ratio(numerator: f32, denominator: f32, fallback: f32) -> f32 {
    if denominator.abs() < EPSILON {
        return fallback;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Unsigned angle at `vertex` between the arms towards `a` and `b`, in
/// degrees (0..=180).
///
/// A zero-length arm has no direction, so the angle is reported as a straight
/// line (180).
pub fn vertex_angle(a: Point, vertex: Point, b: Point) -> f32 {
    let u = a - vertex;
    let v = b - vertex;
    let len_u = (u.x * u.x + u.y * u.y).sqrt();
    let len_v = (v.x * v.x + v.y * v.y).sqrt();
    if len_u < EPSILON || len_v < EPSILON {
        return 180.0;
    }
    let dot = u.x * v.x + u.y * v.y;
    let cross = u.x * v.y - u.y * v.x;
    cross.abs().atan2(dot).to_degrees()
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
/// Falls back to the distance to `a` when the segment is degenerate.
pub fn point_line_distance(p: Point, a: Point, b: Point) -> f32 {
    let d = b - a;
    let len = (d.x * d.x + d.y * d.y).sqrt();
    if len < EPSILON {
        return distance(p, a);
    }
    let w = p - a;
    (d.x * w.y - d.y * w.x).abs() / len
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Standard deviation over mean; 0 for an empty or zero-mean slice.
pub fn coefficient_of_variation(values: &[f32]) -> f32 {
    let m = mean(values);
    if values.is_empty() || m.abs() < EPSILON {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    var.sqrt() / m
}
