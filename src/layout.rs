//! Deterministic neuron layout generation
//!
//! Places N positions evenly over a filled disc, a disc perimeter
//! ("shell"), or a sphere surface. Layouts are deterministic, and an
//! existing (possibly mutated) position array can be passed in so that
//! surviving neurons keep their positions across respawn/mutation.

use glam::Vec3;

use crate::error::SubstrateError;

/// Target shape for a neuron layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LayoutShape {
    /// Filled disc in the XY plane. `center_hole` reserves the origin
    /// slot so no neuron lands in the center (a center neuron is
    /// geometrically useless for a radial sensor).
    Disc { center_hole: bool },
    /// Disc perimeter in the XY plane
    Shell,
    /// Sphere surface
    Sphere,
}

/// Generate exactly `count` neuron positions over `shape`.
///
/// If `existing` is supplied, the first `min(existing.len(), count)`
/// positions are reused verbatim and only the remainder is freshly
/// generated; a shrinking count truncates. This is the continuity
/// mechanism that keeps sensor/actuator identity stable over
/// evolutionary time.
pub fn generate_layout(
    existing: Option<&[Vec3]>,
    count: usize,
    radius: f32,
    shape: LayoutShape,
) -> Result<Vec<Vec3>, SubstrateError> {
    if count == 0 {
        return Err(SubstrateError::EmptyLayout);
    }
    if radius <= 0.0 {
        return Err(SubstrateError::validation("radius", radius, "> 0"));
    }

    let mut positions: Vec<Vec3> = match existing {
        Some(prev) => prev.iter().copied().take(count).collect(),
        None => Vec::with_capacity(count),
    };

    if positions.len() < count {
        let fresh = fresh_layout(count, radius, shape);
        positions.extend_from_slice(&fresh[positions.len()..]);
    }

    debug_assert_eq!(positions.len(), count);
    Ok(positions)
}

/// Full layout for `count` positions with no history to preserve
fn fresh_layout(count: usize, radius: f32, shape: LayoutShape) -> Vec<Vec3> {
    // A single neuron goes on the rim, not the origin: a sensor with
    // one neuron at the center could never resolve direction.
    if count == 1 {
        return vec![Vec3::new(radius, 0.0, 0.0)];
    }

    match shape {
        LayoutShape::Shell => shell_layout(count, radius),
        LayoutShape::Disc { center_hole } => disc_layout(count, radius, center_hole),
        LayoutShape::Sphere => sphere_layout(count, radius),
    }
}

/// Perimeter layout: equal angular steps starting at (radius, 0, 0)
fn shell_layout(count: usize, radius: f32) -> Vec<Vec3> {
    use std::f32::consts::PI;

    (0..count)
        .map(|i| {
            let angle = (i as f32 / count as f32) * 2.0 * PI;
            Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
        })
        .collect()
}

/// Filled-disc layout: concentric rings, inner to outer, with the
/// in-ring point spacing approximately equal to the ring-to-ring
/// spacing so the center neither clusters nor starves the edge
fn disc_layout(count: usize, radius: f32, center_hole: bool) -> Vec<Vec3> {
    use std::f32::consts::PI;

    let emit = |spacing: f32| -> Vec<Vec3> {
        let rings = (radius / spacing).round().max(1.0) as usize;
        let mut out = Vec::with_capacity(count);
        let first_ring = if center_hole { 1 } else { 0 };
        for k in first_ring..=rings {
            let r = k as f32 * radius / rings as f32;
            let points = if k == 0 {
                1
            } else {
                ((2.0 * PI * r / spacing).round() as usize).max(1)
            };
            for j in 0..points {
                if out.len() == count {
                    return out;
                }
                let angle = (j as f32 / points as f32) * 2.0 * PI;
                out.push(Vec3::new(r * angle.cos(), r * angle.sin(), 0.0));
            }
        }
        out
    };

    let mut spacing = search_spacing(count, |s| {
        let rings = (radius / s).round().max(1.0) as usize;
        let first_ring = if center_hole { 1 } else { 0 };
        (first_ring..=rings)
            .map(|k| {
                if k == 0 {
                    1
                } else {
                    let r = k as f32 * radius / rings as f32;
                    ((2.0 * PI * r / s).round() as usize).max(1)
                }
            })
            .sum()
    }, radius);

    // Rounding in the ring counts can leave the searched spacing a few
    // positions short; tighten until the disc holds them all.
    let mut out = emit(spacing);
    while out.len() < count {
        spacing *= 0.95;
        out = emit(spacing);
    }
    out
}

/// Sphere-surface layout: latitude bands from pole to pole with the
/// same equal-spacing policy as the disc rings
fn sphere_layout(count: usize, radius: f32) -> Vec<Vec3> {
    use std::f32::consts::PI;

    let band_points = |k: usize, bands: usize, spacing: f32| -> usize {
        let lat = k as f32 * PI / bands as f32;
        let ring = radius * lat.sin();
        if ring < spacing * 0.5 {
            1 // pole
        } else {
            ((2.0 * PI * ring / spacing).round() as usize).max(1)
        }
    };

    let emit = |spacing: f32| -> Vec<Vec3> {
        let bands = ((PI * radius / spacing).round() as usize).max(1);
        let mut out = Vec::with_capacity(count);
        for k in 0..=bands {
            let lat = k as f32 * PI / bands as f32;
            let ring = radius * lat.sin();
            let z = radius * lat.cos();
            let points = band_points(k, bands, spacing);
            for j in 0..points {
                if out.len() == count {
                    return out;
                }
                let angle = (j as f32 / points as f32) * 2.0 * PI;
                out.push(Vec3::new(ring * angle.cos(), ring * angle.sin(), z));
            }
        }
        out
    };

    let mut spacing = search_spacing(count, |s| {
        let bands = ((PI * radius / s).round() as usize).max(1);
        (0..=bands).map(|k| band_points(k, bands, s)).sum()
    }, radius);

    let mut out = emit(spacing);
    while out.len() < count {
        spacing *= 0.95;
        out = emit(spacing);
    }
    out
}

/// Largest point spacing whose shape capacity still reaches `count`.
/// Capacity is (approximately) non-increasing in the spacing, so a
/// plain bisection converges; the callers compensate for rounding
/// wobble afterwards.
fn search_spacing(count: usize, capacity: impl Fn(f32) -> usize, radius: f32) -> f32 {
    let mut lo = radius * 1e-3;
    let mut hi = radius * 4.0;
    for _ in 0..48 {
        let mid = 0.5 * (lo + hi);
        if capacity(mid) >= count {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Average nearest-neighbor distance over a position set. Returns 0.0
/// for fewer than two positions; callers guard against that.
pub fn mean_nearest_neighbor_distance(positions: &[Vec3]) -> f32 {
    if positions.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for (i, a) in positions.iter().enumerate() {
        let mut nearest = f32::MAX;
        for (j, b) in positions.iter().enumerate() {
            if i != j {
                nearest = nearest.min(a.distance(*b));
            }
        }
        total += nearest;
    }
    total / positions.len() as f32
}
