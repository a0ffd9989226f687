//! Per-tile ECEF geometry: bounding-box center, minimum bounding
//! sphere, horizon occlusion point.

use crate::{
    geodetic::{WGS84_A, WGS84_B},
    C,
};
use nalgebra::{Matrix3, Point3, Vector3};

/// A sphere in ECEF space.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Sphere {
    pub center: Point3<C>,
    pub radius: C,
}

impl Sphere {
    fn contains(&self, p: &Point3<C>) -> bool {
        // Relative slack: ECEF magnitudes put absolute f64 noise in
        // the meter range.
        let r2 = self.radius * self.radius;
        (p - self.center).norm_squared() <= r2 * (1.0 + 1e-9) + 1e-12
    }
}

/// Midpoint of the axis-aligned bounding box of `points`.
///
/// Computed in ECEF rather than from mid-lat/lon, which misbehaves
/// near the poles and the antimeridian.
pub(crate) fn bbox_center(points: &[Point3<C>]) -> Point3<C> {
    let mut min = Vector3::repeat(C::INFINITY);
    let mut max = Vector3::repeat(C::NEG_INFINITY);
    for p in points {
        min = min.inf(&p.coords);
        max = max.sup(&p.coords);
    }
    Point3::from((min + max) / 2.0)
}

/// Minimum bounding sphere of `points`, Welzl's algorithm in the
/// move-to-front formulation (recursion bounded by the support size,
/// not the point count).
pub(crate) fn min_sphere(points: &[Point3<C>]) -> Sphere {
    let mut shuffled = points.to_vec();
    // Deterministic pseudo-shuffle keeps the expected-linear behavior
    // of Welzl without dragging in an RNG.
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    for i in (1..shuffled.len()).rev() {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        #[allow(clippy::cast_possible_truncation)]
        let j = (state >> 33) as usize % (i + 1);
        shuffled.swap(i, j);
    }
    let end = shuffled.len();
    let mut support = Vec::with_capacity(4);
    welzl_mtf(&mut shuffled, end, &mut support)
}

fn welzl_mtf(points: &mut [Point3<C>], end: usize, support: &mut Vec<Point3<C>>) -> Sphere {
    let mut sphere = sphere_of_support(support);
    if support.len() == 4 {
        return sphere;
    }
    let mut i = 0;
    while i < end {
        let p = points[i];
        if !sphere.contains(&p) {
            support.push(p);
            sphere = welzl_mtf(points, i, support);
            support.pop();
            // p is on the boundary of the current sphere; keep it
            // early so later rebuilds see it first.
            points[..=i].rotate_right(1);
        }
        i += 1;
    }
    sphere
}

fn sphere_of_support(support: &[Point3<C>]) -> Sphere {
    match support {
        [] => Sphere {
            center: Point3::origin(),
            radius: 0.0,
        },
        [a] => Sphere {
            center: *a,
            radius: 0.0,
        },
        [a, b] => two_point_sphere(a, b),
        [a, b, c] => circumsphere3(a, b, c),
        [a, b, c, d] => circumsphere4(a, b, c, d),
        _ => unreachable!("support set never exceeds four points"),
    }
}

fn two_point_sphere(a: &Point3<C>, b: &Point3<C>) -> Sphere {
    let center = nalgebra::center(a, b);
    Sphere {
        radius: (a - center).norm(),
        center,
    }
}

fn circumsphere3(a: &Point3<C>, b: &Point3<C>, c: &Point3<C>) -> Sphere {
    let ab = b - a;
    let ac = c - a;
    let normal = ab.cross(&ac);
    let denom = 2.0 * normal.norm_squared();
    if denom <= C::EPSILON {
        // Collinear support: the widest pair bounds all three.
        let candidates = [
            two_point_sphere(a, b),
            two_point_sphere(a, c),
            two_point_sphere(b, c),
        ];
        return candidates
            .into_iter()
            .max_by(|s1, s2| s1.radius.total_cmp(&s2.radius))
            .expect("three candidate spheres");
    }
    let to_center =
        (normal.cross(&ab) * ac.norm_squared() + ac.cross(&normal) * ab.norm_squared()) / denom;
    let center = a + to_center;
    Sphere {
        radius: (a - center).norm(),
        center,
    }
}

fn circumsphere4(a: &Point3<C>, b: &Point3<C>, c: &Point3<C>, d: &Point3<C>) -> Sphere {
    let rows = [b - a, c - a, d - a];
    let m = Matrix3::from_rows(&[
        (rows[0] * 2.0).transpose(),
        (rows[1] * 2.0).transpose(),
        (rows[2] * 2.0).transpose(),
    ]);
    let rhs = Vector3::new(
        rows[0].norm_squared() + 2.0 * rows[0].dot(&a.coords),
        rows[1].norm_squared() + 2.0 * rows[1].dot(&a.coords),
        rows[2].norm_squared() + 2.0 * rows[2].dot(&a.coords),
    );
    match m.lu().solve(&rhs) {
        Some(center) => {
            let center = Point3::from(center);
            Sphere {
                radius: (a - center).norm(),
                center,
            }
        }
        // Coplanar support degenerates to the circumcircle case.
        None => circumsphere3(a, b, c),
    }
}

/// Horizon occlusion point for a set of ECEF points, following the
/// Cesium horizon-culling construction: the farthest point along the
/// direction from the Earth center through `center`, measured in
/// ellipsoid-scaled space, such that whenever this point is below the
/// horizon the whole set is.
pub(crate) fn horizon_occlusion_point(points: &[Point3<C>], center: Point3<C>) -> Point3<C> {
    let radii = Vector3::new(WGS84_A, WGS84_A, WGS84_B);
    let scaled_center = center.coords.component_div(&radii);
    let direction = scaled_center.normalize();

    let mut max_magnitude: C = 0.0;
    for p in points {
        max_magnitude = max_magnitude.max(occlusion_magnitude(p, &direction, &radii));
    }
    let scaled = direction * max_magnitude;
    Point3::from(scaled.component_mul(&radii))
}

/// The scaled-space magnitude the occlusion point needs along
/// `direction` to guarantee `point` is hidden whenever it is.
pub(crate) fn occlusion_magnitude(
    point: &Point3<C>,
    direction: &Vector3<C>,
    radii: &Vector3<C>,
) -> C {
    let scaled = point.coords.component_div(radii);
    let magnitude_squared = scaled.norm_squared();
    let magnitude = magnitude_squared.sqrt();
    let to_point = scaled / magnitude;

    let cos_alpha = to_point.dot(direction);
    let sin_alpha = to_point.cross(direction).norm();
    let cos_beta = 1.0 / magnitude;
    // Bathymetry can dip inside the ellipsoid; clamp instead of
    // producing NaN for those samples.
    let sin_beta = (magnitude_squared - 1.0).max(0.0).sqrt() * cos_beta;

    let denom = cos_alpha * cos_beta - sin_alpha * sin_beta;
    if denom <= 0.0 {
        return C::INFINITY;
    }
    1.0 / denom
}
