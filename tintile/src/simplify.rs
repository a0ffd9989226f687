//! Constrained edge-collapse simplification.
//!
//! Collapses are ordered by a quadric error cost and filtered through
//! a placement policy that keeps committed borders and the four tile
//! corners exactly where the neighbors already expect them.

use crate::{
    mesh::SurfaceMesh,
    C,
};
use log::debug;
use nalgebra::{Matrix4, Point3, Vector3, Vector4};
use std::collections::BinaryHeap;

/// Distance from a unit-square side under which a coordinate counts
/// as lying on that side.
const LINE_EPS: C = 1e-9;
/// Twice-area under which a result triangle counts as degenerate.
const AREA_EPS: C = 1e-14;

/// Which tile borders are already committed by neighboring tiles and
/// must come through simplification untouched.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BorderLocks {
    pub west: bool,
    pub south: bool,
    pub east: bool,
    pub north: bool,
}

impl BorderLocks {
    /// True when the placement `p` sits on a locked border line.
    fn touches(&self, p: &Point3<C>) -> bool {
        (self.west && p.x.abs() < LINE_EPS)
            || (self.east && (1.0 - p.x).abs() < LINE_EPS)
            || (self.south && p.y.abs() < LINE_EPS)
            || (self.north && (1.0 - p.y).abs() < LINE_EPS)
    }

    /// True when the segment `p0`-`p1` lies entirely on a locked
    /// border line.
    fn locks_segment(&self, p0: &Point3<C>, p1: &Point3<C>) -> bool {
        (self.west && p0.x.abs() < LINE_EPS && p1.x.abs() < LINE_EPS)
            || (self.east && (1.0 - p0.x).abs() < LINE_EPS && (1.0 - p1.x).abs() < LINE_EPS)
            || (self.south && p0.y.abs() < LINE_EPS && p1.y.abs() < LINE_EPS)
            || (self.north && (1.0 - p0.y).abs() < LINE_EPS && (1.0 - p1.y).abs() < LINE_EPS)
    }
}

/// How a viable collapse resolves: one endpoint absorbs the other, or
/// both merge at a new placement.
#[derive(Clone, Copy, Debug)]
enum Resolution {
    OntoFirst,
    OntoSecond,
    At(Point3<C>),
}

/// Everything the placement policy looks at for one candidate edge.
struct EdgeProfile {
    p0: Point3<C>,
    p1: Point3<C>,
    corner0: bool,
    corner1: bool,
    edge_constrained: bool,
    incident0_constrained: bool,
    incident1_constrained: bool,
    edge_on_border: bool,
    boundary0: bool,
    boundary1: bool,
}

struct Candidate {
    cost: C,
    a: u32,
    b: u32,
    gen_a: u32,
    gen_b: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    // BinaryHeap is a max-heap; invert so the cheapest edge pops
    // first.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.cost.total_cmp(&self.cost)
    }
}

/// Collapses edges until `stop_ratio` of the initial edge count
/// survives, or no admissible collapse remains. Returns the number of
/// collapses performed.
pub(crate) fn simplify(mesh: &mut SurfaceMesh, locks: BorderLocks, stop_ratio: C) -> usize {
    let initial_edges = mesh.live_edges();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let target = (initial_edges as C * stop_ratio).ceil() as usize;

    let vertex_count = mesh.vertex_count();
    let corners: Vec<bool> = (0..vertex_count)
        .map(|v| is_corner(&mesh.position(u32::try_from(v).expect("vertex id fits u32"))))
        .collect();

    let mut quadrics = vec![Matrix4::<C>::zeros(); vertex_count];
    for fh in mesh.face_handles() {
        let [a, b, c] = mesh.face_vertices(fh);
        let q = face_quadric(
            &mesh.position(a),
            &mesh.position(b),
            &mesh.position(c),
        );
        quadrics[a as usize] += q;
        quadrics[b as usize] += q;
        quadrics[c as usize] += q;
    }

    let mut gens = vec![0u32; vertex_count];
    let mut heap = BinaryHeap::with_capacity(initial_edges * 2);
    for v in 0..vertex_count {
        let v = u32::try_from(v).expect("vertex id fits u32");
        for n in mesh.neighbors(v) {
            if v < n {
                push_candidate(&mut heap, mesh, &quadrics, &corners, &gens, locks, v, n);
            }
        }
    }

    let mut collapses = 0;
    while mesh.live_edges() > target {
        let Some(candidate) = heap.pop() else {
            // Everything left is constrained; accept the mesh as is.
            break;
        };
        let (a, b) = (candidate.a, candidate.b);
        if !mesh.vertex_alive(a)
            || !mesh.vertex_alive(b)
            || gens[a as usize] != candidate.gen_a
            || gens[b as usize] != candidate.gen_b
        {
            continue;
        }
        let Some(h) = mesh.find_halfedge(a, b) else {
            continue;
        };
        let profile = profile_edge(mesh, &corners, locks, h);
        let quadric = quadrics[a as usize] + quadrics[b as usize];
        let Some(resolution) = resolve(&profile, &quadric, locks) else {
            continue;
        };

        let (collapse_he, position) = match resolution {
            Resolution::OntoFirst => (h, profile.p0),
            Resolution::OntoSecond => (mesh.twin(h), profile.p1),
            Resolution::At(p) => (h, p),
        };
        if !mesh.can_collapse(collapse_he) {
            continue;
        }
        if !keeps_orientation(mesh, a, b, &position) {
            continue;
        }

        let survivor = mesh.collapse(collapse_he, position);
        collapses += 1;
        quadrics[survivor as usize] = quadric;
        gens[survivor as usize] += 1;
        for n in mesh.neighbors(survivor) {
            push_candidate(
                &mut heap, mesh, &quadrics, &corners, &gens, locks, survivor, n,
            );
        }
    }

    debug!(
        "simplified {initial_edges} edges down to {} ({collapses} collapses, target {target})",
        mesh.live_edges()
    );
    collapses
}

#[allow(clippy::too_many_arguments)]
fn push_candidate(
    heap: &mut BinaryHeap<Candidate>,
    mesh: &SurfaceMesh,
    quadrics: &[Matrix4<C>],
    corners: &[bool],
    gens: &[u32],
    locks: BorderLocks,
    a: u32,
    b: u32,
) {
    let Some(h) = mesh.find_halfedge(a, b) else {
        return;
    };
    let profile = profile_edge(mesh, corners, locks, h);
    let quadric = quadrics[a as usize] + quadrics[b as usize];
    let Some(resolution) = resolve(&profile, &quadric, locks) else {
        return;
    };
    let position = match resolution {
        Resolution::OntoFirst => profile.p0,
        Resolution::OntoSecond => profile.p1,
        Resolution::At(p) => p,
    };
    heap.push(Candidate {
        cost: quadric_cost(&quadric, &position),
        a,
        b,
        gen_a: gens[a as usize],
        gen_b: gens[b as usize],
    });
}

fn profile_edge(
    mesh: &SurfaceMesh,
    corners: &[bool],
    locks: BorderLocks,
    h: u32,
) -> EdgeProfile {
    let a = mesh.origin(h);
    let b = mesh.target(h);
    let p0 = mesh.position(a);
    let p1 = mesh.position(b);
    EdgeProfile {
        edge_constrained: locks.locks_segment(&p0, &p1),
        incident0_constrained: incident_constrained(mesh, locks, a),
        incident1_constrained: incident_constrained(mesh, locks, b),
        edge_on_border: mesh.is_border_edge(h),
        boundary0: mesh.is_border_vertex(a),
        boundary1: mesh.is_border_vertex(b),
        corner0: corners[a as usize],
        corner1: corners[b as usize],
        p0,
        p1,
    }
}

fn incident_constrained(mesh: &SurfaceMesh, locks: BorderLocks, v: u32) -> bool {
    let p = mesh.position(v);
    mesh.neighbors(v)
        .into_iter()
        .any(|n| locks.locks_segment(&p, &mesh.position(n)))
}

/// The placement policy: decides whether the edge may collapse and
/// where the merged vertex goes.
fn resolve(profile: &EdgeProfile, quadric: &Matrix4<C>, locks: BorderLocks) -> Option<Resolution> {
    // Two corners may never merge.
    if profile.corner0 && profile.corner1 {
        return None;
    }
    // Committed border edges stay.
    if profile.edge_constrained {
        return None;
    }
    // A corner absorbs its neighbor.
    if profile.corner0 {
        return Some(Resolution::OntoFirst);
    }
    if profile.corner1 {
        return Some(Resolution::OntoSecond);
    }
    // A vertex pinned by a committed border edge cannot move.
    if profile.incident0_constrained {
        return Some(Resolution::OntoFirst);
    }
    if profile.incident1_constrained {
        return Some(Resolution::OntoSecond);
    }

    let resolution = base_placement(profile, quadric)?;
    let position = match resolution {
        Resolution::OntoFirst => profile.p0,
        Resolution::OntoSecond => profile.p1,
        Resolution::At(p) => p,
    };
    // Base placements must stay inside the tile and keep off borders
    // other tiles have committed to.
    if !(0.0..=1.0).contains(&position.x) || !(0.0..=1.0).contains(&position.y) {
        return None;
    }
    if locks.touches(&position) {
        return None;
    }
    Some(resolution)
}

/// Unconstrained placement: quadric-optimal for interior edges, and
/// never lets the mesh boundary creep inward.
fn base_placement(profile: &EdgeProfile, quadric: &Matrix4<C>) -> Option<Resolution> {
    if profile.edge_on_border {
        // Both endpoints sit on the same perimeter side; restrict the
        // merged vertex to their segment so the border stays a line.
        return Some(best_candidate(profile, quadric));
    }
    match (profile.boundary0, profile.boundary1) {
        // An interior chord between two border vertices would pinch
        // the surface.
        (true, true) => None,
        (true, false) => Some(Resolution::OntoFirst),
        (false, true) => Some(Resolution::OntoSecond),
        (false, false) => Some(
            optimal_position(quadric).map_or_else(
                || best_candidate(profile, quadric),
                Resolution::At,
            ),
        ),
    }
}

/// The cheapest of the two endpoints and their midpoint.
fn best_candidate(profile: &EdgeProfile, quadric: &Matrix4<C>) -> Resolution {
    let mid = nalgebra::center(&profile.p0, &profile.p1);
    let candidates = [
        (Resolution::OntoFirst, quadric_cost(quadric, &profile.p0)),
        (Resolution::At(mid), quadric_cost(quadric, &mid)),
        (Resolution::OntoSecond, quadric_cost(quadric, &profile.p1)),
    ];
    candidates
        .into_iter()
        .min_by(|(_, c1), (_, c2)| c1.total_cmp(c2))
        .map(|(r, _)| r)
        .expect("three candidates")
}

/// Verifies that no surviving face around the merged vertex flips or
/// degenerates in the (u, v) plane.
fn keeps_orientation(mesh: &SurfaceMesh, a: u32, b: u32, position: &Point3<C>) -> bool {
    for v in [a, b] {
        for fh in mesh.faces_around(v) {
            let ids = mesh.face_vertices(fh);
            if ids.contains(&a) && ids.contains(&b) {
                // This face vanishes with the collapse.
                continue;
            }
            let ps = ids.map(|id| {
                if id == a || id == b {
                    *position
                } else {
                    mesh.position(id)
                }
            });
            let area2 = (ps[1].x - ps[0].x) * (ps[2].y - ps[0].y)
                - (ps[1].y - ps[0].y) * (ps[2].x - ps[0].x);
            if area2 <= AREA_EPS {
                return false;
            }
        }
    }
    true
}

fn is_corner(p: &Point3<C>) -> bool {
    let on_x = p.x.abs() < LINE_EPS || (1.0 - p.x).abs() < LINE_EPS;
    let on_y = p.y.abs() < LINE_EPS || (1.0 - p.y).abs() < LINE_EPS;
    on_x && on_y
}

fn face_quadric(p0: &Point3<C>, p1: &Point3<C>, p2: &Point3<C>) -> Matrix4<C> {
    let normal = (p1 - p0).cross(&(p2 - p0));
    let len = normal.norm();
    if len < 1e-15 {
        return Matrix4::zeros();
    }
    let n = normal / len;
    let plane = Vector4::new(n.x, n.y, n.z, -n.dot(&p0.coords));
    plane * plane.transpose()
}

fn quadric_cost(q: &Matrix4<C>, p: &Point3<C>) -> C {
    let v = Vector4::new(p.x, p.y, p.z, 1.0);
    (v.transpose() * q * v)[(0, 0)].max(0.0)
}

/// Minimizer of the quadric, when it is well conditioned enough to
/// trust.
fn optimal_position(q: &Matrix4<C>) -> Option<Point3<C>> {
    let a = q.fixed_view::<3, 3>(0, 0).into_owned();
    if a.determinant().abs() < 1e-10 {
        return None;
    }
    let b = Vector3::new(q[(0, 3)], q[(1, 3)], q[(2, 3)]);
    a.lu().solve(&(-b)).map(Point3::from)
}
