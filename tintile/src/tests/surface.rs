use super::support::{grid_mesh, grid_points};
use crate::{delaunay, C};
use nalgebra::Point3;

fn orient(a: &Point3<C>, b: &Point3<C>, c: &Point3<C>) -> C {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn strictly_in_circumcircle(a: &Point3<C>, b: &Point3<C>, c: &Point3<C>, p: &Point3<C>) -> bool {
    let (ax, ay) = (a.x - p.x, a.y - p.y);
    let (bx, by) = (b.x - p.x, b.y - p.y);
    let (cx, cy) = (c.x - p.x, c.y - p.y);
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    det > 1e-12
}

#[test]
fn test_grid_triangulation_counts() {
    // Triangulating every point of a convex region gives
    // 2V - 2 - B triangles and 3V - 3 - B edges.
    let n = 9;
    let tri = delaunay::triangulate(&grid_points(n));
    let v = n * n;
    let b = 4 * (n - 1);
    assert_eq!(tri.points.len(), v);
    assert_eq!(tri.triangles.len(), 2 * v - 2 - b);
}

#[test]
fn test_triangles_are_counterclockwise() {
    let tri = delaunay::triangulate(&grid_points(7));
    for t in &tri.triangles {
        let (a, b, c) = (
            &tri.points[t[0] as usize],
            &tri.points[t[1] as usize],
            &tri.points[t[2] as usize],
        );
        assert!(orient(a, b, c) > 0.0, "triangle {t:?} is not counterclockwise");
    }
}

#[test]
fn test_empty_circumcircles() {
    // Scattered, deterministic points; no vertex may fall strictly
    // inside any triangle's circumcircle.
    let mut points = Vec::new();
    let mut state = 12345u64;
    for _ in 0..48 {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1442695040888963407);
        let x = (state >> 33) as C / (1u64 << 31) as C;
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1442695040888963407);
        let y = (state >> 33) as C / (1u64 << 31) as C;
        points.push(Point3::new(x, y, 0.0));
    }
    let tri = delaunay::triangulate(&points);
    for t in &tri.triangles {
        let (a, b, c) = (
            &tri.points[t[0] as usize],
            &tri.points[t[1] as usize],
            &tri.points[t[2] as usize],
        );
        for (i, p) in tri.points.iter().enumerate() {
            if t.contains(&u32::try_from(i).unwrap()) {
                continue;
            }
            assert!(
                !strictly_in_circumcircle(a, b, c, p),
                "vertex {i} violates the empty circumcircle of {t:?}"
            );
        }
    }
}

#[test]
fn test_duplicate_points_are_dropped() {
    let mut points = grid_points(5);
    let first = points[0];
    let last = points[20];
    points.push(first);
    points.push(last);
    let tri = delaunay::triangulate(&points);
    assert_eq!(tri.points.len(), 25);
}

#[test]
fn test_halfedge_mesh_counts() {
    let n = 9;
    let mesh = grid_mesh(n);
    let v = n * n;
    let b = 4 * (n - 1);
    assert_eq!(mesh.live_vertices(), v);
    assert_eq!(mesh.live_faces(), 2 * v - 2 - b);
    assert_eq!(mesh.live_edges(), 3 * v - 3 - b);
}

#[test]
fn test_border_ring_walks_the_perimeter() {
    let n = 7;
    let mesh = grid_mesh(n);
    let compact = mesh.compact();
    assert_eq!(compact.border_ring.len(), 4 * (n - 1));

    let mut seen = compact.border_ring.clone();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 4 * (n - 1), "ring revisited a vertex");

    for &v in &compact.border_ring {
        let p = compact.positions[v as usize];
        let on_perimeter = p.x.abs() < 1e-9
            || (1.0 - p.x).abs() < 1e-9
            || p.y.abs() < 1e-9
            || (1.0 - p.y).abs() < 1e-9;
        assert!(on_perimeter, "ring vertex {v} at {p:?} is interior");
    }
}

#[test]
fn test_interior_collapse_bookkeeping() {
    let n = 5;
    let mut mesh = grid_mesh(n);
    let (v0, e0, f0) = (mesh.live_vertices(), mesh.live_edges(), mesh.live_faces());

    // Grid ids are x * n + y; (2,2) and (3,2) are interior neighbors.
    let a = 2 * n as u32 + 2;
    let b = 3 * n as u32 + 2;
    let h = mesh.find_halfedge(a, b).expect("grid neighbors share an edge");
    assert!(!mesh.is_border_edge(h));
    assert!(mesh.can_collapse(h));

    let mid = nalgebra::center(&mesh.position(a), &mesh.position(b));
    let survivor = mesh.collapse(h, mid);
    assert_eq!(survivor, a);
    assert!(!mesh.vertex_alive(b));
    assert_eq!(mesh.live_vertices(), v0 - 1);
    assert_eq!(mesh.live_edges(), e0 - 3);
    assert_eq!(mesh.live_faces(), f0 - 2);

    let compact = mesh.compact();
    assert_eq!(compact.positions.len(), v0 - 1);
    let max_id = u32::try_from(compact.positions.len()).unwrap();
    for t in &compact.triangles {
        assert!(t.iter().all(|&i| i < max_id));
        assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
    }
}

#[test]
fn test_border_collapse_shrinks_the_ring() {
    let n = 5;
    let mut mesh = grid_mesh(n);
    let ring_before = mesh.compact().border_ring.len();

    // (1,0) and (2,0) are adjacent south border vertices.
    let a = n as u32;
    let b = 2 * n as u32;
    let h = mesh.find_halfedge(a, b).expect("south border edge");
    assert!(mesh.is_border_edge(h));
    assert!(mesh.can_collapse(h));

    let e0 = mesh.live_edges();
    let f0 = mesh.live_faces();
    mesh.collapse(h, mesh.position(a));
    assert_eq!(mesh.live_edges(), e0 - 2);
    assert_eq!(mesh.live_faces(), f0 - 1);
    assert_eq!(mesh.compact().border_ring.len(), ring_before - 1);
}
