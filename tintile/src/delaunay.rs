//! Incremental 2D Delaunay triangulation of the normalized sample
//! set. Positions are the (u, v) components; the height rides along
//! as an attribute and never influences connectivity.

use crate::C;
use nalgebra::Point3;

const INVALID: u32 = u32::MAX;
/// Strictness margin for the in-circle and orientation tests.
const EPS: C = 1e-12;
/// Squared distance under which an inserted point is treated as a
/// duplicate of an existing vertex. Border packets can legitimately
/// deliver the shared SW corner twice.
const DUP_EPS_SQ: C = 1e-18;

/// A planar triangulation lifted to a surface by the per-vertex
/// height attribute.
pub(crate) struct Triangulation {
    /// Accepted points; duplicates of earlier points are dropped.
    pub points: Vec<Point3<C>>,
    /// Counterclockwise triangles indexing `points`.
    pub triangles: Vec<[u32; 3]>,
}

struct Tri {
    /// Vertex ids; 0..3 are the super-triangle anchors.
    v: [u32; 3],
    /// Neighbor across edge `(v[i], v[(i + 1) % 3])`.
    n: [u32; 3],
    alive: bool,
}

/// Delaunay-triangulates `input` over (u, v).
pub(crate) fn triangulate(input: &[Point3<C>]) -> Triangulation {
    let mut dt = Builder::new(input.len());
    for p in input {
        dt.insert(*p);
    }
    dt.finish()
}

struct Builder {
    points: Vec<Point3<C>>,
    tris: Vec<Tri>,
    /// Visited stamps for the cavity search, one slot per triangle.
    stamps: Vec<u32>,
    stamp: u32,
    /// Walk start hint.
    hint: u32,
}

impl Builder {
    fn new(capacity: usize) -> Builder {
        // Anchor triangle far enough out that every sample and every
        // circumcircle of the final surface stays inside.
        let points = vec![
            Point3::new(-64.0, -64.0, 0.0),
            Point3::new(192.0, -64.0, 0.0),
            Point3::new(-64.0, 192.0, 0.0),
        ];
        let tris = vec![Tri {
            v: [0, 1, 2],
            n: [INVALID; 3],
            alive: true,
        }];
        Builder {
            points: {
                let mut all = points;
                all.reserve(capacity);
                all
            },
            tris,
            stamps: vec![0],
            stamp: 0,
            hint: 0,
        }
    }

    fn insert(&mut self, p: Point3<C>) {
        let containing = match self.locate(&p) {
            Located::Inside(t) => t,
            Located::Duplicate => return,
        };

        // Grow the cavity of triangles whose circumcircle strictly
        // contains p.
        self.stamp += 1;
        let mut cavity = vec![containing];
        self.stamps[containing as usize] = self.stamp;
        let mut i = 0;
        while i < cavity.len() {
            let t = cavity[i] as usize;
            for k in 0..3 {
                let nb = self.tris[t].n[k];
                if nb == INVALID || self.stamps[nb as usize] == self.stamp {
                    continue;
                }
                if self.in_circle(nb, &p) {
                    self.stamps[nb as usize] = self.stamp;
                    cavity.push(nb);
                }
            }
            i += 1;
        }

        // Boundary edges of the cavity, in the dead triangles'
        // (counterclockwise) orientation.
        let mut boundary = Vec::with_capacity(cavity.len() + 2);
        for &t in &cavity {
            let tri = &self.tris[t as usize];
            for k in 0..3 {
                let nb = tri.n[k];
                if nb == INVALID || self.stamps[nb as usize] != self.stamp {
                    boundary.push((tri.v[k], tri.v[(k + 1) % 3], nb));
                }
            }
        }
        for &t in &cavity {
            self.tris[t as usize].alive = false;
        }

        let pid = u32::try_from(self.points.len()).expect("vertex id fits u32");
        self.points.push(p);

        // Retriangulate the cavity as a fan around p and stitch the
        // new triangles to each other and to the outside.
        let base = self.tris.len();
        let mut start_of = Vec::with_capacity(boundary.len());
        let mut end_of = Vec::with_capacity(boundary.len());
        for (offset, &(a, b, outer)) in boundary.iter().enumerate() {
            let id = u32::try_from(base + offset).expect("triangle id fits u32");
            self.tris.push(Tri {
                v: [a, b, pid],
                n: [outer, INVALID, INVALID],
                alive: true,
            });
            self.stamps.push(0);
            start_of.push((a, id));
            end_of.push((b, id));
            if outer != INVALID {
                let outer = outer as usize;
                for k in 0..3 {
                    if self.tris[outer].v[k] == b && self.tris[outer].v[(k + 1) % 3] == a {
                        self.tris[outer].n[k] = id;
                    }
                }
            }
        }
        for (offset, &(a, b, _)) in boundary.iter().enumerate() {
            let id = base + offset;
            let across_bp = start_of
                .iter()
                .find(|&&(start, _)| start == b)
                .expect("cavity boundary is a closed loop")
                .1;
            let across_pa = end_of
                .iter()
                .find(|&&(end, _)| end == a)
                .expect("cavity boundary is a closed loop")
                .1;
            self.tris[id].n[1] = across_bp;
            self.tris[id].n[2] = across_pa;
        }
        self.hint = u32::try_from(base).expect("triangle id fits u32");
    }

    fn locate(&self, p: &Point3<C>) -> Located {
        let mut t = self.hint;
        if !self.tris[t as usize].alive {
            t = self.any_alive();
        }
        for _ in 0..self.tris.len() + 8 {
            if let Some(dup) = self.duplicate_of(t, p) {
                return dup;
            }
            match self.step(t, p) {
                Some(next) => t = next,
                None => return Located::Inside(t),
            }
        }
        // The walk cycled on a numeric knife edge; fall back to a
        // full scan.
        for (id, tri) in self.tris.iter().enumerate() {
            if !tri.alive {
                continue;
            }
            let id = u32::try_from(id).expect("triangle id fits u32");
            if let Some(dup) = self.duplicate_of(id, p) {
                return dup;
            }
            if self.step(id, p).is_none() {
                return Located::Inside(id);
            }
        }
        unreachable!("point {p:?} escaped the anchor triangle");
    }

    /// One step of the orientation walk: the neighbor across the
    /// first edge that has `p` strictly on its outside, or None when
    /// `t` contains `p`.
    fn step(&self, t: u32, p: &Point3<C>) -> Option<u32> {
        let tri = &self.tris[t as usize];
        for k in 0..3 {
            let a = &self.points[tri.v[k] as usize];
            let b = &self.points[tri.v[(k + 1) % 3] as usize];
            if orient(a, b, p) < -EPS {
                let nb = tri.n[k];
                if nb != INVALID {
                    return Some(nb);
                }
            }
        }
        None
    }

    fn duplicate_of(&self, t: u32, p: &Point3<C>) -> Option<Located> {
        for &v in &self.tris[t as usize].v {
            let q = &self.points[v as usize];
            let (dx, dy) = (q.x - p.x, q.y - p.y);
            if dx * dx + dy * dy < DUP_EPS_SQ {
                return Some(Located::Duplicate);
            }
        }
        None
    }

    fn any_alive(&self) -> u32 {
        for (id, tri) in self.tris.iter().enumerate().rev() {
            if tri.alive {
                return u32::try_from(id).expect("triangle id fits u32");
            }
        }
        unreachable!("triangulation always has a live triangle")
    }

    fn in_circle(&self, t: u32, p: &Point3<C>) -> bool {
        let v = self.tris[t as usize].v;
        let a = &self.points[v[0] as usize];
        let b = &self.points[v[1] as usize];
        let c = &self.points[v[2] as usize];

        let (ax, ay) = (a.x - p.x, a.y - p.y);
        let (bx, by) = (b.x - p.x, b.y - p.y);
        let (cx, cy) = (c.x - p.x, c.y - p.y);
        let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
            - (bx * bx + by * by) * (ax * cy - cx * ay)
            + (cx * cx + cy * cy) * (ax * by - bx * ay);
        det > EPS
    }

    fn finish(self) -> Triangulation {
        let mut triangles = Vec::new();
        for tri in &self.tris {
            if tri.alive && tri.v.iter().all(|&v| v >= 3) {
                triangles.push([tri.v[0] - 3, tri.v[1] - 3, tri.v[2] - 3]);
            }
        }
        Triangulation {
            points: self.points[3..].to_vec(),
            triangles,
        }
    }
}

enum Located {
    Inside(u32),
    Duplicate,
}

/// Twice the signed area of (a, b, p); positive when the triple winds
/// counterclockwise.
fn orient(a: &Point3<C>, b: &Point3<C>, p: &Point3<C>) -> C {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}
