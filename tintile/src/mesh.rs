//! Halfedge surface mesh over an index arena.
//!
//! Connectivity is stored as plain integer indices into flat vectors;
//! boundary halfedges carry no face and are linked into a ring around
//! the mesh border, so border traversal is an index walk. Collapses
//! mark elements dead in place; `compact` squeezes the survivors out.

use crate::{delaunay::Triangulation, C};
use nalgebra::Point3;
use std::collections::HashMap;

pub(crate) const INVALID: u32 = u32::MAX;

#[derive(Clone, Copy, Debug)]
struct Halfedge {
    origin: u32,
    twin: u32,
    next: u32,
    prev: u32,
    /// INVALID for boundary halfedges.
    face: u32,
}

/// Mesh squeezed down to live elements only.
pub(crate) struct CompactSurface {
    pub positions: Vec<Point3<C>>,
    pub triangles: Vec<[u32; 3]>,
    /// Border vertices in ring order (one full loop, no repeats).
    pub border_ring: Vec<u32>,
}

pub(crate) struct SurfaceMesh {
    points: Vec<Point3<C>>,
    v_out: Vec<u32>,
    v_alive: Vec<bool>,
    v_border: Vec<bool>,
    hes: Vec<Halfedge>,
    he_alive: Vec<bool>,
    f_he: Vec<u32>,
    f_alive: Vec<bool>,
    live_edges: usize,
    live_faces: usize,
    live_vertices: usize,
}

impl SurfaceMesh {
    /// Builds the halfedge structure from a triangulation. Triangles
    /// must be counterclockwise and form a manifold disk.
    pub fn from_triangulation(tri: &Triangulation) -> SurfaceMesh {
        let vertex_count = tri.points.len();
        let face_count = tri.triangles.len();

        let mut hes = Vec::with_capacity(face_count * 3 + vertex_count);
        let mut f_he = Vec::with_capacity(face_count);
        let mut directed = HashMap::with_capacity(face_count * 3);

        for (f, t) in tri.triangles.iter().enumerate() {
            let base = u32::try_from(hes.len()).expect("halfedge id fits u32");
            for k in 0..3u32 {
                hes.push(Halfedge {
                    origin: t[k as usize],
                    twin: INVALID,
                    next: base + (k + 1) % 3,
                    prev: base + (k + 2) % 3,
                    face: u32::try_from(f).expect("face id fits u32"),
                });
                directed.insert((t[k as usize], t[(k as usize + 1) % 3]), base + k);
            }
            f_he.push(base);
        }

        // Twin interior halfedges; collect the unmatched rim.
        let mut rim = Vec::new();
        for h in 0..hes.len() {
            if hes[h].twin != INVALID {
                continue;
            }
            let a = hes[h].origin;
            let b = hes[hes[h].next as usize].origin;
            match directed.get(&(b, a)) {
                Some(&t) => {
                    let h32 = u32::try_from(h).expect("halfedge id fits u32");
                    hes[h].twin = t;
                    hes[t as usize].twin = h32;
                }
                None => rim.push(h),
            }
        }

        // One boundary halfedge per rim edge, linked into a ring.
        let mut boundary_at = HashMap::with_capacity(rim.len());
        for &h in &rim {
            let b = hes[hes[h].next as usize].origin;
            let g = u32::try_from(hes.len()).expect("halfedge id fits u32");
            hes.push(Halfedge {
                origin: b,
                twin: u32::try_from(h).expect("halfedge id fits u32"),
                next: INVALID,
                prev: INVALID,
                face: INVALID,
            });
            hes[h].twin = g;
            boundary_at.insert(b, g);
        }
        let boundary_ids: Vec<u32> = boundary_at.values().copied().collect();
        for &g in &boundary_ids {
            // target of g is the origin of its interior twin
            let target = hes[hes[g as usize].twin as usize].origin;
            let next = boundary_at[&target];
            hes[g as usize].next = next;
            hes[next as usize].prev = g;
        }

        let mut v_out = vec![INVALID; vertex_count];
        let mut v_border = vec![false; vertex_count];
        for (h, he) in hes.iter().enumerate() {
            let origin = he.origin as usize;
            if he.face == INVALID {
                v_border[origin] = true;
            }
            if v_out[origin] == INVALID {
                v_out[origin] = u32::try_from(h).expect("halfedge id fits u32");
            }
        }

        debug_assert_eq!(hes.len() % 2, 0);
        let live_edges = hes.len() / 2;

        SurfaceMesh {
            points: tri.points.clone(),
            v_alive: vec![true; vertex_count],
            v_border,
            v_out,
            he_alive: vec![true; hes.len()],
            hes,
            f_alive: vec![true; f_he.len()],
            f_he,
            live_edges,
            live_faces: face_count,
            live_vertices: vertex_count,
        }
    }

    pub fn position(&self, v: u32) -> Point3<C> {
        self.points[v as usize]
    }

    pub fn is_border_vertex(&self, v: u32) -> bool {
        self.v_border[v as usize]
    }

    pub fn vertex_alive(&self, v: u32) -> bool {
        self.v_alive[v as usize]
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    pub fn live_edges(&self) -> usize {
        self.live_edges
    }

    pub fn live_faces(&self) -> usize {
        self.live_faces
    }

    pub fn live_vertices(&self) -> usize {
        self.live_vertices
    }

    pub fn origin(&self, h: u32) -> u32 {
        self.hes[h as usize].origin
    }

    pub fn target(&self, h: u32) -> u32 {
        self.hes[self.hes[h as usize].twin as usize].origin
    }

    pub fn twin(&self, h: u32) -> u32 {
        self.hes[h as usize].twin
    }

    pub fn is_boundary_halfedge(&self, h: u32) -> bool {
        self.hes[h as usize].face == INVALID
    }

    /// True when the edge of `h` lies on the mesh border.
    pub fn is_border_edge(&self, h: u32) -> bool {
        self.is_boundary_halfedge(h) || self.is_boundary_halfedge(self.twin(h))
    }

    /// Outgoing halfedges of `v`.
    pub fn outgoing(&self, v: u32) -> Vec<u32> {
        let mut out = Vec::with_capacity(8);
        let start = self.v_out[v as usize];
        let mut h = start;
        loop {
            debug_assert_eq!(self.origin(h), v);
            out.push(h);
            h = self.hes[self.twin(h) as usize].next;
            if h == start {
                break;
            }
        }
        out
    }

    /// Neighboring vertices of `v`.
    pub fn neighbors(&self, v: u32) -> Vec<u32> {
        self.outgoing(v).iter().map(|&h| self.target(h)).collect()
    }

    /// The halfedge from `a` to `b`, if the edge exists.
    pub fn find_halfedge(&self, a: u32, b: u32) -> Option<u32> {
        if !self.v_alive[a as usize] || !self.v_alive[b as usize] {
            return None;
        }
        self.outgoing(a).into_iter().find(|&h| self.target(h) == b)
    }

    /// Vertices of the face of `h`, counterclockwise from its origin.
    pub fn face_vertices(&self, h: u32) -> [u32; 3] {
        let n = self.hes[h as usize].next;
        let nn = self.hes[n as usize].next;
        [
            self.origin(h),
            self.hes[n as usize].origin,
            self.hes[nn as usize].origin,
        ]
    }

    /// One halfedge of every face incident to `v`.
    pub fn faces_around(&self, v: u32) -> Vec<u32> {
        self.outgoing(v)
            .into_iter()
            .filter(|&h| !self.is_boundary_halfedge(h))
            .collect()
    }

    /// One halfedge of every live face.
    pub fn face_handles(&self) -> Vec<u32> {
        self.f_he
            .iter()
            .zip(&self.f_alive)
            .filter_map(|(&h, &alive)| alive.then_some(h))
            .collect()
    }

    /// Whether contracting the edge of `h` keeps the surface a
    /// manifold disk: the common neighbors of its endpoints must be
    /// exactly the apexes of its incident faces, an interior edge may
    /// not join two border vertices (that would pinch the disk), and
    /// neither incident face may lean on the border with both of its
    /// other edges.
    pub fn can_collapse(&self, h: u32) -> bool {
        let t = self.twin(h);
        let a = self.origin(h);
        let b = self.origin(t);

        if !self.is_border_edge(h) && self.v_border[a as usize] && self.v_border[b as usize] {
            return false;
        }

        let mut apexes = Vec::with_capacity(2);
        for side in [h, t] {
            if !self.is_boundary_halfedge(side) {
                let prev = self.hes[side as usize].prev;
                apexes.push(self.hes[prev as usize].origin);

                let other1 = self.twin(self.hes[side as usize].next);
                let other2 = self.twin(prev);
                if self.is_boundary_halfedge(other1) && self.is_boundary_halfedge(other2) {
                    return false;
                }
            }
        }

        let a_neighbors = self.neighbors(a);
        for n in self.neighbors(b) {
            if n != a && a_neighbors.contains(&n) && !apexes.contains(&n) {
                return false;
            }
        }
        true
    }

    /// Contracts the edge of `h`. The origin of `h` survives and
    /// moves to `position`; the target disappears. Returns the
    /// surviving vertex. `can_collapse` must have held.
    pub fn collapse(&mut self, h: u32, position: Point3<C>) -> u32 {
        let t = self.twin(h);
        let survivor = self.origin(h);
        let victim = self.origin(t);
        debug_assert!(self.can_collapse(h));
        debug_assert!(!(self.is_boundary_halfedge(h) && self.is_boundary_halfedge(t)));

        // Re-anchor every outgoing halfedge of the disappearing
        // vertex while the orbit is still walkable.
        for out in self.outgoing(victim) {
            self.hes[out as usize].origin = survivor;
        }

        let mut dead_hes = vec![h, t];
        let mut removed_edges = 1;
        let mut removed_faces = 0;
        let mut survivor_out = INVALID;

        for side in [h, t] {
            if self.is_boundary_halfedge(side) {
                // Drop the boundary halfedge out of the border ring.
                let ring_prev = self.hes[side as usize].prev;
                let ring_next = self.hes[side as usize].next;
                self.hes[ring_prev as usize].next = ring_next;
                self.hes[ring_next as usize].prev = ring_prev;
                survivor_out = ring_next;
                continue;
            }
            // The face of this side dies; its two remaining edges
            // merge into one.
            let hn = self.hes[side as usize].next;
            let hp = self.hes[side as usize].prev;
            let hn_t = self.twin(hn);
            let hp_t = self.twin(hp);
            let apex = self.hes[hp as usize].origin;
            let face = self.hes[side as usize].face;

            self.hes[hn_t as usize].twin = hp_t;
            self.hes[hp_t as usize].twin = hn_t;

            self.v_out[apex as usize] = hn_t;
            if survivor_out == INVALID {
                // hp_t runs from this side's origin toward the apex;
                // after re-anchoring, its origin is the survivor.
                survivor_out = hp_t;
            }

            dead_hes.extend([hn, hp]);
            self.f_alive[face as usize] = false;
            removed_edges += 1;
            removed_faces += 1;
        }

        debug_assert_ne!(survivor_out, INVALID);
        self.v_out[survivor as usize] = survivor_out;

        for he in dead_hes {
            self.he_alive[he as usize] = false;
        }
        self.v_alive[victim as usize] = false;
        self.v_border[survivor as usize] |= self.v_border[victim as usize];
        self.live_edges -= removed_edges;
        self.live_faces -= removed_faces;
        self.live_vertices -= 1;
        self.points[survivor as usize] = position;
        survivor
    }

    /// Squeezes out dead elements, returning positions, triangles and
    /// the border ring with fresh contiguous vertex ids.
    pub fn compact(&self) -> CompactSurface {
        let mut vertex_map = vec![INVALID; self.points.len()];
        let mut positions = Vec::with_capacity(self.live_vertices);
        for (v, alive) in self.v_alive.iter().enumerate() {
            if *alive {
                vertex_map[v] = u32::try_from(positions.len()).expect("vertex id fits u32");
                positions.push(self.points[v]);
            }
        }

        let mut triangles = Vec::with_capacity(self.live_faces);
        for (f, alive) in self.f_alive.iter().enumerate() {
            if !alive {
                continue;
            }
            let [a, b, c] = self.face_vertices(self.f_he[f]);
            triangles.push([
                vertex_map[a as usize],
                vertex_map[b as usize],
                vertex_map[c as usize],
            ]);
        }

        let mut border_ring = Vec::new();
        if let Some(start) =
            (0..self.hes.len()).find(|&g| self.he_alive[g] && self.hes[g].face == INVALID)
        {
            let start = u32::try_from(start).expect("halfedge id fits u32");
            let mut g = start;
            loop {
                border_ring.push(vertex_map[self.origin(g) as usize]);
                g = self.hes[g as usize].next;
                if g == start {
                    break;
                }
            }
        }

        CompactSurface {
            positions,
            triangles,
            border_ring,
        }
    }
}
