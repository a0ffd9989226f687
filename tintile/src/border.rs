//! Border vertex bookkeeping: classification of the simplified mesh's
//! border into the four edge-index lists, and the vertex packets that
//! carry committed borders to the next tile over.

use crate::C;
use nalgebra::Point3;
use qmesh::{remap, EdgeIndices};

/// Border vertices a finished tile hands to a not-yet-built neighbor,
/// already expressed in the receiving tile's local coordinates (an
/// eastern border arrives with `x = 0`, a northern border with
/// `y = 0`) with heights in meters.
#[derive(Clone, Debug, Default)]
pub struct BorderPacket {
    points: Vec<Point3<C>>,
}

impl BorderPacket {
    /// An empty packet; the receiving border is unconstrained.
    pub fn new() -> BorderPacket {
        BorderPacket::default()
    }

    /// True when no vertices are carried.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of carried vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Iterates the carried vertices.
    pub fn iter(&self) -> impl Iterator<Item = &Point3<C>> + '_ {
        self.points.iter()
    }

    /// Drops all carried vertices.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub(crate) fn push(&mut self, point: Point3<C>) {
        self.points.push(point);
    }
}

/// Output of the border walk.
pub(crate) struct ClassifiedBorders {
    pub edges: EdgeIndices,
    /// West border of the eastern neighbor.
    pub east_packet: BorderPacket,
    /// South border of the northern neighbor.
    pub north_packet: BorderPacket,
    /// Corners found by the walk; a well-formed tile has four.
    pub corner_count: usize,
}

/// Walks the mesh border ring once, labeling every vertex west,
/// south, east or north and duplicating corners into both incident
/// lists.
///
/// A vertex is a corner when the dominant axis of its incoming border
/// edge differs from that of its outgoing one. Non-corner vertices
/// classify by the dominant axis of the incoming edge (vertical edge:
/// west below `u = 0.5`, east above; horizontal: south below
/// `v = 0.5`, north above).
///
/// Eastern and northern vertices are simultaneously re-expressed in
/// the neighboring tile's coordinate system (side swapped, height
/// de-normalized to meters, since the neighbor normalizes against its
/// own height range) and collected into the outgoing packets.
pub(crate) fn classify_borders(
    ring: &[u32],
    positions: &[Point3<C>],
    vertex_remap: &[u32],
    tile_size: usize,
    min_height: C,
    max_height: C,
) -> ClassifiedBorders {
    #[allow(clippy::cast_precision_loss)]
    let side = (tile_size - 1) as C;
    let mut edges = EdgeIndices::default();
    let mut east_packet = BorderPacket::new();
    let mut north_packet = BorderPacket::new();
    let mut corner_count = 0;

    let n = ring.len();
    for k in 0..n {
        let v = ring[k] as usize;
        let prev = ring[(k + n - 1) % n] as usize;
        let next = ring[(k + 1) % n] as usize;

        let p = positions[v];
        let index = vertex_remap[v];
        let meters = remap(p.z, 0.0, 1.0, min_height, max_height);

        let dx_in = (p.x - positions[prev].x).abs();
        let dy_in = (p.y - positions[prev].y).abs();
        let dx_out = (positions[next].x - p.x).abs();
        let dy_out = (positions[next].y - p.y).abs();

        let is_corner =
            (dx_in < dy_in && dx_out > dy_out) || (dx_in > dy_in && dx_out < dy_out);

        if is_corner {
            corner_count += 1;
            if p.x < 0.5 && p.y < 0.5 {
                // SW
                edges.west.push(index);
                edges.south.push(index);
            } else if p.x < 0.5 && p.y > 0.5 {
                // NW; becomes the SW end of the northern neighbor's
                // inherited south border.
                edges.west.push(index);
                edges.north.push(index);
                north_packet.push(Point3::new(0.0, 0.0, meters));
            } else if p.x > 0.5 && p.y > 0.5 {
                // NE; feeds both neighbors.
                edges.north.push(index);
                edges.east.push(index);
                east_packet.push(Point3::new(0.0, side, meters));
                north_packet.push(Point3::new(side, 0.0, meters));
            } else {
                // SE
                edges.east.push(index);
                edges.south.push(index);
                east_packet.push(Point3::new(0.0, 0.0, meters));
            }
        } else if dx_in < dy_in {
            // Vertical border edge: west or east.
            if p.x < 0.5 {
                edges.west.push(index);
            } else {
                edges.east.push(index);
                east_packet.push(Point3::new(0.0, remap(p.y, 0.0, 1.0, 0.0, side), meters));
            }
        } else {
            // Horizontal border edge: south or north.
            if p.y < 0.5 {
                edges.south.push(index);
            } else {
                edges.north.push(index);
                north_packet.push(Point3::new(remap(p.x, 0.0, 1.0, 0.0, side), 0.0, meters));
            }
        }
    }

    ClassifiedBorders {
        edges,
        east_packet,
        north_packet,
        corner_count,
    }
}
