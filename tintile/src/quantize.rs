//! Vertex quantization and index-order optimization.
//!
//! The quantized-mesh index stream is high-watermark coded, which
//! only stays compact when triangle indices are cache-coherent and
//! vertices are stored in first-use order. So the optimization passes
//! here are part of the format contract, not a performance nicety:
//! Forsyth's greedy vertex-cache ordering over a simulated FIFO cache
//! of 32 entries, followed by a vertex-fetch remap.

use crate::C;
use log::warn;
use nalgebra::Point3;
use qmesh::{quantize, VertexData};

const CACHE_SIZE: usize = 32;
const CACHE_DECAY_POWER: C = 1.5;
const LAST_TRI_SCORE: C = 0.75;
const VALENCE_BOOST_SCALE: C = 2.0;
const VALENCE_BOOST_POWER: C = 0.5;

const UNMAPPED: u32 = u32::MAX;

/// Quantized, reordered mesh ready for the wire.
pub(crate) struct OptimizedMesh {
    pub vertex_data: VertexData,
    /// Triangle indices in cache-optimized order, rewritten to the
    /// fetch-optimized vertex slots.
    pub indices: Vec<u32>,
    /// `remap[old_vertex] -> wire slot`, for everyone still holding
    /// pre-remap vertex ids.
    pub remap: Vec<u32>,
}

/// Clamps simplification drift back into the unit cube, returning how
/// many vertices needed it.
pub(crate) fn clamp_unit(positions: &mut [Point3<C>]) -> usize {
    let mut clamped = 0;
    for p in positions.iter_mut() {
        let inside = Point3::new(
            p.x.clamp(0.0, 1.0),
            p.y.clamp(0.0, 1.0),
            p.z.clamp(0.0, 1.0),
        );
        if inside != *p {
            clamped += 1;
            *p = inside;
        }
    }
    if clamped > 0 {
        warn!("{clamped} vertices drifted outside the unit cube and were clamped");
    }
    clamped
}

/// Quantizes `positions` and produces the optimized index stream and
/// vertex remap.
pub(crate) fn optimize(positions: &[Point3<C>], triangles: &[[u32; 3]]) -> OptimizedMesh {
    let mut indices = Vec::with_capacity(triangles.len() * 3);
    for t in triangles {
        indices.extend_from_slice(t);
    }
    let indices = optimize_vertex_cache(&indices, positions.len());
    let (indices, remap) = optimize_vertex_fetch(indices, positions.len());

    let mut vertex_data = VertexData {
        u: vec![0; positions.len()],
        v: vec![0; positions.len()],
        height: vec![0; positions.len()],
    };
    for (old, p) in positions.iter().enumerate() {
        let slot = remap[old] as usize;
        vertex_data.u[slot] = quantize(p.x);
        vertex_data.v[slot] = quantize(p.y);
        vertex_data.height[slot] = quantize(p.z);
    }

    OptimizedMesh {
        vertex_data,
        indices,
        remap,
    }
}

/// Forsyth's linear-speed vertex cache optimization: greedily emits
/// the triangle whose vertices score highest, where recently used
/// vertices and nearly exhausted vertices score high.
fn optimize_vertex_cache(indices: &[u32], vertex_count: usize) -> Vec<u32> {
    let triangle_count = indices.len() / 3;
    if triangle_count == 0 {
        return Vec::new();
    }

    // Per-vertex triangle adjacency.
    let mut uses = vec![0u32; vertex_count];
    for &i in indices {
        uses[i as usize] += 1;
    }
    let mut offsets = vec![0usize; vertex_count + 1];
    for v in 0..vertex_count {
        offsets[v + 1] = offsets[v] + uses[v] as usize;
    }
    let mut adjacency = vec![0u32; indices.len()];
    let mut fill = offsets.clone();
    for (t, tri) in indices.chunks_exact(3).enumerate() {
        for &v in tri {
            adjacency[fill[v as usize]] = u32::try_from(t).expect("triangle id fits u32");
            fill[v as usize] += 1;
        }
    }

    let mut active = uses;
    let mut cache_pos = vec![-1i32; vertex_count];
    let mut vertex_score: Vec<C> = (0..vertex_count)
        .map(|v| score_vertex(cache_pos[v], active[v]))
        .collect();
    let mut tri_score: Vec<C> = indices
        .chunks_exact(3)
        .map(|t| t.iter().map(|&v| vertex_score[v as usize]).sum())
        .collect();
    let mut emitted = vec![false; triangle_count];

    let mut cache: Vec<u32> = Vec::with_capacity(CACHE_SIZE + 3);
    let mut output = Vec::with_capacity(indices.len());
    let mut cursor = 0;

    for _ in 0..triangle_count {
        // Prefer a triangle touching the cache; fall back to the best
        // remaining one anywhere.
        let mut best = None;
        let mut best_score = C::NEG_INFINITY;
        for &v in &cache {
            for &t in &adjacency[offsets[v as usize]..offsets[v as usize + 1]] {
                if !emitted[t as usize] && tri_score[t as usize] > best_score {
                    best_score = tri_score[t as usize];
                    best = Some(t);
                }
            }
        }
        let tri = best.unwrap_or_else(|| {
            while emitted[cursor] {
                cursor += 1;
            }
            let mut fallback = cursor;
            for t in cursor..triangle_count {
                if !emitted[t] && tri_score[t] > tri_score[fallback] {
                    fallback = t;
                }
            }
            u32::try_from(fallback).expect("triangle id fits u32")
        });

        emitted[tri as usize] = true;
        let corners = [
            indices[tri as usize * 3],
            indices[tri as usize * 3 + 1],
            indices[tri as usize * 3 + 2],
        ];
        output.extend_from_slice(&corners);

        // Move the emitted triangle's vertices to the cache front.
        for &v in corners.iter().rev() {
            cache.retain(|&c| c != v);
            cache.insert(0, v);
            active[v as usize] -= 1;
        }
        let evicted: Vec<u32> = if cache.len() > CACHE_SIZE {
            cache.split_off(CACHE_SIZE)
        } else {
            Vec::new()
        };

        // Rescore everything whose cache position shifted.
        for (pos, &v) in cache.iter().enumerate() {
            cache_pos[v as usize] = i32::try_from(pos).expect("cache position fits i32");
        }
        for &v in &evicted {
            cache_pos[v as usize] = -1;
        }
        for &v in cache.iter().chain(&evicted) {
            let new_score = score_vertex(cache_pos[v as usize], active[v as usize]);
            let delta = new_score - vertex_score[v as usize];
            vertex_score[v as usize] = new_score;
            for &t in &adjacency[offsets[v as usize]..offsets[v as usize + 1]] {
                if !emitted[t as usize] {
                    tri_score[t as usize] += delta;
                }
            }
        }
    }

    output
}

#[allow(clippy::cast_precision_loss)]
fn score_vertex(cache_pos: i32, active_triangles: u32) -> C {
    if active_triangles == 0 {
        return -1.0;
    }
    let mut score = match cache_pos {
        p if p < 0 => 0.0,
        p if p < 3 => LAST_TRI_SCORE,
        p => {
            let scaled = 1.0 - (p - 3) as C / (CACHE_SIZE - 3) as C;
            scaled.max(0.0).powf(CACHE_DECAY_POWER)
        }
    };
    score += VALENCE_BOOST_SCALE * (active_triangles as C).powf(-VALENCE_BOOST_POWER);
    score
}

/// Renumbers vertices in first-use order of the index stream so
/// index-order reads sweep the vertex buffer monotonically.
fn optimize_vertex_fetch(mut indices: Vec<u32>, vertex_count: usize) -> (Vec<u32>, Vec<u32>) {
    let mut remap = vec![UNMAPPED; vertex_count];
    let mut next = 0u32;
    for index in &mut indices {
        let slot = &mut remap[*index as usize];
        if *slot == UNMAPPED {
            *slot = next;
            next += 1;
        }
        *index = *slot;
    }
    // Vertices never referenced by a triangle keep stable slots at
    // the tail.
    for slot in remap.iter_mut().filter(|slot| **slot == UNMAPPED) {
        *slot = next;
        next += 1;
    }
    (indices, remap)
}
