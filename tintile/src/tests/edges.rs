use super::support::grid_points;
use crate::{border::classify_borders, delaunay, mesh::SurfaceMesh, quantize, C};
use approx::assert_relative_eq;
use nalgebra::Point3;
use qmesh::remap;
use std::collections::HashSet;

fn grid_surface(n: usize) -> crate::mesh::CompactSurface {
    SurfaceMesh::from_triangulation(&delaunay::triangulate(&grid_points(n))).compact()
}

fn identity_remap(count: usize) -> Vec<u32> {
    (0..u32::try_from(count).unwrap()).collect()
}

fn one_common(a: &[u32], b: &[u32]) -> u32 {
    let sa: HashSet<u32> = a.iter().copied().collect();
    let common: Vec<u32> = b.iter().copied().filter(|i| sa.contains(i)).collect();
    assert_eq!(common.len(), 1, "expected exactly one shared corner");
    common[0]
}

#[test]
fn test_full_grid_classification() {
    let n = 9;
    let surface = grid_surface(n);
    let remap_table = identity_remap(surface.positions.len());
    let (min_h, max_h) = (100.0, 300.0);
    let borders = classify_borders(
        &surface.border_ring,
        &surface.positions,
        &remap_table,
        n,
        min_h,
        max_h,
    );

    assert_eq!(borders.corner_count, 4);
    // Each side carries its n vertices, corners included.
    assert_eq!(borders.edges.west.len(), n);
    assert_eq!(borders.edges.south.len(), n);
    assert_eq!(borders.edges.east.len(), n);
    assert_eq!(borders.edges.north.len(), n);

    // Adjacent lists share exactly the corner; opposite lists share
    // nothing.
    one_common(&borders.edges.west, &borders.edges.south);
    one_common(&borders.edges.west, &borders.edges.north);
    one_common(&borders.edges.east, &borders.edges.south);
    one_common(&borders.edges.east, &borders.edges.north);
    let west: HashSet<u32> = borders.edges.west.iter().copied().collect();
    assert!(borders.edges.east.iter().all(|i| !west.contains(i)));
    let south: HashSet<u32> = borders.edges.south.iter().copied().collect();
    assert!(borders.edges.north.iter().all(|i| !south.contains(i)));

    // The union of the four lists is exactly the border ring.
    let mut union: HashSet<u32> = HashSet::new();
    for list in [
        &borders.edges.west,
        &borders.edges.south,
        &borders.edges.east,
        &borders.edges.north,
    ] {
        union.extend(list.iter().copied());
    }
    let ring: HashSet<u32> = surface.border_ring.iter().copied().collect();
    assert_eq!(union, ring);
}

#[test]
fn test_packet_emission_swaps_sides() {
    let n = 9;
    let surface = grid_surface(n);
    let remap_table = identity_remap(surface.positions.len());
    let (min_h, max_h) = (100.0, 300.0);
    let borders = classify_borders(
        &surface.border_ring,
        &surface.positions,
        &remap_table,
        n,
        min_h,
        max_h,
    );

    // Every eastern vertex (corners included) flips to x = 0 for the
    // neighbor, keeping its row in raster scale and its height in
    // meters.
    assert_eq!(borders.east_packet.len(), n);
    #[allow(clippy::cast_precision_loss)]
    let side = (n - 1) as C;
    let mut rows: Vec<C> = Vec::new();
    for p in borders.east_packet.iter() {
        assert_relative_eq!(p.x, 0.0);
        rows.push(p.y);
        // Find the source vertex on the east border with this row.
        let source = surface
            .positions
            .iter()
            .find(|q| (1.0 - q.x).abs() < 1e-9 && (q.y * side - p.y).abs() < 1e-9)
            .expect("packet row matches an eastern vertex");
        assert_relative_eq!(p.z, remap(source.z, 0.0, 1.0, min_h, max_h), epsilon = 1e-9);
    }
    rows.sort_by(C::total_cmp);
    for (i, row) in rows.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let expected = i as C;
        assert_relative_eq!(*row, expected);
    }

    // Same story northward: y flips to 0.
    assert_eq!(borders.north_packet.len(), n);
    for p in borders.north_packet.iter() {
        assert_relative_eq!(p.y, 0.0);
        assert!(p.x >= 0.0 && p.x <= side);
    }
}

#[test]
fn test_cache_optimization_preserves_triangles() {
    let surface = grid_surface(7);
    let optimized = quantize::optimize(&surface.positions, &surface.triangles);

    // Invert the remap and compare triangle sets.
    let mut inverse = vec![0u32; optimized.remap.len()];
    for (old, &slot) in optimized.remap.iter().enumerate() {
        inverse[slot as usize] = u32::try_from(old).unwrap();
    }
    let canonical = |t: [u32; 3]| -> [u32; 3] {
        let rot = (0..3)
            .min_by_key(|&r| t[r])
            .expect("three corners");
        [t[rot], t[(rot + 1) % 3], t[(rot + 2) % 3]]
    };
    let mut original: Vec<[u32; 3]> = surface.triangles.iter().map(|&t| canonical(t)).collect();
    let mut roundtrip: Vec<[u32; 3]> = optimized
        .indices
        .chunks_exact(3)
        .map(|t| {
            canonical([
                inverse[t[0] as usize],
                inverse[t[1] as usize],
                inverse[t[2] as usize],
            ])
        })
        .collect();
    original.sort_unstable();
    roundtrip.sort_unstable();
    assert_eq!(original, roundtrip);
}

#[test]
fn test_fetch_remap_is_a_monotone_permutation() {
    let surface = grid_surface(7);
    let optimized = quantize::optimize(&surface.positions, &surface.triangles);

    let mut slots: Vec<u32> = optimized.remap.clone();
    slots.sort_unstable();
    let expected: Vec<u32> = (0..u32::try_from(optimized.remap.len()).unwrap()).collect();
    assert_eq!(slots, expected, "remap is not a permutation");

    // First use of every slot arrives in order: exactly the property
    // high-watermark coding needs.
    let mut watermark = 0u32;
    for &index in &optimized.indices {
        assert!(index <= watermark, "index {index} skipped watermark {watermark}");
        if index == watermark {
            watermark += 1;
        }
    }
    assert_eq!(watermark as usize, optimized.remap.len());
}

#[test]
fn test_clamp_counts_out_of_range_vertices() {
    let mut positions = vec![
        Point3::new(0.5, 0.5, 0.5),
        Point3::new(1.0 + 1e-7, 0.2, 0.3),
        Point3::new(0.1, -1e-9, 1.2),
    ];
    let clamped = quantize::clamp_unit(&mut positions);
    assert_eq!(clamped, 2);
    for p in &positions {
        assert!((0.0..=1.0).contains(&p.x));
        assert!((0.0..=1.0).contains(&p.y));
        assert!((0.0..=1.0).contains(&p.z));
    }
}
