use super::support::{flat, lat_waves, ripple, world};
use crate::{
    border::BorderPacket, builder::TileBuilder, grid::TileCoord, pyramid::PyramidBuilder,
    raster::RasterSource, Bounds, TilerError,
};
use approx::assert_relative_eq;
use itertools::Itertools;
use qmesh::{Tile, MAX_VERTEX_VALUE};
use std::{env, fs, process};

fn assert_well_formed(tile: &Tile) {
    let count = u32::try_from(tile.vertex_data.len()).unwrap();
    assert!(count >= 4, "tile lost its corners");
    assert_eq!(tile.index_data.indices.len() % 3, 0);
    for t in tile.index_data.indices.chunks_exact(3) {
        assert!(t.iter().all(|&i| i < count), "index out of range");
        assert!(
            t[0] != t[1] && t[1] != t[2] && t[0] != t[2],
            "degenerate triangle {t:?}"
        );
    }
    for (list, expect_u, expect_v) in [
        (&tile.edge_indices.west, Some(0), None),
        (&tile.edge_indices.east, Some(MAX_VERTEX_VALUE), None),
        (&tile.edge_indices.south, None, Some(0)),
        (&tile.edge_indices.north, None, Some(MAX_VERTEX_VALUE)),
    ] {
        assert!(!list.is_empty(), "an edge list is empty");
        for &i in list.iter() {
            assert!(i < count, "edge index out of range");
            if let Some(u) = expect_u {
                assert_eq!(tile.vertex_data.u[i as usize], u);
            }
            if let Some(v) = expect_v {
                assert_eq!(tile.vertex_data.v[i as usize], v);
            }
        }
    }
}

#[test]
fn test_single_tile_is_well_formed() {
    let raster = (world(), ripple());
    let builder = TileBuilder::new().with_tile_size(33);
    let mut west = BorderPacket::new();
    let mut south = BorderPacket::new();
    let tile = builder
        .create_tile(&raster, TileCoord::new(3, 5, 3), &mut west, &mut south)
        .unwrap();

    assert_well_formed(&tile);
    // The outgoing packets describe the eastern and northern borders.
    assert_eq!(west.len(), tile.edge_indices.east.len());
    assert_eq!(south.len(), tile.edge_indices.north.len());
    assert!(tile.header.min_height < tile.header.max_height);
    assert!(tile.header.bounding_sphere_radius > 0.0);
}

#[test]
fn test_tile_survives_serialization() {
    let raster = (world(), ripple());
    let builder = TileBuilder::new().with_tile_size(17);
    let mut west = BorderPacket::new();
    let mut south = BorderPacket::new();
    let tile = builder
        .create_tile(&raster, TileCoord::new(2, 1, 1), &mut west, &mut south)
        .unwrap();

    let bytes = tile.to_bytes().unwrap();
    assert_eq!(Tile::from_bytes(&bytes).unwrap(), tile);
}

#[test]
fn test_flat_adjacent_tiles_share_border_bytes() {
    let raster = (world(), flat(100.0));
    let builder = TileBuilder::new().with_tile_size(17);

    let mut west = BorderPacket::new();
    let mut south_a = BorderPacket::new();
    let a = builder
        .create_tile(&raster, TileCoord::new(2, 2, 1), &mut west, &mut south_a)
        .unwrap();
    let mut south_b = BorderPacket::new();
    let b = builder
        .create_tile(&raster, TileCoord::new(2, 3, 1), &mut west, &mut south_b)
        .unwrap();

    assert_eq!(a.header.min_height, 100.0);
    assert_eq!(a.header.max_height, 100.0);

    let a_east: Vec<u16> = a
        .edge_indices
        .east
        .iter()
        .map(|&i| a.vertex_data.v[i as usize])
        .sorted()
        .collect();
    let b_west: Vec<u16> = b
        .edge_indices
        .west
        .iter()
        .map(|&i| b.vertex_data.v[i as usize])
        .sorted()
        .collect();
    assert_eq!(a_east, b_west, "shared border rows disagree");

    // Flat tiles have a degenerate height range; every height
    // quantizes to zero on both sides.
    for &i in &a.edge_indices.east {
        assert_eq!(a.vertex_data.height[i as usize], 0);
    }
    for &i in &b.edge_indices.west {
        assert_eq!(b.vertex_data.height[i as usize], 0);
    }

    // A flat border simplifies down; far fewer vertices than the
    // full sample column.
    assert!(a.edge_indices.east.len() < 17);
}

#[test]
fn test_sloped_adjacent_tiles_share_border() {
    // Heights depend on latitude only, so both tiles in a row share
    // their height range and quantize identically.
    let raster = (world(), lat_waves());
    let builder = TileBuilder::new().with_tile_size(17);

    let mut west = BorderPacket::new();
    let mut south_a = BorderPacket::new();
    let a = builder
        .create_tile(&raster, TileCoord::new(3, 4, 3), &mut west, &mut south_a)
        .unwrap();
    let mut south_b = BorderPacket::new();
    let b = builder
        .create_tile(&raster, TileCoord::new(3, 5, 3), &mut west, &mut south_b)
        .unwrap();

    assert_well_formed(&a);
    assert_well_formed(&b);
    assert_relative_eq!(
        f64::from(a.header.min_height),
        f64::from(b.header.min_height),
        epsilon = 1e-3
    );

    let border = |tile: &Tile, list: &[u32]| -> Vec<(u16, u16)> {
        list.iter()
            .map(|&i| {
                (
                    tile.vertex_data.v[i as usize],
                    tile.vertex_data.height[i as usize],
                )
            })
            .sorted()
            .collect()
    };
    let a_east = border(&a, &a.edge_indices.east);
    let b_west = border(&b, &b.edge_indices.west);
    assert_eq!(a_east.len(), b_west.len());
    for (&(va, ha), &(vb, hb)) in a_east.iter().zip(&b_west) {
        assert_eq!(va, vb, "border rows disagree");
        let delta = i32::from(ha) - i32::from(hb);
        assert!(delta.abs() <= 1, "border heights diverge by {delta}");
    }
}

#[test]
fn test_two_by_two_block_agrees_on_the_center_corner() {
    let raster = (world(), ripple());
    let builder = TileBuilder::new().with_tile_size(17);
    let side = 16.0;
    let (x0, y0) = (4, 3);

    let mut west = BorderPacket::new();
    let mut souths = [BorderPacket::new(), BorderPacket::new()];

    let a = builder
        .create_tile(&raster, TileCoord::new(3, x0, y0), &mut west, &mut souths[0])
        .unwrap();
    // The NE corner goes out both packets with one height.
    let ne_east = west
        .iter()
        .find(|p| (p.y - side).abs() < 1e-9)
        .expect("NE corner in the east packet")
        .z;
    let ne_north = souths[0]
        .iter()
        .find(|p| (p.x - side).abs() < 1e-9)
        .expect("NE corner in the north packet")
        .z;
    assert_eq!(ne_east, ne_north);

    let b = builder
        .create_tile(&raster, TileCoord::new(3, x0 + 1, y0), &mut west, &mut souths[1])
        .unwrap();
    // B sees the shared corner as NW and forwards it south-side to
    // its northern neighbor.
    let b_forward = souths[1]
        .iter()
        .find(|p| p.x.abs() < 1e-9 && p.y.abs() < 1e-9)
        .expect("shared corner in B's north packet")
        .z;
    assert_relative_eq!(b_forward, ne_east, epsilon = 1e-9);

    // New row: the leftmost tile has no western neighbor.
    west.clear();
    let c = builder
        .create_tile(&raster, TileCoord::new(3, x0, y0 + 1), &mut west, &mut souths[0])
        .unwrap();
    let c_forward = west
        .iter()
        .find(|p| p.x.abs() < 1e-9 && p.y.abs() < 1e-9)
        .expect("shared corner in C's east packet")
        .z;
    assert_relative_eq!(c_forward, ne_east, epsilon = 1e-9);

    // D inherits the corner twice, once per packet, and still builds
    // a clean tile.
    let d = builder
        .create_tile(&raster, TileCoord::new(3, x0 + 1, y0 + 1), &mut west, &mut souths[1])
        .unwrap();
    for tile in [&a, &b, &c, &d] {
        assert_well_formed(tile);
    }
}

struct ShortRead;

impl RasterSource for ShortRead {
    fn bounds(&self) -> Result<Bounds, TilerError> {
        Ok(world())
    }

    fn read_window(
        &self,
        _bounds: &Bounds,
        width: usize,
        height: usize,
    ) -> Result<Vec<f32>, TilerError> {
        // Short read: half the window went missing.
        Ok(vec![0.0; width * height / 2])
    }
}

#[test]
fn test_short_raster_read_surfaces_as_error() {
    let builder = TileBuilder::new().with_tile_size(17);
    let mut west = BorderPacket::new();
    let mut south = BorderPacket::new();
    let result = builder.create_tile(&ShortRead, TileCoord::new(1, 1, 0), &mut west, &mut south);
    match result {
        Err(TilerError::Raster(_)) => {}
        other => panic!("expected a raster error, got {other:?}"),
    }
}

#[test]
fn test_pyramid_writes_the_expected_tree() {
    let raster = (
        super::support::bounds(-10.0, -10.0, 10.0, 10.0),
        ripple(),
    );
    let out = env::temp_dir().join(format!("tintile-pyramid-{}", process::id()));
    let _ = fs::remove_dir_all(&out);

    let stats = PyramidBuilder::new(raster)
        .with_builder(TileBuilder::new().with_tile_size(17))
        .build(2, 2, &out)
        .unwrap();

    // 20 degree square bounds straddle a 2 x 2 block at zoom 2.
    assert_eq!(stats.built, 4);
    assert_eq!(stats.skipped, 0);
    for (x, y) in [(3, 1), (4, 1), (3, 2), (4, 2)] {
        let path = out.join("2").join(x.to_string()).join(format!("{y}.terrain"));
        assert!(path.is_file(), "missing tile file {path:?}");
        let tile = Tile::from_bytes(&fs::read(&path).unwrap()).unwrap();
        assert_well_formed(&tile);
    }

    let _ = fs::remove_dir_all(&out);
}
