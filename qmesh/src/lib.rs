#![deny(missing_docs)]
#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub use crate::{
    codec::{dequantize, quantize, remap, zigzag_decode, zigzag_encode},
    error::QmeshError,
    tile::{EdgeIndices, Header, IndexData, Tile, VertexData},
};

mod codec;
mod error;
mod tile;

/// Largest value a quantized vertex coordinate can take.
///
/// Quantized-mesh stores u, v and height as integers in
/// `[0, MAX_VERTEX_VALUE]`, scaled from the tile-relative `[0, 1]`
/// range.
pub const MAX_VERTEX_VALUE: u16 = 32767;

/// Vertex count above which triangle and edge indices are stored as
/// 32-bit integers on the wire instead of 16-bit ones.
pub const LONG_INDEX_THRESHOLD: usize = 65536;
