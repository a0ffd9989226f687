//! Scalar codecs shared by the tile reader and writer.

use crate::{QmeshError, MAX_VERTEX_VALUE};

/// Linearly remaps `value` from `[from_lo, from_hi]` to
/// `[to_lo, to_hi]`.
///
/// A degenerate source range maps everything to `to_lo`; this is what
/// keeps flat tiles (`min_height == max_height`) well defined.
pub fn remap(value: f64, from_lo: f64, from_hi: f64, to_lo: f64, to_hi: f64) -> f64 {
    if from_hi <= from_lo {
        return to_lo;
    }
    to_lo + (to_hi - to_lo) * ((value - from_lo) / (from_hi - from_lo))
}

/// Quantizes a normalized coordinate in `[0, 1]` to a vertex-data
/// integer in `[0, MAX_VERTEX_VALUE]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize(coord: f64) -> u16 {
    (coord.clamp(0.0, 1.0) * f64::from(MAX_VERTEX_VALUE)).round() as u16
}

/// Expands a vertex-data integer back to a normalized coordinate.
pub fn dequantize(value: u16) -> f64 {
    f64::from(value) / f64::from(MAX_VERTEX_VALUE)
}

/// Encodes the step from `prev` to `cur` as a zig-zagged delta.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn zigzag_encode(prev: u16, cur: u16) -> u16 {
    let delta = i32::from(cur) - i32::from(prev);
    ((delta << 1) ^ (delta >> 31)) as u16
}

/// Applies a zig-zagged delta to `prev`, returning the decoded value.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn zigzag_decode(prev: u16, code: u16) -> u16 {
    let z = i32::from(code);
    let delta = (z >> 1) ^ -(z & 1);
    (i32::from(prev) + delta) as u16
}

/// High-watermark encodes a triangle index stream.
///
/// Each code is `highest - index`, where `highest` counts the vertices
/// introduced so far; a code of zero introduces the next vertex. The
/// stream must introduce vertices in slot order (index `n` appears
/// only once indices `0..n` have), which is exactly what the
/// vertex-fetch remap guarantees.
pub(crate) fn highwater_encode(indices: &[u32]) -> Result<Vec<u32>, QmeshError> {
    let mut highest = 0u32;
    let mut codes = Vec::with_capacity(indices.len());
    for &index in indices {
        if index > highest {
            return Err(QmeshError::IndexNotWatermarked(index, highest));
        }
        codes.push(highest - index);
        if index == highest {
            highest += 1;
        }
    }
    Ok(codes)
}

/// Decodes a high-watermark coded index stream.
pub(crate) fn highwater_decode(codes: &[u32]) -> Vec<u32> {
    let mut highest = 0u32;
    let mut indices = Vec::with_capacity(codes.len());
    for &code in codes {
        indices.push(highest - code);
        if code == 0 {
            highest += 1;
        }
    }
    indices
}
