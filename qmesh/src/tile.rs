use crate::{
    codec::{highwater_decode, highwater_encode, zigzag_decode, zigzag_encode},
    QmeshError, LONG_INDEX_THRESHOLD,
};
use std::{fs::File, io::Write, path::Path};

/// Tile header: everything a client needs to place, light and cull the
/// tile without touching the mesh itself.
///
/// All positions are ECEF meters on WGS84.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Header {
    /// Center of the tile's axis-aligned ECEF bounding box.
    pub center: [f64; 3],
    /// Lowest height in the tile, in meters above the ellipsoid.
    pub min_height: f32,
    /// Highest height in the tile, in meters above the ellipsoid.
    pub max_height: f32,
    /// Center of the tile's minimum bounding sphere.
    pub bounding_sphere_center: [f64; 3],
    /// Radius of the tile's minimum bounding sphere.
    pub bounding_sphere_radius: f64,
    /// Horizon occlusion point; if this point is below the horizon,
    /// the entire tile is.
    pub horizon_occlusion_point: [f64; 3],
}

/// Quantized vertex positions as three parallel arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexData {
    /// West-to-east coordinate, `0` at the tile's western edge.
    pub u: Vec<u16>,
    /// South-to-north coordinate, `0` at the tile's southern edge.
    pub v: Vec<u16>,
    /// Height, `0` at `min_height`, `32767` at `max_height`.
    pub height: Vec<u16>,
}

impl VertexData {
    /// Number of vertices carried.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.u.len()
    }
}

/// Triangle connectivity, three indices per triangle, counterclockwise
/// when viewed from above.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexData {
    /// Flat triangle index list, `3 * triangle_count` entries.
    pub indices: Vec<u32>,
}

impl IndexData {
    /// Number of triangles carried.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Indices of the vertices lying on each edge of the tile, used by
/// clients to stitch neighboring tiles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeIndices {
    /// Vertices on the `u = 0` edge.
    pub west: Vec<u32>,
    /// Vertices on the `v = 0` edge.
    pub south: Vec<u32>,
    /// Vertices on the `u = 32767` edge.
    pub east: Vec<u32>,
    /// Vertices on the `v = 32767` edge.
    pub north: Vec<u32>,
}

/// A complete quantized-mesh tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tile {
    /// Placement and culling metadata.
    pub header: Header,
    /// Quantized vertices.
    pub vertex_data: VertexData,
    /// Triangle connectivity.
    pub index_data: IndexData,
    /// Border vertex bookkeeping.
    pub edge_indices: EdgeIndices,
}

impl Tile {
    /// Serializes the tile into the quantized-mesh byte layout.
    ///
    /// Triangle indices must be vertex-fetch optimized (each vertex's
    /// first use appears in slot order); otherwise the high-watermark
    /// coding is undefined and this returns
    /// [`QmeshError::IndexNotWatermarked`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, QmeshError> {
        let mut out = Vec::with_capacity(
            88 + 4 + self.vertex_data.len() * 6 + 4 + self.index_data.indices.len() * 4,
        );

        for coord in self.header.center {
            out.extend_from_slice(&coord.to_le_bytes());
        }
        out.extend_from_slice(&self.header.min_height.to_le_bytes());
        out.extend_from_slice(&self.header.max_height.to_le_bytes());
        for coord in self.header.bounding_sphere_center {
            out.extend_from_slice(&coord.to_le_bytes());
        }
        out.extend_from_slice(&self.header.bounding_sphere_radius.to_le_bytes());
        for coord in self.header.horizon_occlusion_point {
            out.extend_from_slice(&coord.to_le_bytes());
        }

        let vertex_count = u32::try_from(self.vertex_data.len()).expect("vertex count fits u32");
        out.extend_from_slice(&vertex_count.to_le_bytes());
        for array in [&self.vertex_data.u, &self.vertex_data.v, &self.vertex_data.height] {
            let mut prev = 0u16;
            for &value in array.iter() {
                out.extend_from_slice(&zigzag_encode(prev, value).to_le_bytes());
                prev = value;
            }
        }

        let long_indices = self.vertex_data.len() > LONG_INDEX_THRESHOLD;
        if long_indices {
            while out.len() % 4 != 0 {
                out.push(0);
            }
        }
        let triangle_count =
            u32::try_from(self.index_data.triangle_count()).expect("triangle count fits u32");
        out.extend_from_slice(&triangle_count.to_le_bytes());
        let codes = highwater_encode(&self.index_data.indices)?;
        for code in codes {
            push_index(&mut out, code, long_indices);
        }

        for edge in [
            &self.edge_indices.west,
            &self.edge_indices.south,
            &self.edge_indices.east,
            &self.edge_indices.north,
        ] {
            let count = u32::try_from(edge.len()).expect("edge vertex count fits u32");
            out.extend_from_slice(&count.to_le_bytes());
            for &index in edge.iter() {
                push_index(&mut out, index, long_indices);
            }
        }

        Ok(out)
    }

    /// Parses a tile from the quantized-mesh byte layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Tile, QmeshError> {
        let mut cursor = Cursor { bytes, offset: 0 };

        let header = Header {
            center: [
                cursor.f64("header")?,
                cursor.f64("header")?,
                cursor.f64("header")?,
            ],
            min_height: cursor.f32("header")?,
            max_height: cursor.f32("header")?,
            bounding_sphere_center: [
                cursor.f64("header")?,
                cursor.f64("header")?,
                cursor.f64("header")?,
            ],
            bounding_sphere_radius: cursor.f64("header")?,
            horizon_occlusion_point: [
                cursor.f64("header")?,
                cursor.f64("header")?,
                cursor.f64("header")?,
            ],
        };

        let vertex_count = cursor.u32("vertex count")? as usize;
        let mut vertex_data = VertexData::default();
        for array in [&mut vertex_data.u, &mut vertex_data.v, &mut vertex_data.height] {
            let mut prev = 0u16;
            array.reserve(vertex_count);
            for _ in 0..vertex_count {
                let value = zigzag_decode(prev, cursor.u16("vertex data")?);
                array.push(value);
                prev = value;
            }
        }

        let long_indices = vertex_count > LONG_INDEX_THRESHOLD;
        if long_indices {
            while cursor.offset % 4 != 0 {
                cursor.u8("index padding")?;
            }
        }
        let triangle_count = cursor.u32("triangle count")? as usize;
        let mut codes = Vec::with_capacity(triangle_count * 3);
        for _ in 0..triangle_count * 3 {
            codes.push(cursor.index("index data", long_indices)?);
        }
        let index_data = IndexData {
            indices: highwater_decode(&codes),
        };

        let mut edge_indices = EdgeIndices::default();
        for edge in [
            &mut edge_indices.west,
            &mut edge_indices.south,
            &mut edge_indices.east,
            &mut edge_indices.north,
        ] {
            let count = cursor.u32("edge count")? as usize;
            edge.reserve(count);
            for _ in 0..count {
                edge.push(cursor.index("edge indices", long_indices)?);
            }
        }

        Ok(Tile {
            header,
            vertex_data,
            index_data,
            edge_indices,
        })
    }

    /// Serializes the tile to the file at `path`.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), QmeshError> {
        let bytes = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }
}

fn push_index(out: &mut Vec<u8>, index: u32, long_indices: bool) {
    if long_indices {
        out.extend_from_slice(&index.to_le_bytes());
    } else {
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(index as u16).to_le_bytes());
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn take(&mut self, len: usize, section: &'static str) -> Result<&[u8], QmeshError> {
        let end = self.offset + len;
        if end > self.bytes.len() {
            return Err(QmeshError::Truncated(section));
        }
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self, section: &'static str) -> Result<u8, QmeshError> {
        Ok(self.take(1, section)?[0])
    }

    fn u16(&mut self, section: &'static str) -> Result<u16, QmeshError> {
        let raw = self.take(2, section)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    fn u32(&mut self, section: &'static str) -> Result<u32, QmeshError> {
        let raw = self.take(4, section)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn f32(&mut self, section: &'static str) -> Result<f32, QmeshError> {
        let raw = self.take(4, section)?;
        Ok(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn f64(&mut self, section: &'static str) -> Result<f64, QmeshError> {
        let raw = self.take(8, section)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(f64::from_le_bytes(buf))
    }

    fn index(&mut self, section: &'static str, long_indices: bool) -> Result<u32, QmeshError> {
        if long_indices {
            self.u32(section)
        } else {
            self.u16(section).map(u32::from)
        }
    }
}
