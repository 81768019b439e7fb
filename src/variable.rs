//! Variable metadata: parsing and writing (`spec.md` §4.5, §3).
//!
//! Grounded on `om_variable.h`/`om_variable.c`: three on-disk shapes share
//! one probe (legacy vs. v3 array vs. v3 scalar), and the v3 shapes share a
//! fixed field order — header, then children (sizes array, then offsets
//! array, 8 bytes each), then shape-specific payload, then the name last.
//!
//! Unlike the source, which casts a raw pointer to a typed struct and walks
//! it with pointer arithmetic, every accessor here is bounds-checked against
//! the borrowed byte slice and returns `OutOfBoundRead` instead of reading
//! past the end.

use byteorder::{ByteOrder, LittleEndian as LE};

use crate::errors::{OmFileError, Result};
use crate::types::{CompressionType, DataType};

/// Fixed 40-byte legacy (v1/v2) header: magic, version, compression,
/// scale, two dimensions, two chunk sizes. No name or children payload.
pub const LEGACY_HEADER_SIZE: usize = 40;
/// Fixed portion of a v3 scalar record, before children/value/name.
pub const SCALAR_HEADER_SIZE: usize = 8;
/// Fixed portion of a v3 array record, before children/dimensions/name.
pub const ARRAY_HEADER_SIZE: usize = 40;

#[derive(Debug, Clone, Copy)]
pub struct LegacyHeader {
    pub version: u8,
    pub compression_type: CompressionType,
    pub scale_factor: f32,
    pub dim0: u64,
    pub dim1: u64,
    pub chunk0: u64,
    pub chunk1: u64,
}

impl LegacyHeader {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let h = buf
            .get(..LEGACY_HEADER_SIZE)
            .ok_or(OmFileError::OutOfBoundRead)?;
        if h[0] != b'O' || h[1] != b'M' {
            return Err(OmFileError::NotAnOmFile);
        }
        let version = h[2];
        if version != 1 && version != 2 {
            return Err(OmFileError::NotAnOmFile);
        }
        // v1 never recorded a compression tag; it is implicitly int16 PFOR.
        let compression_type = if version == 1 {
            CompressionType::PforDelta2dInt16
        } else {
            CompressionType::from_u8(h[3])?
        };
        Ok(LegacyHeader {
            version,
            compression_type,
            scale_factor: LE::read_f32(&h[4..8]),
            dim0: LE::read_u64(&h[8..16]),
            dim1: LE::read_u64(&h[16..24]),
            chunk0: LE::read_u64(&h[24..32]),
            chunk1: LE::read_u64(&h[32..40]),
        })
    }
}

/// Distinguishes the three on-disk shapes, mirroring
/// `_om_variable_memory_layout`: legacy if the magic + version match; else
/// array if the data-type tag falls in the array range; else scalar.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VariableLayout {
    Legacy,
    Array,
    Scalar,
}

impl VariableLayout {
    pub fn detect(buf: &[u8]) -> Result<Self> {
        if buf.len() >= 3 && buf[0] == b'O' && buf[1] == b'M' && (buf[2] == 1 || buf[2] == 2) {
            return Ok(VariableLayout::Legacy);
        }
        let tag = *buf.first().ok_or(OmFileError::OutOfBoundRead)?;
        let data_type = DataType::from_u8(tag)?;
        Ok(if data_type.is_array() {
            VariableLayout::Array
        } else {
            VariableLayout::Scalar
        })
    }
}

struct CommonHeader {
    data_type: DataType,
    compression_type: CompressionType,
    name_size: u16,
    children_count: u32,
}

fn parse_common(buf: &[u8]) -> Result<CommonHeader> {
    let h = buf.get(..SCALAR_HEADER_SIZE).ok_or(OmFileError::OutOfBoundRead)?;
    Ok(CommonHeader {
        data_type: DataType::from_u8(h[0])?,
        compression_type: CompressionType::from_u8(h[1])?,
        name_size: LE::read_u16(&h[2..4]),
        children_count: LE::read_u32(&h[4..8]),
    })
}

/// Reads `count` `(offset, size)` pairs starting at child index `offset`,
/// from a sizes-then-offsets children region beginning at `buf[header_size..]`.
fn read_children(
    buf: &[u8],
    header_size: usize,
    children_count: u32,
    offset: u32,
    count: u32,
) -> Result<Vec<(u64, u64)>> {
    let last = offset.checked_add(count).ok_or(OmFileError::OutOfBoundRead)?;
    if last > children_count {
        return Err(OmFileError::OutOfBoundRead);
    }
    let region_len = 16 * children_count as usize;
    let region = buf
        .get(header_size..header_size + region_len)
        .ok_or(OmFileError::OutOfBoundRead)?;
    let offsets_base = 8 * children_count as usize;
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let idx = (offset + i) as usize;
        let size = LE::read_u64(&region[idx * 8..idx * 8 + 8]);
        let off = LE::read_u64(&region[offsets_base + idx * 8..offsets_base + idx * 8 + 8]);
        out.push((off, size));
    }
    Ok(out)
}

fn write_children(dst: &mut [u8], children: &[(u64, u64)]) {
    let n = children.len();
    for (i, (_offset, size)) in children.iter().enumerate() {
        LE::write_u64(&mut dst[i * 8..i * 8 + 8], *size);
    }
    let offsets_base = n * 8;
    for (i, (offset, _size)) in children.iter().enumerate() {
        LE::write_u64(&mut dst[offsets_base + i * 8..offsets_base + i * 8 + 8], *offset);
    }
}

/// A parsed v3 numeric array record, borrowing its backing buffer.
pub struct ArrayVariable<'a> {
    buf: &'a [u8],
    pub data_type: DataType,
    pub compression_type: CompressionType,
    name_size: u16,
    children_count: u32,
    pub lut_size: u64,
    pub lut_offset: u64,
    dimension_count: u64,
    pub scale_factor: f32,
    pub add_offset: f32,
}

impl<'a> ArrayVariable<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let common = parse_common(buf)?;
        if !common.data_type.is_array() {
            return Err(OmFileError::InvalidDataType);
        }
        let h = buf.get(..ARRAY_HEADER_SIZE).ok_or(OmFileError::OutOfBoundRead)?;
        Ok(ArrayVariable {
            buf,
            data_type: common.data_type,
            compression_type: common.compression_type,
            name_size: common.name_size,
            children_count: common.children_count,
            lut_size: LE::read_u64(&h[8..16]),
            lut_offset: LE::read_u64(&h[16..24]),
            dimension_count: LE::read_u64(&h[24..32]),
            scale_factor: LE::read_f32(&h[32..36]),
            add_offset: LE::read_f32(&h[36..40]),
        })
    }

    pub fn children_count(&self) -> u32 {
        self.children_count
    }

    pub fn children(&self, offset: u32, count: u32) -> Result<Vec<(u64, u64)>> {
        read_children(self.buf, ARRAY_HEADER_SIZE, self.children_count, offset, count)
    }

    fn dims_offset(&self) -> usize {
        ARRAY_HEADER_SIZE + 16 * self.children_count as usize
    }

    fn chunks_offset(&self) -> usize {
        self.dims_offset() + 8 * self.dimension_count as usize
    }

    fn name_offset(&self) -> usize {
        self.dims_offset() + 16 * self.dimension_count as usize
    }

    pub fn dimension_count(&self) -> u64 {
        self.dimension_count
    }

    fn read_u64_region(&self, start: usize, count: u64) -> Result<Vec<u64>> {
        let len = 8 * count as usize;
        let region = self
            .buf
            .get(start..start + len)
            .ok_or(OmFileError::OutOfBoundRead)?;
        Ok(region.chunks_exact(8).map(LE::read_u64).collect())
    }

    pub fn dimensions(&self) -> Result<Vec<u64>> {
        self.read_u64_region(self.dims_offset(), self.dimension_count)
    }

    pub fn chunks(&self) -> Result<Vec<u64>> {
        self.read_u64_region(self.chunks_offset(), self.dimension_count)
    }

    pub fn name(&self) -> Result<&'a [u8]> {
        let start = self.name_offset();
        self.buf
            .get(start..start + self.name_size as usize)
            .ok_or(OmFileError::OutOfBoundRead)
    }
}

/// A parsed v3 scalar record, borrowing its backing buffer.
pub struct ScalarVariable<'a> {
    buf: &'a [u8],
    pub data_type: DataType,
    pub compression_type: CompressionType,
    name_size: u16,
    children_count: u32,
}

impl<'a> ScalarVariable<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let common = parse_common(buf)?;
        if common.data_type.is_array() {
            return Err(OmFileError::InvalidDataType);
        }
        Ok(ScalarVariable {
            buf,
            data_type: common.data_type,
            compression_type: common.compression_type,
            name_size: common.name_size,
            children_count: common.children_count,
        })
    }

    pub fn children_count(&self) -> u32 {
        self.children_count
    }

    pub fn children(&self, offset: u32, count: u32) -> Result<Vec<(u64, u64)>> {
        read_children(self.buf, SCALAR_HEADER_SIZE, self.children_count, offset, count)
    }

    fn value_offset(&self) -> usize {
        SCALAR_HEADER_SIZE + 16 * self.children_count as usize
    }

    /// Size, in bytes, of the value payload (including the length prefix
    /// for `String`).
    fn value_byte_len(&self) -> Result<usize> {
        use DataType::*;
        Ok(match self.data_type {
            None => 0,
            Int8 | UInt8 => 1,
            Int16 | UInt16 => 2,
            Int32 | UInt32 | Float => 4,
            Int64 | UInt64 | Double => 8,
            String => {
                let start = self.value_offset();
                let len_bytes = self
                    .buf
                    .get(start..start + 8)
                    .ok_or(OmFileError::OutOfBoundRead)?;
                8 + LE::read_u64(len_bytes) as usize
            }
            _ => return Err(OmFileError::InvalidDataType),
        })
    }

    /// Raw value bytes. For `String` this is the string content only (the
    /// 8-byte length prefix is stripped).
    pub fn scalar_value(&self) -> Result<&'a [u8]> {
        let start = self.value_offset();
        match self.data_type {
            DataType::String => {
                let len_bytes = self
                    .buf
                    .get(start..start + 8)
                    .ok_or(OmFileError::OutOfBoundRead)?;
                let len = LE::read_u64(len_bytes) as usize;
                self.buf
                    .get(start + 8..start + 8 + len)
                    .ok_or(OmFileError::OutOfBoundRead)
            }
            _ => {
                let len = self.value_byte_len()?;
                self.buf.get(start..start + len).ok_or(OmFileError::OutOfBoundRead)
            }
        }
    }

    pub fn name(&self) -> Result<&'a [u8]> {
        let start = self.value_offset() + self.value_byte_len()?;
        self.buf
            .get(start..start + self.name_size as usize)
            .ok_or(OmFileError::OutOfBoundRead)
    }
}

/// Any of the three parsed shapes, with the common accessors the planner
/// and decoder need.
pub enum Variable<'a> {
    Legacy(LegacyHeader),
    Array(ArrayVariable<'a>),
    Scalar(ScalarVariable<'a>),
}

impl<'a> Variable<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        match VariableLayout::detect(buf)? {
            VariableLayout::Legacy => Ok(Variable::Legacy(LegacyHeader::parse(buf)?)),
            VariableLayout::Array => Ok(Variable::Array(ArrayVariable::parse(buf)?)),
            VariableLayout::Scalar => Ok(Variable::Scalar(ScalarVariable::parse(buf)?)),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Variable::Legacy(_) => DataType::FloatArray,
            Variable::Array(a) => a.data_type,
            Variable::Scalar(s) => s.data_type,
        }
    }

    pub fn compression_type(&self) -> CompressionType {
        match self {
            Variable::Legacy(h) => h.compression_type,
            Variable::Array(a) => a.compression_type,
            Variable::Scalar(s) => s.compression_type,
        }
    }

    pub fn scale_factor(&self) -> f32 {
        match self {
            Variable::Legacy(h) => h.scale_factor,
            Variable::Array(a) => a.scale_factor,
            Variable::Scalar(_) => 1.0,
        }
    }

    pub fn add_offset(&self) -> f32 {
        match self {
            Variable::Legacy(_) => 0.0,
            Variable::Array(a) => a.add_offset,
            Variable::Scalar(_) => 0.0,
        }
    }

    pub fn dimensions(&self) -> Result<Vec<u64>> {
        match self {
            Variable::Legacy(h) => Ok(vec![h.dim0, h.dim1]),
            Variable::Array(a) => a.dimensions(),
            Variable::Scalar(_) => Ok(Vec::new()),
        }
    }

    pub fn chunks(&self) -> Result<Vec<u64>> {
        match self {
            Variable::Legacy(h) => Ok(vec![h.chunk0, h.chunk1]),
            Variable::Array(a) => a.chunks(),
            Variable::Scalar(_) => Ok(Vec::new()),
        }
    }

    pub fn children_count(&self) -> u32 {
        match self {
            Variable::Legacy(_) => 0,
            Variable::Array(a) => a.children_count(),
            Variable::Scalar(s) => s.children_count(),
        }
    }

    pub fn children(&self, offset: u32, count: u32) -> Result<Vec<(u64, u64)>> {
        match self {
            Variable::Legacy(_) => Err(OmFileError::InvalidDataType),
            Variable::Array(a) => a.children(offset, count),
            Variable::Scalar(s) => s.children(offset, count),
        }
    }

    /// No guarantee of NUL termination — borrowed straight out of the
    /// buffer, matching `om_variable_get_name`.
    pub fn name(&self) -> Result<&'a [u8]> {
        match self {
            Variable::Legacy(_) => Ok(&[]),
            Variable::Array(a) => a.name(),
            Variable::Scalar(s) => s.name(),
        }
    }
}

/// Size, in bytes, a scalar record with the given shape would occupy if
/// written. `string_size` is ignored unless `data_type` is `String`.
pub fn scalar_size(
    name_size: u16,
    children_count: u32,
    data_type: DataType,
    string_size: u64,
) -> Result<usize> {
    use DataType::*;
    let base = SCALAR_HEADER_SIZE + name_size as usize + children_count as usize * 16;
    Ok(match data_type {
        None => base,
        Int8 | UInt8 => base + 1,
        Int16 | UInt16 => base + 2,
        Int32 | UInt32 | Float => base + 4,
        Int64 | UInt64 | Double => base + 8,
        String => base + 8 + string_size as usize,
        _ => return Err(OmFileError::InvalidDataType),
    })
}

/// Size, in bytes, of a numeric array record's metadata (header, children,
/// dimensions, chunks, name) — excludes LUT and chunk payload bytes, which
/// live at the offsets this record's `lut_offset`/children point to.
pub fn numeric_array_size(name_size: u16, children_count: u32, dimension_count: u64) -> usize {
    ARRAY_HEADER_SIZE + name_size as usize + children_count as usize * 16 + dimension_count as usize * 16
}

/// Writes a scalar record into `dst`, returning the number of bytes
/// written. `value` is the raw value bytes at native width (empty for
/// `DataType::None`); for `DataType::String` it is the string content with
/// no length prefix, which this function adds.
pub fn write_scalar(
    dst: &mut [u8],
    children: &[(u64, u64)],
    name: &[u8],
    data_type: DataType,
    value: &[u8],
) -> Result<usize> {
    dst[0] = data_type as u8;
    dst[1] = CompressionType::None as u8;
    LE::write_u16(&mut dst[2..4], name.len() as u16);
    LE::write_u32(&mut dst[4..8], children.len() as u32);
    write_children(&mut dst[SCALAR_HEADER_SIZE..], children);

    let value_start = SCALAR_HEADER_SIZE + children.len() * 16;
    use DataType::*;
    let value_len = match data_type {
        None => 0,
        Int8 | UInt8 => 1,
        Int16 | UInt16 => 2,
        Int32 | UInt32 | Float => 4,
        Int64 | UInt64 | Double => 8,
        String => 8 + value.len(),
        _ => return Err(OmFileError::InvalidDataType),
    };
    match data_type {
        DataType::None => {}
        DataType::String => {
            LE::write_u64(&mut dst[value_start..value_start + 8], value.len() as u64);
            dst[value_start + 8..value_start + 8 + value.len()].copy_from_slice(value);
        }
        _ => dst[value_start..value_start + value_len].copy_from_slice(value),
    }

    let name_start = value_start + value_len;
    dst[name_start..name_start + name.len()].copy_from_slice(name);
    Ok(name_start + name.len())
}

/// Writes a numeric array record's metadata into `dst` (LUT and chunk
/// payload live elsewhere, at `lut_offset`/the children's offsets).
/// Returns the number of bytes written.
#[allow(clippy::too_many_arguments)]
pub fn write_numeric_array(
    dst: &mut [u8],
    children: &[(u64, u64)],
    name: &[u8],
    data_type: DataType,
    compression_type: CompressionType,
    scale_factor: f32,
    add_offset: f32,
    dimensions: &[u64],
    chunks: &[u64],
    lut_size: u64,
    lut_offset: u64,
) -> Result<usize> {
    if !data_type.is_array() {
        return Err(OmFileError::InvalidDataType);
    }
    if dimensions.len() != chunks.len() {
        return Err(OmFileError::InvalidChunkDimensions);
    }
    dst[0] = data_type as u8;
    dst[1] = compression_type as u8;
    LE::write_u16(&mut dst[2..4], name.len() as u16);
    LE::write_u32(&mut dst[4..8], children.len() as u32);
    LE::write_u64(&mut dst[8..16], lut_size);
    LE::write_u64(&mut dst[16..24], lut_offset);
    LE::write_u64(&mut dst[24..32], dimensions.len() as u64);
    LE::write_f32(&mut dst[32..36], scale_factor);
    LE::write_f32(&mut dst[36..40], add_offset);
    write_children(&mut dst[ARRAY_HEADER_SIZE..], children);

    let dims_start = ARRAY_HEADER_SIZE + children.len() * 16;
    for (i, d) in dimensions.iter().enumerate() {
        LE::write_u64(&mut dst[dims_start + i * 8..dims_start + i * 8 + 8], *d);
    }
    let chunks_start = dims_start + dimensions.len() * 8;
    for (i, c) in chunks.iter().enumerate() {
        LE::write_u64(&mut dst[chunks_start + i * 8..chunks_start + i * 8 + 8], *c);
    }
    let name_start = chunks_start + chunks.len() * 8;
    dst[name_start..name_start + name.len()].copy_from_slice(name);
    Ok(name_start + name.len())
}
