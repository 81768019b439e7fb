//! Data type and compression type registry.
//!
//! Mirrors the enums and the two `bytes_per_element*` queries from
//! `om_common.h`/`om_common.c`: which array element types a compression
//! kind accepts, and how wide an element is before and after compression.

use crate::errors::{OmFileError, Result};

/// Data type tag stored in a variable record.
///
/// Scalar and array variants are distinct tags (`INT8` vs `INT8_ARRAY`) so a
/// reader can tell at a glance, from the tag alone, whether a variable is a
/// scalar or a numeric array.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum DataType {
    None = 0,
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Int64 = 7,
    UInt64 = 8,
    Float = 9,
    Double = 10,
    String = 11,
    Int8Array = 12,
    UInt8Array = 13,
    Int16Array = 14,
    UInt16Array = 15,
    Int32Array = 16,
    UInt32Array = 17,
    Int64Array = 18,
    UInt64Array = 19,
    FloatArray = 20,
    DoubleArray = 21,
    StringArray = 22,
}

impl DataType {
    /// Decode a raw tag byte. Unknown tags are rejected with
    /// `InvalidDataType` rather than silently mapping to `None`.
    pub fn from_u8(tag: u8) -> Result<Self> {
        use DataType::*;
        Ok(match tag {
            0 => None,
            1 => Int8,
            2 => UInt8,
            3 => Int16,
            4 => UInt16,
            5 => Int32,
            6 => UInt32,
            7 => Int64,
            8 => UInt64,
            9 => Float,
            10 => Double,
            11 => String,
            12 => Int8Array,
            13 => UInt8Array,
            14 => Int16Array,
            15 => UInt16Array,
            16 => Int32Array,
            17 => UInt32Array,
            18 => Int64Array,
            19 => UInt64Array,
            20 => FloatArray,
            21 => DoubleArray,
            22 => StringArray,
            _ => return Err(OmFileError::InvalidDataType),
        })
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            DataType::Int8Array
                | DataType::UInt8Array
                | DataType::Int16Array
                | DataType::UInt16Array
                | DataType::Int32Array
                | DataType::UInt32Array
                | DataType::Int64Array
                | DataType::UInt64Array
                | DataType::FloatArray
                | DataType::DoubleArray
        )
    }

    /// Number of bytes a single uncompressed element occupies.
    ///
    /// Only valid for array types; scalars and `StringArray` (unimplemented,
    /// see `spec.md` §1) return `InvalidDataType`.
    pub fn bytes_per_element(self) -> Result<u8> {
        use DataType::*;
        match self {
            Int8Array | UInt8Array => Ok(1),
            Int16Array | UInt16Array => Ok(2),
            Int32Array | UInt32Array | FloatArray => Ok(4),
            Int64Array | UInt64Array | DoubleArray => Ok(8),
            _ => Err(OmFileError::InvalidDataType),
        }
    }
}

/// Compression kind stored in a variable record.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum CompressionType {
    /// Lossy: scale floats to a signed 16-bit integer, then 2-D delta +
    /// zigzag bitpack.
    PforDelta2dInt16 = 0,
    /// Lossless: 2-D XOR filter + float bitpacking, float32/float64 only.
    FpxXor2d = 1,
    /// Lossless: scale to native-width signed integers, then 2-D delta +
    /// zigzag (or plain delta for already-integer arrays) bitpack.
    PforDelta2d = 2,
    /// Like `PforDelta2dInt16` but applies `log10(1+x)` before scaling.
    PforDelta2dInt16Logarithmic = 3,
    /// No compression; elements are copied at native width.
    None = 4,
}

impl CompressionType {
    pub fn from_u8(tag: u8) -> Result<Self> {
        use CompressionType::*;
        Ok(match tag {
            0 => PforDelta2dInt16,
            1 => FpxXor2d,
            2 => PforDelta2d,
            3 => PforDelta2dInt16Logarithmic,
            4 => None,
            _ => return Err(OmFileError::InvalidCompressionType),
        })
    }

    /// Number of bytes a single compressed element occupies, for the given
    /// array element type. Fails if the pair is not in the compatibility
    /// table (`spec.md` §4.1).
    pub fn bytes_per_element_compressed(self, data_type: DataType) -> Result<u8> {
        use CompressionType::*;
        use DataType::*;
        match self {
            PforDelta2dInt16 | PforDelta2dInt16Logarithmic => {
                if data_type != FloatArray {
                    return Err(OmFileError::InvalidDataType);
                }
                Ok(2)
            }
            FpxXor2d => {
                if data_type != FloatArray && data_type != DoubleArray {
                    return Err(OmFileError::InvalidDataType);
                }
                data_type.bytes_per_element()
            }
            PforDelta2d | CompressionType::None => data_type.bytes_per_element(),
        }
    }
}
