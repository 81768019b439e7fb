//! Per-(compression type, data type) codec wiring shared by `encoder.rs`
//! and `decoder.rs` (`spec.md` §4.1, §4.8, §4.9).
//!
//! Grounded on the three-way switches in `om_encoder_compress_chunk`/
//! `om_decode_decompress`/`om_decode_copy` in the original: which entropy
//! codec width and signedness a (compression, data type) pair uses, whether
//! the 2-D delta/XOR filter runs at all and at what width, and how the
//! filtered native-width buffer maps to/from the array's logical element
//! type.
//!
//! One deliberate correction versus the source: its `om_decode_copy`
//! handles `UINT64_ARRAY` under `PFOR_DELTA2D` with the 32-bit copy helper,
//! which truncates every value to its low 32 bits. `Scaling::None` here
//! always copies at the data type's own native width.

use crate::delta2d;
use crate::errors::{OmFileError, Result};
use crate::scale;
use crate::types::{CompressionType, DataType};
use crate::codec::{ElemWidth, Signedness};

/// How a filtered, codec-native-width element maps to the array's logical
/// element representation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Scaling {
    /// Same width and representation; straight copy.
    None,
    /// Scaled `i16` <-> `f32` (`PforDelta2dInt16`).
    Int16Linear,
    /// Scaled `i16` <-> `f32` through `log10(1+x)` (`PforDelta2dInt16Logarithmic`).
    Int16Log10,
    /// Scaled `i32` <-> `f32`, used by `PforDelta2d` on `FloatArray`.
    Int32Float,
    /// Scaled `i64` <-> `f64`, used by `PforDelta2d` on `DoubleArray`.
    Int64Double,
    /// Raw bit pattern carried through unchanged (`FpxXor2d`).
    FloatBits,
}

#[derive(Debug, Copy, Clone)]
pub struct CodecParams {
    pub codec_width: ElemWidth,
    pub signedness: Signedness,
    pub filter_width: Option<delta2d::Width>,
    pub scaling: Scaling,
}

impl CodecParams {
    pub fn native_width(self) -> usize {
        self.codec_width.byte_width()
    }
}

/// Resolves the codec wiring for a (compression, data type) pair.
/// `CompressionType::None` is handled by callers before reaching here — it
/// performs no entropy coding or filtering at all.
pub fn codec_params(compression_type: CompressionType, data_type: DataType) -> Result<CodecParams> {
    use CompressionType::*;
    use DataType::*;

    match compression_type {
        PforDelta2dInt16 => {
            if data_type != FloatArray {
                return Err(OmFileError::InvalidDataType);
            }
            Ok(CodecParams {
                codec_width: ElemWidth::B2,
                signedness: Signedness::Signed,
                filter_width: Some(delta2d::Width::Int16),
                scaling: Scaling::Int16Linear,
            })
        }
        PforDelta2dInt16Logarithmic => {
            if data_type != FloatArray {
                return Err(OmFileError::InvalidDataType);
            }
            Ok(CodecParams {
                codec_width: ElemWidth::B2,
                signedness: Signedness::Signed,
                filter_width: Some(delta2d::Width::Int16),
                scaling: Scaling::Int16Log10,
            })
        }
        FpxXor2d => match data_type {
            FloatArray => Ok(CodecParams {
                codec_width: ElemWidth::B4,
                signedness: Signedness::Unsigned,
                filter_width: Some(delta2d::Width::XorF32),
                scaling: Scaling::FloatBits,
            }),
            DoubleArray => Ok(CodecParams {
                codec_width: ElemWidth::B8,
                signedness: Signedness::Unsigned,
                filter_width: Some(delta2d::Width::XorF64),
                scaling: Scaling::FloatBits,
            }),
            _ => Err(OmFileError::InvalidDataType),
        },
        PforDelta2d => match data_type {
            FloatArray => Ok(CodecParams {
                codec_width: ElemWidth::B4,
                signedness: Signedness::Signed,
                filter_width: Some(delta2d::Width::Int32),
                scaling: Scaling::Int32Float,
            }),
            DoubleArray => Ok(CodecParams {
                codec_width: ElemWidth::B8,
                signedness: Signedness::Signed,
                filter_width: Some(delta2d::Width::Int64),
                scaling: Scaling::Int64Double,
            }),
            Int8Array | UInt8Array => Ok(CodecParams {
                codec_width: ElemWidth::B1,
                signedness: Signedness::Signed,
                filter_width: Some(delta2d::Width::Int8),
                scaling: Scaling::None,
            }),
            Int16Array | UInt16Array => Ok(CodecParams {
                codec_width: ElemWidth::B2,
                signedness: Signedness::Signed,
                filter_width: Some(delta2d::Width::Int16),
                scaling: Scaling::None,
            }),
            Int32Array | UInt32Array => Ok(CodecParams {
                codec_width: ElemWidth::B4,
                signedness: Signedness::Signed,
                filter_width: Some(delta2d::Width::Int32),
                scaling: Scaling::None,
            }),
            Int64Array | UInt64Array => Ok(CodecParams {
                codec_width: ElemWidth::B8,
                signedness: Signedness::Signed,
                filter_width: Some(delta2d::Width::Int64),
                scaling: Scaling::None,
            }),
            _ => Err(OmFileError::InvalidDataType),
        },
        CompressionType::None => Err(OmFileError::InvalidCompressionType),
    }
}

/// Converts one codec-native-width element from `src` into `dst` (at the
/// array's logical native width), applying `scaling` in the decode
/// direction.
pub fn unscale_into(scaling: Scaling, src: &[u8], scale_factor: f32, add_offset: f32, dst: &mut [u8]) {
    match scaling {
        Scaling::None | Scaling::FloatBits => dst.copy_from_slice(src),
        Scaling::Int16Linear => {
            let v = i16::from_ne_bytes(src.try_into().unwrap());
            dst.copy_from_slice(&scale::decode_i16_to_f32(v, scale_factor, add_offset).to_ne_bytes());
        }
        Scaling::Int16Log10 => {
            let v = i16::from_ne_bytes(src.try_into().unwrap());
            dst.copy_from_slice(&scale::decode_i16_to_f32_log10(v, scale_factor, add_offset).to_ne_bytes());
        }
        Scaling::Int32Float => {
            let v = i32::from_ne_bytes(src.try_into().unwrap());
            dst.copy_from_slice(&scale::decode_i32_to_f32(v, scale_factor, add_offset).to_ne_bytes());
        }
        Scaling::Int64Double => {
            let v = i64::from_ne_bytes(src.try_into().unwrap());
            dst.copy_from_slice(&scale::decode_i64_to_f64(v, scale_factor as f64, add_offset as f64).to_ne_bytes());
        }
    }
}

/// Converts one array-native-width element from `src` into `dst` (at the
/// codec's native width), applying `scaling` in the encode direction.
pub fn scale_into(scaling: Scaling, src: &[u8], scale_factor: f32, add_offset: f32, dst: &mut [u8]) {
    match scaling {
        Scaling::None | Scaling::FloatBits => dst.copy_from_slice(src),
        Scaling::Int16Linear => {
            let v = f32::from_ne_bytes(src.try_into().unwrap());
            dst.copy_from_slice(&scale::encode_f32_to_i16(v, scale_factor, add_offset).to_ne_bytes());
        }
        Scaling::Int16Log10 => {
            let v = f32::from_ne_bytes(src.try_into().unwrap());
            dst.copy_from_slice(&scale::encode_f32_to_i16_log10(v, scale_factor, add_offset).to_ne_bytes());
        }
        Scaling::Int32Float => {
            let v = f32::from_ne_bytes(src.try_into().unwrap());
            dst.copy_from_slice(&scale::encode_f32_to_i32(v, scale_factor, add_offset).to_ne_bytes());
        }
        Scaling::Int64Double => {
            let v = f64::from_ne_bytes(src.try_into().unwrap());
            dst.copy_from_slice(&scale::encode_f64_to_i64(v, scale_factor as f64, add_offset as f64).to_ne_bytes());
        }
    }
}
