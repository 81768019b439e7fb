//! Per-chunk decode pipeline (`spec.md` §4.9).
//!
//! Grounded on `_om_decoder_decode_chunk`/`om_decode_decompress`/
//! `om_decode_filter`/`om_decode_copy`/`om_decoder_decode_chunks` in
//! `om_decoder.c`: decompress one chunk's full extent into a scratch
//! buffer, invert the 2-D delta/XOR filter in place, unscale into the
//! array's logical element type, then scatter the runs the read window
//! actually touches into the caller's cube buffer. `geometry::plan` drives
//! both the chunk's shape and the scatter walk.

use crate::chunkcodec::{self, Scaling};
use crate::codec;
use crate::delta2d;
use crate::errors::{OmFileError, Result};
use crate::geometry::{self, Params};
use crate::types::{CompressionType, DataType};

/// Decompresses one chunk's full (unclipped) extent into `out`, inverting
/// the entropy codec, the 2-D filter, and the scale/type conversion.
///
/// `out` must be exactly `length_in_chunk * data_type.bytes_per_element()`
/// bytes. Returns the number of bytes of `compressed` consumed.
pub fn decode_chunk(
    data_type: DataType,
    compression_type: CompressionType,
    scale_factor: f32,
    add_offset: f32,
    compressed: &[u8],
    length_in_chunk: usize,
    length_last: usize,
    out: &mut [u8],
) -> Result<usize> {
    let out_width = data_type.bytes_per_element()? as usize;
    if out.len() != length_in_chunk * out_width {
        return Err(OmFileError::OutOfBoundRead);
    }

    if compression_type == CompressionType::None {
        let expected = length_in_chunk * out_width;
        let src = compressed.get(..expected).ok_or(OmFileError::OutOfBoundRead)?;
        out.copy_from_slice(src);
        return Ok(expected);
    }

    let params = chunkcodec::codec_params(compression_type, data_type)?;
    let native_width = params.native_width();
    let mut scratch = vec![0u8; length_in_chunk * native_width];
    let consumed = codec::decode(params.signedness, params.codec_width, compressed, length_in_chunk, &mut scratch)?;
    if consumed != compressed.len() {
        return Err(OmFileError::DeflatedSizeMismatch);
    }

    if let Some(filter_width) = params.filter_width {
        let cols = length_last.max(1);
        let rows = length_in_chunk / cols;
        delta2d::decode(filter_width, rows, cols, &mut scratch);
    }

    unscale_buffer(params.scaling, &scratch, native_width, scale_factor, add_offset, out, out_width);
    Ok(consumed)
}

fn unscale_buffer(scaling: Scaling, src: &[u8], src_width: usize, scale_factor: f32, add_offset: f32, dst: &mut [u8], dst_width: usize) {
    for (s, d) in src.chunks_exact(src_width).zip(dst.chunks_exact_mut(dst_width)) {
        chunkcodec::unscale_into(scaling, s, scale_factor, add_offset, d);
    }
}

/// Decompresses chunk `chunk_index` and scatters the runs of it that
/// intersect the read window described by `geom` into `cube`. A no-op if
/// the chunk and the read window don't intersect.
pub fn decode_and_scatter(
    data_type: DataType,
    compression_type: CompressionType,
    scale_factor: f32,
    add_offset: f32,
    compressed: &[u8],
    chunk_index: u64,
    geom: &Params,
    cube: &mut [u8],
) -> Result<()> {
    let (shape, walk) = geometry::plan(geom, chunk_index);
    if shape.no_data {
        return Ok(());
    }
    let elem_width = data_type.bytes_per_element()? as usize;
    let mut scratch = vec![0u8; shape.length_in_chunk as usize * elem_width];
    decode_chunk(
        data_type,
        compression_type,
        scale_factor,
        add_offset,
        compressed,
        shape.length_in_chunk as usize,
        shape.length_last as usize,
        &mut scratch,
    )?;

    for (chunk_offset, cube_offset, run_len) in walk {
        let src_start = chunk_offset as usize * elem_width;
        let dst_start = cube_offset as usize * elem_width;
        let len = run_len as usize * elem_width;
        cube
            .get_mut(dst_start..dst_start + len)
            .ok_or(OmFileError::OutOfBoundRead)?
            .copy_from_slice(scratch.get(src_start..src_start + len).ok_or(OmFileError::OutOfBoundRead)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ElemWidth, Signedness};

    fn geom_full(dims: &[u64], chunks: &[u64]) -> Params<'static> {
        // Leaked for test convenience; small fixed-size test arrays only.
        Params {
            dimensions: Box::leak(dims.to_vec().into_boxed_slice()),
            chunks: Box::leak(chunks.to_vec().into_boxed_slice()),
            read_offset: Box::leak(vec![0u64; dims.len()].into_boxed_slice()),
            read_count: Box::leak(dims.to_vec().into_boxed_slice()),
            cube_offset: Box::leak(vec![0u64; dims.len()].into_boxed_slice()),
            cube_dimensions: Box::leak(dims.to_vec().into_boxed_slice()),
        }
    }

    #[test]
    fn none_compression_round_trips_raw_bytes() {
        let values: [f32; 4] = [1.0, 2.0, 3.0, 4.0];
        let compressed: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut out = vec![0u8; compressed.len()];
        let consumed = decode_chunk(DataType::FloatArray, CompressionType::None, 1.0, 0.0, &compressed, 4, 2, &mut out).unwrap();
        assert_eq!(consumed, compressed.len());
        assert_eq!(out, compressed);
    }

    #[test]
    fn pfor_delta2d_int16_round_trips_through_scatter() {
        // 2x2 chunk of floats, PforDelta2dInt16 compression, scale 100.
        let values: [f32; 4] = [1.0, 1.5, 2.0, 2.25];
        let mut native: Vec<u8> = Vec::new();
        for v in &values {
            let scaled = crate::scale::encode_f32_to_i16(*v, 100.0, 0.0);
            native.extend_from_slice(&scaled.to_ne_bytes());
        }
        delta2d::encode(delta2d::Width::Int16, 2, 2, &mut native);
        let mut compressed = Vec::new();
        codec::encode(Signedness::Signed, ElemWidth::B2, &native, &mut compressed);

        let geom = geom_full(&[2, 2], &[2, 2]);
        let mut cube = vec![0u8; 4 * 4];
        decode_and_scatter(DataType::FloatArray, CompressionType::PforDelta2dInt16, 100.0, 0.0, &compressed, 0, &geom, &mut cube).unwrap();

        let decoded: Vec<f32> = cube.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
        for (a, b) in values.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 0.01);
        }
    }

    #[test]
    fn truncated_compressed_input_reports_deflated_mismatch() {
        let native = vec![0u8, 0, 1, 0, 2, 0, 3, 0];
        let mut compressed = Vec::new();
        codec::encode(Signedness::Unsigned, ElemWidth::B2, &native, &mut compressed);
        compressed.truncate(compressed.len() - 1);
        let mut out = vec![0u8; native.len()];
        let err = decode_chunk(DataType::Int16Array, CompressionType::PforDelta2d, 1.0, 0.0, &compressed, 4, 2, &mut out);
        assert!(err.is_err());
    }
}
