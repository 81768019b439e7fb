//! Per-chunk encode pipeline (`spec.md` §4.8).
//!
//! Grounded on `om_encoder_init`/`om_encoder_count_chunks*`/
//! `om_encoder_chunk_buffer_size`/`om_encoder_compressed_chunk_buffer_size`/
//! `om_encoder_compress_chunk` in `om_encoder.c`: validate the array's
//! shape, size the scratch buffers a full-extent chunk needs, then for each
//! chunk gather its elements out of the source cube, scale/type-convert,
//! apply the 2-D delta/XOR filter, and entropy-code the result.

use crate::chunkcodec::{self, Scaling};
use crate::codec;
use crate::delta2d;
use crate::errors::{OmFileError, Result};
use crate::geometry::{self, Params};
use crate::planner;
use crate::types::{CompressionType, DataType};

/// Validated shape of an array about to be written.
pub struct EncoderConfig {
    pub data_type: DataType,
    pub compression_type: CompressionType,
    pub scale_factor: f32,
    pub add_offset: f32,
    pub dimensions: Vec<u64>,
    pub chunks: Vec<u64>,
}

impl EncoderConfig {
    pub fn new(
        data_type: DataType,
        compression_type: CompressionType,
        scale_factor: f32,
        add_offset: f32,
        dimensions: Vec<u64>,
        chunks: Vec<u64>,
    ) -> Result<Self> {
        if dimensions.is_empty() || dimensions.len() != chunks.len() {
            return Err(OmFileError::InvalidChunkDimensions);
        }
        for &d in &dimensions {
            if d == 0 {
                return Err(OmFileError::InvalidDimensions);
            }
        }
        for (&d, &c) in dimensions.iter().zip(&chunks) {
            if c == 0 || c > d {
                return Err(OmFileError::InvalidChunkDimensions);
            }
        }
        // Validates the (compression, data type) pairing up front, same as
        // the source rejecting an unsupported combination at init time.
        if compression_type != CompressionType::None {
            chunkcodec::codec_params(compression_type, data_type)?;
        } else {
            data_type.bytes_per_element()?;
        }
        Ok(EncoderConfig { data_type, compression_type, scale_factor, add_offset, dimensions, chunks })
    }

    pub fn number_of_chunks(&self) -> u64 {
        planner::chunk_count(&self.dimensions, &self.chunks)
    }

    fn max_chunk_length(&self) -> usize {
        self.chunks.iter().product::<u64>() as usize
    }

    /// Scratch buffer size one full-extent chunk's gathered, array-native
    /// elements occupy.
    pub fn chunk_buffer_size(&self) -> usize {
        let width = self.data_type.bytes_per_element().unwrap_or(1) as usize;
        self.max_chunk_length() * width
    }

    /// Upper bound on one compressed chunk's byte size.
    pub fn compressed_chunk_buffer_bound(&self) -> usize {
        if self.compression_type == CompressionType::None {
            return self.chunk_buffer_size();
        }
        let params = chunkcodec::codec_params(self.compression_type, self.data_type).expect("validated at construction");
        codec::compressed_buffer_bound(self.max_chunk_length(), params.native_width())
    }
}

/// Gathers chunk `chunk_index`'s elements out of `source_cube` (laid out
/// per `geom`) into `scratch`, which must be at least
/// `shape.length_in_chunk * elem_width` bytes. Returns the chunk's shape.
pub fn gather_chunk(geom: &Params, chunk_index: u64, elem_width: usize, source_cube: &[u8], scratch: &mut [u8]) -> Result<geometry::ChunkShape> {
    let (shape, walk) = geometry::plan(geom, chunk_index);
    if shape.no_data {
        return Ok(shape);
    }
    for (chunk_offset, cube_offset, run_len) in walk {
        let dst = chunk_offset as usize * elem_width;
        let src = cube_offset as usize * elem_width;
        let len = run_len as usize * elem_width;
        scratch
            .get_mut(dst..dst + len)
            .ok_or(OmFileError::OutOfBoundRead)?
            .copy_from_slice(source_cube.get(src..src + len).ok_or(OmFileError::OutOfBoundRead)?);
    }
    Ok(shape)
}

/// Compresses one gathered chunk (`length_in_chunk` array-native elements
/// in `gathered`, row length `length_last`) into `out`, appending. Returns
/// the number of bytes appended.
pub fn compress_chunk(
    config: &EncoderConfig,
    gathered: &[u8],
    length_in_chunk: usize,
    length_last: usize,
    out: &mut Vec<u8>,
) -> Result<usize> {
    let start = out.len();
    let in_width = config.data_type.bytes_per_element()? as usize;

    if config.compression_type == CompressionType::None {
        out.extend_from_slice(gathered);
        return Ok(out.len() - start);
    }

    let params = chunkcodec::codec_params(config.compression_type, config.data_type)?;
    let native_width = params.native_width();
    let mut scratch = vec![0u8; length_in_chunk * native_width];
    scale_buffer(params.scaling, gathered, in_width, config.scale_factor, config.add_offset, &mut scratch, native_width);

    if let Some(filter_width) = params.filter_width {
        let cols = length_last.max(1);
        let rows = length_in_chunk / cols;
        delta2d::encode(filter_width, rows, cols, &mut scratch);
    }

    codec::encode(params.signedness, params.codec_width, &scratch, out);
    Ok(out.len() - start)
}

fn scale_buffer(scaling: Scaling, src: &[u8], src_width: usize, scale_factor: f32, add_offset: f32, dst: &mut [u8], dst_width: usize) {
    for (s, d) in src.chunks_exact(src_width).zip(dst.chunks_exact_mut(dst_width)) {
        chunkcodec::scale_into(scaling, s, scale_factor, add_offset, d);
    }
}

/// Gathers and compresses chunk `chunk_index` from `source_cube` in one
/// call, appending to `out`. Returns the number of bytes appended.
pub fn gather_and_compress(config: &EncoderConfig, geom: &Params, chunk_index: u64, source_cube: &[u8], out: &mut Vec<u8>) -> Result<usize> {
    let elem_width = config.data_type.bytes_per_element()? as usize;
    let mut gathered = vec![0u8; config.chunk_buffer_size()];
    let shape = gather_chunk(geom, chunk_index, elem_width, source_cube, &mut gathered)?;
    if shape.no_data {
        return Ok(0);
    }
    gathered.truncate(shape.length_in_chunk as usize * elem_width);
    compress_chunk(config, &gathered, shape.length_in_chunk as usize, shape.length_last as usize, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimension() {
        let err = EncoderConfig::new(DataType::FloatArray, CompressionType::PforDelta2d, 1.0, 0.0, vec![0, 4], vec![2, 2]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_chunk_larger_than_dimension() {
        let err = EncoderConfig::new(DataType::FloatArray, CompressionType::PforDelta2d, 1.0, 0.0, vec![4, 4], vec![8, 2]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_incompatible_compression_pairing() {
        let err = EncoderConfig::new(DataType::Int8Array, CompressionType::PforDelta2dInt16, 1.0, 0.0, vec![4], vec![2]);
        assert!(err.is_err());
    }

    #[test]
    fn compressed_chunk_decodes_back_through_decoder() {
        let config = EncoderConfig::new(DataType::FloatArray, CompressionType::PforDelta2d, 1000.0, 0.0, vec![4, 4], vec![4, 4]).unwrap();
        let values: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
        let source: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();

        let geom = Params {
            dimensions: &[4, 4],
            chunks: &[4, 4],
            read_offset: &[0, 0],
            read_count: &[4, 4],
            cube_offset: &[0, 0],
            cube_dimensions: &[4, 4],
        };
        let mut compressed = Vec::new();
        let written = gather_and_compress(&config, &geom, 0, &source, &mut compressed).unwrap();
        assert_eq!(written, compressed.len());

        let mut out = vec![0u8; source.len()];
        crate::decoder::decode_and_scatter(
            config.data_type,
            config.compression_type,
            config.scale_factor,
            config.add_offset,
            &compressed,
            0,
            &geom,
            &mut out,
        )
        .unwrap();
        let decoded: Vec<f32> = out.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
        for (a, b) in values.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 0.01);
        }
    }

    #[test]
    fn buffer_bound_fits_worst_case_encode() {
        let config = EncoderConfig::new(DataType::Int32Array, CompressionType::PforDelta2d, 1.0, 0.0, vec![300], vec![300]).unwrap();
        let values: Vec<i32> = (0..300).map(|i| if i % 2 == 0 { i } else { -i }).collect();
        let source: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let geom = Params {
            dimensions: &[300],
            chunks: &[300],
            read_offset: &[0],
            read_count: &[300],
            cube_offset: &[0],
            cube_dimensions: &[300],
        };
        let mut compressed = Vec::new();
        gather_and_compress(&config, &geom, 0, &source, &mut compressed).unwrap();
        assert!(compressed.len() <= config.compressed_chunk_buffer_bound());
    }
}
