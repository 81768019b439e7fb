//! End-to-end encode/decode scenarios (`spec.md` §8).

use omcube::decoder::decode_and_scatter;
use omcube::encoder::{gather_and_compress, EncoderConfig};
use omcube::geometry::Params;
use omcube::planner;
use omcube::types::{CompressionType, DataType};

/// Compresses every chunk of `source` (laid out row-major per `dimensions`)
/// independently, returning the concatenated chunk bytes plus the byte
/// offset each chunk starts at (an `n_chunks + 1` boundary list, like the
/// file format's own LUT).
fn compress_whole_array(config: &EncoderConfig, source: &[u8]) -> (Vec<u8>, Vec<u64>) {
    let n = config.dimensions.len();
    let read_offset = vec![0u64; n];
    let geom = Params {
        dimensions: &config.dimensions,
        chunks: &config.chunks,
        read_offset: &read_offset,
        read_count: &config.dimensions,
        cube_offset: &read_offset,
        cube_dimensions: &config.dimensions,
    };
    let mut compressed = Vec::new();
    let mut boundaries = vec![0u64];
    for chunk_index in 0..config.number_of_chunks() {
        gather_and_compress(config, &geom, chunk_index, source, &mut compressed).unwrap();
        boundaries.push(compressed.len() as u64);
    }
    (compressed, boundaries)
}

fn decode_into(config: &EncoderConfig, compressed: &[u8], boundaries: &[u64], read_offset: &[u64], read_count: &[u64], cube_dimensions: &[u64]) -> Vec<u8> {
    let geom = Params {
        dimensions: &config.dimensions,
        chunks: &config.chunks,
        read_offset,
        read_count,
        cube_offset: &vec![0u64; read_offset.len()],
        cube_dimensions,
    };
    let elem_width = config.data_type.bytes_per_element().unwrap() as usize;
    let out_len = cube_dimensions.iter().product::<u64>() as usize * elem_width;
    let mut out = vec![0u8; out_len];

    let range = planner::initial_chunk_range(&config.dimensions, &config.chunks, read_offset, read_count);
    for chunk_index in range.lower..range.upper {
        let start = boundaries[chunk_index as usize] as usize;
        let end = boundaries[chunk_index as usize + 1] as usize;
        decode_and_scatter(
            config.data_type,
            config.compression_type,
            config.scale_factor,
            config.add_offset,
            &compressed[start..end],
            chunk_index,
            &geom,
            &mut out,
        )
        .unwrap();
    }
    out
}

#[test]
fn scenario_1_5x5_int16_scaled_round_trip() {
    let config = EncoderConfig::new(DataType::FloatArray, CompressionType::PforDelta2dInt16, 20.0, 0.0, vec![5, 5], vec![2, 2]).unwrap();
    let values: Vec<f32> = (0..25).map(|i| i as f32).collect();
    let source: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();

    let (compressed, boundaries) = compress_whole_array(&config, &source);
    assert!(compressed.len() > 0);

    let out = decode_into(&config, &compressed, &boundaries, &[0, 0], &[5, 5], &[5, 5]);
    let decoded: Vec<f32> = out.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
    for (a, b) in values.iter().zip(decoded.iter()) {
        assert!((a - b).abs() < 0.05, "{} vs {}", a, b);
    }
}

#[test]
fn scenario_2_1000_float_xor_slice_decode_is_exact() {
    let config = EncoderConfig::new(DataType::FloatArray, CompressionType::FpxXor2d, 1.0, 0.0, vec![1000], vec![100]).unwrap();
    let values: Vec<f32> = (0..1000).map(|i| ((i * 7919) % 10007) as f32 * 0.001 - 5.0).collect();
    let source: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();

    let (compressed, boundaries) = compress_whole_array(&config, &source);

    let offset = 237u64;
    let len = 418u64;
    let out = decode_into(&config, &compressed, &boundaries, &[offset], &[len], &[len]);
    let decoded: Vec<f32> = out.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
    assert_eq!(decoded, &values[offset as usize..(offset + len) as usize]);
}

#[test]
fn scenario_4_legacy_v1_round_trip() {
    use byteorder::{ByteOrder, LittleEndian as LE};
    use omcube::planner::ArrayInfo;
    use omcube::variable::LEGACY_HEADER_SIZE;

    let dims = vec![4u64, 4];
    let chunks = vec![2u64, 2];
    let config = EncoderConfig::new(DataType::FloatArray, CompressionType::PforDelta2dInt16, 10.0, 0.0, dims.clone(), chunks.clone()).unwrap();
    let values: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
    let source: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let (compressed, boundaries) = compress_whole_array(&config, &source);

    let mut header = vec![0u8; LEGACY_HEADER_SIZE];
    header[0] = b'O';
    header[1] = b'M';
    header[2] = 1; // v1: compression is implicit
    LE::write_f32(&mut header[4..8], 10.0);
    LE::write_u64(&mut header[8..16], dims[0]);
    LE::write_u64(&mut header[16..24], dims[1]);
    LE::write_u64(&mut header[24..32], chunks[0]);
    LE::write_u64(&mut header[32..40], chunks[1]);

    let parsed = omcube::variable::Variable::parse(&header).unwrap();
    assert_eq!(parsed.compression_type(), CompressionType::PforDelta2dInt16);
    assert_eq!(parsed.dimensions().unwrap(), dims);

    let info = ArrayInfo::legacy(dims.clone(), chunks.clone(), LEGACY_HEADER_SIZE as u64);
    assert_eq!(info.data_base, LEGACY_HEADER_SIZE as u64 + info.number_of_chunks * 8);

    // n_chunks raw end-offsets, relative to data_base (legacy LUT convention).
    let lut: Vec<u64> = boundaries[1..].to_vec();
    let mut lut_buf = vec![0u8; lut.len() * 8];
    omcube::lut::write_legacy(&lut, &mut lut_buf);
    assert_eq!(omcube::lut::read_legacy(&lut_buf, lut.len()).unwrap(), lut);

    let out = decode_into(&config, &compressed, &boundaries, &[0, 0], &dims, &dims);
    let decoded: Vec<f32> = out.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
    for (a, b) in values.iter().zip(decoded.iter()) {
        assert!((a - b).abs() < 0.05);
    }
}

#[test]
fn scenario_5_scalar_string_size() {
    use omcube::types::DataType;
    use omcube::variable::{scalar_size, SCALAR_HEADER_SIZE};

    let size = scalar_size(4, 0, DataType::String, 6).unwrap();
    assert_eq!(size, SCALAR_HEADER_SIZE + 0 + 8 + 6 + 4);
}

#[test]
fn scenario_6_truncated_lut_is_out_of_bound_read() {
    let lut: Vec<u64> = (0..80).map(|i| i * 4096).collect();
    let mut dst = vec![0u8; omcube::lut::buffer_size(&lut)];
    let lut_size = omcube::lut::compress(&lut, &mut dst);
    let truncated = &dst[..lut_size - 1];
    assert!(omcube::lut::decompress(truncated, lut.len()).is_err());
}

#[test]
fn sub_cube_equivalence() {
    let config = EncoderConfig::new(DataType::FloatArray, CompressionType::PforDelta2d, 1.0, 0.0, vec![6, 7], vec![3, 4]).unwrap();
    let values: Vec<f32> = (0..42).map(|i| i as f32 - 10.0).collect();
    let source: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let (compressed, boundaries) = compress_whole_array(&config, &source);

    let whole = decode_into(&config, &compressed, &boundaries, &[0, 0], &[6, 7], &[6, 7]);

    // Split the same read into two row-bands and compare against the whole.
    let top = decode_into(&config, &compressed, &boundaries, &[0, 0], &[3, 7], &[3, 7]);
    let bottom = decode_into(&config, &compressed, &boundaries, &[3, 0], &[3, 7], &[3, 7]);

    let whole_f: Vec<f32> = whole.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
    let mut stitched = Vec::new();
    stitched.extend(top.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())));
    stitched.extend(bottom.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())));
    assert_eq!(whole_f, stitched);
}

#[test]
fn lossless_integer_round_trip_is_byte_exact() {
    let config = EncoderConfig::new(DataType::Int32Array, CompressionType::PforDelta2d, 1.0, 0.0, vec![50], vec![16]).unwrap();
    let values: Vec<i32> = (0..50).map(|i| (i * i - 625) as i32).collect();
    let source: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let (compressed, boundaries) = compress_whole_array(&config, &source);
    let out = decode_into(&config, &compressed, &boundaries, &[0], &[50], &[50]);
    assert_eq!(out, source);
}
