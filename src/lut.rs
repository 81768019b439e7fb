//! LUT (look-up table) codec (`spec.md` §4.6).
//!
//! The LUT is the monotone non-decreasing sequence of `n_chunks + 1`
//! byte offsets bounding each chunk's compressed payload. Legacy layout
//! stores it as a flat array of raw little-endian `u64`s. V3 layout
//! partitions it into fixed 64-entry blocks (`LUT_CHUNK_COUNT` in
//! `om_common.h`), each independently bitpacked through the same entropy
//! coder as chunk data, then padded to a uniform per-block length so a
//! block's file offset is a cheap multiply rather than a scan.
//!
//! Grounded on `om_encoder_lut_buffer_size`/`om_encoder_compress_lut` in
//! `om_encoder.c`: first probe every block's encoded length to find the
//! max, then re-encode padding every block out to that length with zero
//! fill, plus a 32-entry tail margin for the probing pass's own scratch
//! space.

use byteorder::{ByteOrder, LittleEndian as LE};

use crate::codec::{self, ElemWidth, Signedness};
use crate::errors::{OmFileError, Result};

/// Entries per independently-bitpacked v3 LUT block.
pub const LUT_CHUNK_COUNT: usize = 64;

fn block_count(entry_count: usize) -> usize {
    (entry_count + LUT_CHUNK_COUNT - 1) / LUT_CHUNK_COUNT
}

/// Upper bound, in bytes, of the scratch buffer [`compress`] needs for
/// `lut`. Includes the tail margin the probing pass uses.
pub fn buffer_size(lut: &[u64]) -> usize {
    let n_blocks = block_count(lut.len());
    if n_blocks == 0 {
        return 32 * 8;
    }
    let mut max_len = 0usize;
    for block in lut.chunks(LUT_CHUNK_COUNT) {
        max_len = max_len.max(encode_block(block).len());
    }
    max_len * n_blocks + 32 * 8
}

fn encode_block(block: &[u64]) -> Vec<u8> {
    let data: Vec<u8> = block.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let mut out = Vec::new();
    codec::encode(Signedness::Unsigned, ElemWidth::B8, &data, &mut out);
    out
}

/// Encodes `lut` into `dst` (sized at least [`buffer_size`]`(lut)`), one
/// uniformly-padded block at a time. Returns the number of meaningful
/// bytes written — the value to store as the array variable's `lut_size`.
/// Bytes of `dst` beyond the returned length are untouched scratch space.
pub fn compress(lut: &[u64], dst: &mut [u8]) -> usize {
    let n_blocks = block_count(lut.len());
    if n_blocks == 0 {
        return 0;
    }
    let lut_size = dst.len() - 32 * 8;
    let chunk_length = lut_size / n_blocks;
    for (i, block) in lut.chunks(LUT_CHUNK_COUNT).enumerate() {
        let encoded = encode_block(block);
        let start = i * chunk_length;
        dst[start..start + encoded.len()].copy_from_slice(&encoded);
        for b in &mut dst[start + encoded.len()..start + chunk_length] {
            *b = 0;
        }
    }
    chunk_length * n_blocks
}

/// Decodes `entry_count` LUT entries from `input` (exactly `lut_size`
/// bytes, as recorded on the array variable).
pub fn decompress(input: &[u8], entry_count: usize) -> Result<Vec<u64>> {
    let n_blocks = block_count(entry_count);
    if n_blocks == 0 {
        return Ok(Vec::new());
    }
    if input.len() % n_blocks != 0 {
        return Err(OmFileError::OutOfBoundRead);
    }
    let chunk_length = input.len() / n_blocks;
    let mut out = Vec::with_capacity(entry_count);
    for i in 0..n_blocks {
        let block_entries = LUT_CHUNK_COUNT.min(entry_count - i * LUT_CHUNK_COUNT);
        let block_bytes = input
            .get(i * chunk_length..(i + 1) * chunk_length)
            .ok_or(OmFileError::OutOfBoundRead)?;
        let mut decoded = vec![0u8; block_entries * 8];
        codec::decode(Signedness::Unsigned, ElemWidth::B8, block_bytes, block_entries, &mut decoded)?;
        out.extend(decoded.chunks_exact(8).map(LE::read_u64));
    }
    Ok(out)
}

/// Reads a legacy flat LUT: `entry_count` raw little-endian `u64`s.
pub fn read_legacy(buf: &[u8], entry_count: usize) -> Result<Vec<u64>> {
    let region = buf
        .get(..entry_count * 8)
        .ok_or(OmFileError::OutOfBoundRead)?;
    Ok(region.chunks_exact(8).map(LE::read_u64).collect())
}

/// Writes a legacy flat LUT as raw little-endian `u64`s.
pub fn write_legacy(lut: &[u64], dst: &mut [u8]) {
    for (i, v) in lut.iter().enumerate() {
        LE::write_u64(&mut dst[i * 8..i * 8 + 8], *v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_round_trip() {
        let lut = vec![0u64, 40, 90, 200];
        let mut buf = vec![0u8; lut.len() * 8];
        write_legacy(&lut, &mut buf);
        assert_eq!(read_legacy(&buf, lut.len()).unwrap(), lut);
    }

    #[test]
    fn v3_round_trip_single_block() {
        let lut: Vec<u64> = (0..10).map(|i| i * 4096).collect();
        let mut dst = vec![0u8; buffer_size(&lut)];
        let lut_size = compress(&lut, &mut dst);
        let decoded = decompress(&dst[..lut_size], lut.len()).unwrap();
        assert_eq!(decoded, lut);
    }

    #[test]
    fn v3_round_trip_multi_block_uniform_length() {
        // 200 entries spans 4 blocks of 64, exercising the padding path.
        let lut: Vec<u64> = (0..200).map(|i| (i as u64) * 1337).collect();
        let mut dst = vec![0u8; buffer_size(&lut)];
        let lut_size = compress(&lut, &mut dst);
        assert_eq!(lut_size % block_count(lut.len()), 0);
        let decoded = decompress(&dst[..lut_size], lut.len()).unwrap();
        assert_eq!(decoded, lut);
    }

    #[test]
    fn empty_lut_round_trips() {
        let lut: Vec<u64> = vec![];
        let mut dst = vec![0u8; buffer_size(&lut)];
        let lut_size = compress(&lut, &mut dst);
        assert_eq!(lut_size, 0);
        assert_eq!(decompress(&dst[..0], 0).unwrap(), Vec::<u64>::new());
    }
}
