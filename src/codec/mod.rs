//! Entropy codec adapter (`spec.md` §4.3).
//!
//! The original links against a C bitpacking library (`vp4`/`fp`, i.e.
//! TurboPFor) through FFI. No crate in the retrieved pack wraps it, and
//! fabricating a dependency is off the table, so the coder below is a
//! native safe-Rust bitpacker, grounded on `mwlon-pcodec`'s
//! `BitWriter`/`BitReader` bit-cursor style: a byte vector plus a sub-byte
//! bit offset, block-oriented rather than whole-buffer so a corrupt block
//! only costs that block's worth of data.
//!
//! Two variants, picked by the caller based on element signedness:
//! - `Signed`: residuals from the 2-D delta filter, zigzag-mapped to
//!   unsigned before bitpacking (`p4nzenc*` in the original).
//! - `Unsigned`: already-nonnegative sequences — unsigned integer arrays,
//!   XOR-filtered float bit patterns, and the LUT — bitpacked directly
//!   (`p4ndenc*`/`fpxenc*` in the original).

pub mod bitpack;

use crate::errors::Result;

/// Element width the codec should interpret a raw byte buffer as.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ElemWidth {
    B1,
    B2,
    B4,
    B8,
}

impl ElemWidth {
    pub fn byte_width(self) -> usize {
        match self {
            ElemWidth::B1 => 1,
            ElemWidth::B2 => 2,
            ElemWidth::B4 => 4,
            ElemWidth::B8 => 8,
        }
    }
}

/// Which transform is applied to an element before it is bitpacked.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Upper bound, in bytes, on the compressed size of `n` elements of
/// `elem_width` bytes each (`spec.md` §4.3's buffer-bound contract, kept
/// verbatim): one header byte per 256-element block, plus the elements
/// themselves at native width, plus a 32-element slack margin.
pub fn compressed_buffer_bound(n: usize, elem_width: usize) -> usize {
    (n + 255) / 256 + (n + 32) * elem_width
}

/// Encodes `data` (raw native-endian elements of `width`, `data.len() /
/// width.byte_width()` of them) into `out`, appending. Returns the number
/// of bytes appended.
pub fn encode(signedness: Signedness, width: ElemWidth, data: &[u8], out: &mut Vec<u8>) -> usize {
    let start = out.len();
    match signedness {
        Signedness::Signed => bitpack::encode_blocks(width, data, out, bitpack::read_signed_as_zigzag),
        Signedness::Unsigned => bitpack::encode_blocks(width, data, out, bitpack::read_unsigned),
    }
    out.len() - start
}

/// Decodes `count` elements of `width` from `input`, writing them
/// native-endian into `out` (`out.len() == count * width.byte_width()`).
/// Returns the number of bytes of `input` consumed.
pub fn decode(
    signedness: Signedness,
    width: ElemWidth,
    input: &[u8],
    count: usize,
    out: &mut [u8],
) -> Result<usize> {
    match signedness {
        Signedness::Signed => bitpack::decode_blocks(width, input, count, out, bitpack::write_signed_from_zigzag),
        Signedness::Unsigned => bitpack::decode_blocks(width, input, count, out, bitpack::write_unsigned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_round_trip() {
        let values: Vec<u32> = vec![0, 1, 2, 3, 1000, 1_000_000, 70, 0, 5];
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut out = Vec::new();
        encode(Signedness::Unsigned, ElemWidth::B4, &data, &mut out);
        assert!(out.len() <= compressed_buffer_bound(values.len(), 4));
        let mut decoded = vec![0u8; data.len()];
        decode(Signedness::Unsigned, ElemWidth::B4, &out, values.len(), &mut decoded).unwrap();
        let round: Vec<u32> = decoded
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(round, values);
    }

    #[test]
    fn signed_round_trip_with_negatives() {
        let values: Vec<i16> = vec![0, -1, 1, -32768, 32767, -5, 5, 0, -100];
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut out = Vec::new();
        encode(Signedness::Signed, ElemWidth::B2, &data, &mut out);
        let mut decoded = vec![0u8; data.len()];
        decode(Signedness::Signed, ElemWidth::B2, &out, values.len(), &mut decoded).unwrap();
        let round: Vec<i16> = decoded
            .chunks_exact(2)
            .map(|c| i16::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(round, values);
    }

    #[test]
    fn block_boundary_is_exercised() {
        // More than one 256-element block, forcing at least two header bytes.
        let values: Vec<i64> = (0..600).map(|i| (i * 37 - 9000) as i64).collect();
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let mut out = Vec::new();
        encode(Signedness::Signed, ElemWidth::B8, &data, &mut out);
        let mut decoded = vec![0u8; data.len()];
        decode(Signedness::Signed, ElemWidth::B8, &out, values.len(), &mut decoded).unwrap();
        let round: Vec<i64> = decoded
            .chunks_exact(8)
            .map(|c| i64::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(round, values);
    }

    #[test]
    fn truncated_input_is_out_of_bound_read() {
        let values: Vec<u8> = vec![1, 2, 3, 4, 5];
        let mut out = Vec::new();
        encode(Signedness::Unsigned, ElemWidth::B1, &values, &mut out);
        let mut decoded = vec![0u8; values.len()];
        let err = decode(Signedness::Unsigned, ElemWidth::B1, &out[..out.len() - 1], values.len(), &mut decoded);
        assert!(err.is_err());
    }
}
