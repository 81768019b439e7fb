//! Core planner and chunk codec for a columnar, chunked file format for
//! multi-dimensional numeric arrays.
//!
//! An array is stored as independently-compressed fixed-size chunks in
//! lexicographic (slow-to-fast dimension) order, indexed by a monotone
//! look-up table of chunk byte offsets. This crate is the synchronous,
//! I/O-free core: it has no concept of a file handle. Callers own the
//! bytes — fetch whatever [`planner`] asks for, hand the result to
//! [`decoder`], and gather/compress with [`encoder`] on the way back in.
//!
//! # Example
//!
//! Compressing and decompressing one chunk end to end, entirely in memory:
//!
//! ```
//! use omcube::encoder::{gather_and_compress, EncoderConfig};
//! use omcube::decoder::decode_and_scatter;
//! use omcube::geometry::Params;
//! use omcube::types::{CompressionType, DataType};
//!
//! let config = EncoderConfig::new(
//!     DataType::FloatArray,
//!     CompressionType::PforDelta2d,
//!     1000.0,
//!     0.0,
//!     vec![4, 4],
//!     vec![4, 4],
//! )?;
//!
//! let values: Vec<f32> = (0..16).map(|i| i as f32 * 0.25).collect();
//! let source: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
//!
//! let geom = Params {
//!     dimensions: &[4, 4],
//!     chunks: &[4, 4],
//!     read_offset: &[0, 0],
//!     read_count: &[4, 4],
//!     cube_offset: &[0, 0],
//!     cube_dimensions: &[4, 4],
//! };
//!
//! let mut compressed = Vec::new();
//! gather_and_compress(&config, &geom, 0, &source, &mut compressed)?;
//!
//! let mut restored = vec![0u8; source.len()];
//! decode_and_scatter(
//!     config.data_type,
//!     config.compression_type,
//!     config.scale_factor,
//!     config.add_offset,
//!     &compressed,
//!     0,
//!     &geom,
//!     &mut restored,
//! )?;
//!
//! let decoded: Vec<f32> = restored
//!     .chunks_exact(4)
//!     .map(|b| f32::from_ne_bytes(b.try_into().unwrap()))
//!     .collect();
//! for (original, back) in values.iter().zip(decoded.iter()) {
//!     assert!((original - back).abs() < 0.01);
//! }
//! # Ok::<(), omcube::errors::OmFileError>(())
//! ```

pub mod chunkcodec;
pub mod codec;
pub mod decoder;
pub mod delta2d;
pub mod encoder;
pub mod errors;
pub mod geometry;
pub mod lut;
pub mod planner;
pub mod scale;
pub mod types;
pub mod variable;

pub use errors::{OmFileError, Result};
