//! Chunk-range enumeration and I/O coalescing (`spec.md` §4.7).
//!
//! Transcribed from `om_decoder_init`/`om_decoder_init_index_read`/
//! `_om_decoder_next_chunk_position`/`om_decoder_next_index_read`/
//! `om_decoder_next_data_read` in `om_decoder.c`. The planner never
//! touches file bytes itself — it enumerates the chunk indices a read
//! touches and emits coalesced byte-range *fetch descriptors*; the caller
//! fetches those ranges and feeds the results to [`decode_boundaries`] and
//! on into `decoder.rs`.
//!
//! One simplification versus the source: legacy's implicit "chunk 0
//! starts at offset 0, not stored" special case is resolved once, in
//! [`decode_boundaries`], into a uniform `boundaries` slice (`boundaries[k]`
//! = start offset of chunk `base + k`). Downstream of that, index-read and
//! data-read coalescing share one code path regardless of layout.

use crate::errors::{OmFileError, Result};
use crate::lut::{self, LUT_CHUNK_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub lower: u64,
    pub upper: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct PlannerConfig {
    pub io_size_merge: u64,
    pub io_size_max: u64,
}

fn divide_rounded_up(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

pub fn chunk_count(dimensions: &[u64], chunks: &[u64]) -> u64 {
    dimensions
        .iter()
        .zip(chunks)
        .map(|(&d, &c)| divide_rounded_up(d, c))
        .product()
}

/// Geometry needed to drive both planners, independent of the specific
/// variable layout it came from.
pub struct ArrayInfo {
    pub dimensions: Vec<u64>,
    pub chunks: Vec<u64>,
    pub number_of_chunks: u64,
    /// File offset the LUT begins at (`lut_start` in the source).
    pub lut_start: u64,
    /// `0` for legacy (flat raw-`u64` LUT); the per-block compressed byte
    /// length for v3.
    pub lut_chunk_length: u64,
    /// File offset chunk-data payloads begin at. For legacy this is
    /// `header_size + number_of_chunks * 8`; for v3, LUT entries are
    /// already file-absolute, so this is `0`.
    pub data_base: u64,
}

impl ArrayInfo {
    pub fn legacy(dimensions: Vec<u64>, chunks: Vec<u64>, header_size: u64) -> Self {
        let number_of_chunks = chunk_count(&dimensions, &chunks);
        ArrayInfo {
            dimensions,
            chunks,
            number_of_chunks,
            lut_start: header_size,
            lut_chunk_length: 0,
            data_base: header_size + number_of_chunks * 8,
        }
    }

    /// `lut_size`/`lut_offset` are the array variable's recorded fields.
    pub fn v3(dimensions: Vec<u64>, chunks: Vec<u64>, lut_size: u64, lut_offset: u64) -> Self {
        let number_of_chunks = chunk_count(&dimensions, &chunks);
        let n_blocks = divide_rounded_up(number_of_chunks + 1, LUT_CHUNK_COUNT as u64);
        let lut_chunk_length = if n_blocks == 0 { 0 } else { lut_size / n_blocks };
        ArrayInfo {
            dimensions,
            chunks,
            number_of_chunks,
            lut_start: lut_offset,
            lut_chunk_length,
            data_base: 0,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.lut_chunk_length == 0
    }
}

/// Initial chunk range a read window touches, mirroring
/// `om_decoder_init_index_read`'s Horner-style accumulation.
pub fn initial_chunk_range(dimensions: &[u64], chunks: &[u64], read_offset: &[u64], read_count: &[u64]) -> Range {
    let mut chunk_start = 0u64;
    let mut chunk_end = 1u64;
    for i in 0..dimensions.len() {
        let dimension = dimensions[i];
        let chunk = chunks[i];
        let lower = read_offset[i] / chunk;
        let upper = divide_rounded_up(read_offset[i] + read_count[i], chunk);
        let count_here = upper - lower;
        let n_chunks_in_dim = divide_rounded_up(dimension, chunk);

        chunk_start = chunk_start * n_chunks_in_dim + lower;
        chunk_end = if read_count[i] == dimension {
            chunk_end * n_chunks_in_dim
        } else {
            chunk_start + count_here
        };
    }
    Range { lower: chunk_start, upper: chunk_end }
}

/// Advances `range` to the next maximal linearly-readable run of chunk
/// indices. Returns `false` once the outermost dimension has overflowed
/// (no more chunks left).
fn next_chunk_position(dimensions: &[u64], chunks: &[u64], read_offset: &[u64], read_count: &[u64], range: &mut Range) -> bool {
    let n = dimensions.len();
    let mut rolling_multiply = 1u64;
    let mut linear_read_count = 1u64;
    let mut linear_read = true;

    for i_forward in 0..n {
        let i = n - i_forward - 1;
        let dimension = dimensions[i];
        let chunk = chunks[i];
        let lower = read_offset[i] / chunk;
        let upper = divide_rounded_up(read_offset[i] + read_count[i], chunk);
        let count_here = upper - lower;
        let n_chunks_in_dim = divide_rounded_up(dimension, chunk);

        range.lower += rolling_multiply;

        if i == n - 1 && dimension != read_count[i] {
            linear_read_count = count_here;
            linear_read = false;
        }
        if linear_read && dimension == read_count[i] {
            linear_read_count *= n_chunks_in_dim;
        } else {
            linear_read = false;
        }

        let c0 = (range.lower / rolling_multiply) % n_chunks_in_dim;
        if c0 != upper && c0 != 0 {
            range.upper = range.lower + linear_read_count;
            return true;
        }

        range.lower -= count_here * rolling_multiply;
        rolling_multiply *= n_chunks_in_dim;

        if i == 0 {
            range.upper = range.lower;
            return false;
        }
    }
    range.upper = range.lower + linear_read_count;
    true
}

/// One coalesced LUT byte range to fetch, plus the bookkeeping
/// [`decode_boundaries`] and [`DataReadPlanner`] need to interpret it.
#[derive(Debug, Clone, Copy)]
pub struct IndexReadPlan {
    pub offset: u64,
    pub count: u64,
    /// Chunk indices whose boundary this LUT fetch actually covers,
    /// `[lower, upper)`.
    pub index_range: Range,
    /// The full linearly-readable run this batch started from — may
    /// extend past `index_range.upper`; the remainder is covered by
    /// subsequent `IndexReadPlan`s.
    pub run_range: Range,
    pub(crate) lut_chunk_element_count: u64,
    pub(crate) lut_chunk_length: u64,
    pub(crate) align_offset: u64,
}

pub struct IndexReadPlanner<'a> {
    info: &'a ArrayInfo,
    read_offset: &'a [u64],
    read_count: &'a [u64],
    config: PlannerConfig,
    next_chunk: Range,
}

impl<'a> IndexReadPlanner<'a> {
    pub fn new(info: &'a ArrayInfo, read_offset: &'a [u64], read_count: &'a [u64], config: PlannerConfig) -> Self {
        let next_chunk = initial_chunk_range(&info.dimensions, &info.chunks, read_offset, read_count);
        IndexReadPlanner { info, read_offset, read_count, config, next_chunk }
    }
}

impl<'a> Iterator for IndexReadPlanner<'a> {
    type Item = IndexReadPlan;

    fn next(&mut self) -> Option<IndexReadPlan> {
        if self.next_chunk.lower >= self.next_chunk.upper {
            return None;
        }

        let run_range = self.next_chunk;
        let index_range_lower = self.next_chunk.lower;
        let mut chunk_index = self.next_chunk.lower;

        let is_v3 = self.info.lut_chunk_length > 1;
        let lut_chunk_element_count = if is_v3 { LUT_CHUNK_COUNT as u64 } else { 1 };
        let lut_chunk_length = if is_v3 { self.info.lut_chunk_length } else { 8 };
        let align_offset = if is_v3 || index_range_lower == 0 { 0 } else { 1 };
        let end_align_offset = if is_v3 { 1 } else { 0 };

        let read_start = (self.next_chunk.lower - align_offset) / lut_chunk_element_count * lut_chunk_length;

        loop {
            let max_read = self.config.io_size_max / lut_chunk_length * lut_chunk_element_count;
            let next_chunk_count = self.next_chunk.upper - self.next_chunk.lower;
            let next_increment = 1.max(max_read.saturating_sub(1).min(next_chunk_count.saturating_sub(1)));

            if self.next_chunk.lower + next_increment >= self.next_chunk.upper {
                if !next_chunk_position(&self.info.dimensions, &self.info.chunks, self.read_offset, self.read_count, &mut self.next_chunk) {
                    break;
                }
                let read_end_next = (self.next_chunk.lower + end_align_offset) / lut_chunk_element_count * lut_chunk_length;
                let read_start_next = read_end_next - lut_chunk_length;
                let read_end_previous = chunk_index / lut_chunk_element_count * lut_chunk_length;

                if read_end_next - read_start > self.config.io_size_max {
                    break;
                }
                if read_start_next - read_end_previous > self.config.io_size_merge {
                    break;
                }
            } else {
                let read_end_next = (self.next_chunk.lower + next_increment + end_align_offset) / lut_chunk_element_count * lut_chunk_length;
                if read_end_next - read_start > self.config.io_size_max {
                    self.next_chunk.lower += 1;
                    break;
                }
                self.next_chunk.lower += next_increment;
            }
            chunk_index = self.next_chunk.lower;
        }

        let read_end = ((chunk_index + end_align_offset) / lut_chunk_element_count + 1) * lut_chunk_length;

        Some(IndexReadPlan {
            offset: self.info.lut_start + read_start,
            count: read_end - read_start,
            index_range: Range { lower: index_range_lower, upper: chunk_index + 1 },
            run_range,
            lut_chunk_element_count,
            lut_chunk_length,
            align_offset,
        })
    }
}

/// Turns the bytes fetched for `plan` into a boundary-offset slice:
/// `boundaries[k]` is the start offset of chunk `plan.index_range.lower +
/// k`, for `k` in `0..=(plan.index_range.upper - plan.index_range.lower)`.
pub fn decode_boundaries(plan: &IndexReadPlan, raw: &[u8], info: &ArrayInfo) -> Result<Vec<u64>> {
    if info.is_legacy() {
        let words = lut::read_legacy(raw, raw.len() / 8)?;
        if plan.align_offset == 0 {
            let mut boundaries = Vec::with_capacity(words.len() + 1);
            boundaries.push(0);
            boundaries.extend(words);
            Ok(boundaries)
        } else {
            Ok(words)
        }
    } else {
        let block_start = plan.index_range.lower / plan.lut_chunk_element_count * plan.lut_chunk_element_count;
        let n_blocks = raw.len() as u64 / plan.lut_chunk_length;
        let entries_total = (n_blocks * plan.lut_chunk_element_count).min(info.number_of_chunks + 1 - block_start);
        let full = lut::decompress(raw, entries_total as usize)?;
        let start = (plan.index_range.lower - block_start) as usize;
        let end = start + (plan.index_range.upper - plan.index_range.lower + 1) as usize;
        full.get(start..end).map(|s| s.to_vec()).ok_or(OmFileError::OutOfBoundRead)
    }
}

/// One coalesced chunk-data byte range to fetch.
#[derive(Debug, Clone, Copy)]
pub struct DataReadPlan {
    pub offset: u64,
    pub count: u64,
    pub chunk_range: Range,
}

/// Walks the chunk-data coalescing for one `IndexReadPlan`'s worth of
/// boundaries. Stops (returning `None`) once it reaches the boundary
/// slice's end — the caller advances to the next `IndexReadPlan` and
/// constructs a fresh `DataReadPlanner` from there.
pub struct DataReadPlanner<'a> {
    info: &'a ArrayInfo,
    read_offset: &'a [u64],
    read_count: &'a [u64],
    boundaries: &'a [u64],
    base: u64,
    index_range_upper: u64,
    config: PlannerConfig,
    next_chunk: Range,
}

impl<'a> DataReadPlanner<'a> {
    pub fn new(info: &'a ArrayInfo, read_offset: &'a [u64], read_count: &'a [u64], boundaries: &'a [u64], plan: &IndexReadPlan, config: PlannerConfig) -> Self {
        DataReadPlanner {
            info,
            read_offset,
            read_count,
            boundaries,
            base: plan.index_range.lower,
            index_range_upper: plan.index_range.upper,
            config,
            next_chunk: plan.run_range,
        }
    }

    fn boundary_at(&self, chunk: u64) -> Result<u64> {
        let idx = chunk.checked_sub(self.base).ok_or(OmFileError::OutOfBoundRead)? as usize;
        self.boundaries.get(idx).copied().ok_or(OmFileError::OutOfBoundRead)
    }
}

impl<'a> Iterator for DataReadPlanner<'a> {
    type Item = Result<DataReadPlan>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_chunk.lower >= self.next_chunk.upper {
            return None;
        }

        let range_lower = self.next_chunk.lower;
        let mut chunk_index = self.next_chunk.lower;
        let start_pos = match self.boundary_at(chunk_index) {
            Ok(v) => v,
            Err(e) => return Some(Err(e)),
        };
        let mut end_pos = start_pos;

        loop {
            let data_end_pos = match self.boundary_at(self.next_chunk.lower + 1) {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };

            if start_pos != end_pos && (data_end_pos - start_pos > self.config.io_size_max || data_end_pos - end_pos > self.config.io_size_merge) {
                break;
            }
            end_pos = data_end_pos;
            chunk_index = self.next_chunk.lower;

            if chunk_index + 1 >= self.next_chunk.upper {
                if !next_chunk_position(&self.info.dimensions, &self.info.chunks, self.read_offset, self.read_count, &mut self.next_chunk) {
                    break;
                }
            } else {
                self.next_chunk.lower += 1;
            }

            if self.next_chunk.lower >= self.index_range_upper {
                self.next_chunk = Range { lower: 0, upper: 0 };
                break;
            }
        }

        Some(Ok(DataReadPlan {
            offset: self.info.data_base + start_pos,
            count: end_pos - start_pos,
            chunk_range: Range { lower: range_lower, upper: chunk_index + 1 },
        }))
    }
}
