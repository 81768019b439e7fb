//! Shared chunk scatter/gather walker (`spec.md` §4.9).
//!
//! `_om_decoder_decode_chunk` and `om_encoder_compress_chunk` in the
//! original are two copies of the same coordinate-walking algorithm, one
//! reading from the chunk buffer into the output cube, the other the
//! reverse. This module factors the shared part — which elements of a
//! chunk a given read window touches, and how they map to offsets in the
//! chunk-local scratch buffer versus the destination cube buffer — into
//! one iterator both `encoder.rs` and `decoder.rs` drive.
//!
//! Per dimension (fastest-varying last, matching the source's
//! slowest-to-fastest `for i_forward` loops) three rolling multipliers
//! march in lockstep: one to pull a chunk's per-dimension index back out
//! of its flat `chunk_index`, one for strides into the chunk-local buffer,
//! one for strides into the cube buffer. A run of elements is linear
//! (copyable with a single `memcpy`-equivalent) only while every
//! dimension read in full lines up with both its chunk and its cube
//! extent; `ChunkWalk` yields the longest such run at a time.

/// Per-dimension shape the walker needs: this chunk's coordinate
/// decomposition is driven entirely by these five parallel slices.
pub struct Params<'a> {
    pub dimensions: &'a [u64],
    pub chunks: &'a [u64],
    pub read_offset: &'a [u64],
    pub read_count: &'a [u64],
    pub cube_offset: &'a [u64],
    pub cube_dimensions: &'a [u64],
}

fn divide_rounded_up(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

/// Shape of one chunk's intersection with the read window, independent of
/// where the walk currently is.
#[derive(Debug, Clone, Copy)]
pub struct ChunkShape {
    /// Total element count of the chunk's full (unclipped) extent —
    /// what the entropy coder and 2-D filter operate over.
    pub length_in_chunk: u64,
    /// Extent of the chunk along the fastest-varying dimension — the
    /// filter's row length.
    pub length_last: u64,
    /// The read window does not intersect this chunk at all.
    pub no_data: bool,
}

/// Walks the linear runs of one chunk that intersect the read window,
/// yielding `(chunk_offset, cube_offset, run_length)` triples in element
/// units (not bytes).
pub struct ChunkWalk<'a> {
    params: &'a Params<'a>,
    chunk_index: u64,
    d: u64,
    q: u64,
    run_len: u64,
    finished: bool,
}

/// Computes a chunk's shape and a ready-to-drive walker over it. The
/// walker still needs its first `next()` call to yield the first run;
/// `no_data` short-circuits that to `None` immediately.
pub fn plan<'a>(params: &'a Params<'a>, chunk_index: u64) -> (ChunkShape, ChunkWalk<'a>) {
    let n = params.dimensions.len();
    let mut rolling_multiply = 1u64;
    let mut rolling_multiply_chunk_len = 1u64;
    let mut rolling_multiply_cube = 1u64;

    let mut d = 0u64;
    let mut q = 0u64;
    let mut linear_read_count = 1u64;
    let mut linear_read = true;
    let mut length_last = 0u64;
    let mut no_data = false;

    for i_forward in 0..n {
        let i = n - i_forward - 1;
        let dimension = params.dimensions[i];
        let chunk = params.chunks[i];
        let read_offset = params.read_offset[i];
        let read_count = params.read_count[i];
        let cube_offset = params.cube_offset[i];
        let cube_dimension = params.cube_dimensions[i];

        let n_chunks_in_dim = divide_rounded_up(dimension, chunk);
        let c0 = (chunk_index / rolling_multiply) % n_chunks_in_dim;
        let chunk_global0_start = c0 * chunk;
        let chunk_global0_end = ((c0 + 1) * chunk).min(dimension);
        let length0 = chunk_global0_end - chunk_global0_start;
        let clamped_global0_start = chunk_global0_start.max(read_offset);
        let clamped_global0_end = chunk_global0_end.min(read_offset + read_count);
        let clamped_local0_start = clamped_global0_start - c0 * chunk;
        let length_read = clamped_global0_end.saturating_sub(clamped_global0_start);

        if read_offset + read_count <= chunk_global0_start || read_offset >= chunk_global0_end {
            no_data = true;
        }

        if i == n - 1 {
            length_last = length0;
        }

        let d0 = clamped_local0_start;
        // `chunk_global0_start` can be less than `read_offset` (the window
        // starts partway into this chunk), so `chunk_global0_start -
        // read_offset` underflows on its own; adding `d0` first keeps every
        // intermediate value non-negative since `chunk_global0_start + d0
        // == clamped_global0_start >= read_offset`.
        let t0 = chunk_global0_start + d0 - read_offset;
        let q0 = t0 + cube_offset;

        d += rolling_multiply_chunk_len * d0;
        q += rolling_multiply_cube * q0;

        if i == n - 1 && !(length_read == length0 && read_count == length0 && cube_dimension == length0) {
            linear_read_count = length_read;
            linear_read = false;
        }
        if linear_read && length_read == length0 && read_count == length0 && cube_dimension == length0 {
            linear_read_count *= length0;
        } else {
            linear_read = false;
        }

        rolling_multiply *= n_chunks_in_dim;
        rolling_multiply_cube *= cube_dimension;
        rolling_multiply_chunk_len *= length0;
    }

    let shape = ChunkShape {
        length_in_chunk: rolling_multiply_chunk_len,
        length_last,
        no_data,
    };
    let walk = ChunkWalk {
        params,
        chunk_index,
        d,
        q,
        run_len: linear_read_count,
        finished: no_data,
    };
    (shape, walk)
}

impl<'a> Iterator for ChunkWalk<'a> {
    /// `(chunk_offset, cube_offset, run_length)`, all in elements.
    type Item = (u64, u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = (self.d, self.q, self.run_len);

        self.q += self.run_len - 1;
        self.d += self.run_len - 1;

        let n = self.params.dimensions.len();
        let mut rolling_multiply = 1u64;
        let mut rolling_multiply_cube = 1u64;
        let mut rolling_multiply_chunk_len = 1u64;
        self.run_len = 1;
        let mut linear_read = true;

        for i_forward in 0..n {
            let i = n - i_forward - 1;
            let dimension = self.params.dimensions[i];
            let chunk = self.params.chunks[i];
            let read_offset = self.params.read_offset[i];
            let read_count = self.params.read_count[i];
            let cube_dimension = self.params.cube_dimensions[i];

            let n_chunks_in_dim = divide_rounded_up(dimension, chunk);
            let c0 = (self.chunk_index / rolling_multiply) % n_chunks_in_dim;
            let chunk_global0_start = c0 * chunk;
            let chunk_global0_end = ((c0 + 1) * chunk).min(dimension);
            let length0 = chunk_global0_end - chunk_global0_start;
            let clamped_global0_start = chunk_global0_start.max(read_offset);
            let clamped_global0_end = chunk_global0_end.min(read_offset + read_count);
            let clamped_local0_end = clamped_global0_end - chunk_global0_start;
            let length_read = clamped_global0_end.saturating_sub(clamped_global0_start);

            self.d += rolling_multiply_chunk_len;
            self.q += rolling_multiply_cube;

            if i == n - 1 && !(length_read == length0 && read_count == length0 && cube_dimension == length0) {
                self.run_len = length_read;
                linear_read = false;
            }
            if linear_read && length_read == length0 && read_count == length0 && cube_dimension == length0 {
                self.run_len *= length0;
            } else {
                linear_read = false;
            }

            let d0 = (self.d / rolling_multiply_chunk_len) % length0;
            if d0 != clamped_local0_end && d0 != 0 {
                break;
            }

            // Unlike `t0` in `plan`, `d0`/`q0` here never mix two
            // independent absolute coordinates: `self.d`/`self.q` are built
            // up purely through multiplication by the rolling strides, so
            // this digit is always >= `length_read * rolling_multiply_*`
            // when we reach here and the subtraction can't underflow.
            self.d -= length_read * rolling_multiply_chunk_len;
            self.q -= length_read * rolling_multiply_cube;

            rolling_multiply *= n_chunks_in_dim;
            rolling_multiply_cube *= cube_dimension;
            rolling_multiply_chunk_len *= length0;

            if i == 0 {
                self.finished = true;
                break;
            }
        }

        Some(result)
    }
}
