//! Scaling / type conversion (`spec.md` §4.4).
//!
//! Transcribed from the `om_common_copy_*` family in
//! `examples/original_source/c/src/om_common.c`: every lossy compression
//! mode first maps the source `f32`/`f64` element to a scaled integer (or
//! back), using a `scale_factor`/`add_offset` pair and a NaN sentinel.
//!
//! Open Question fix (`spec.md` §9): the original reserves `TYPE_MAX` for
//! NaN but clamps finite values into `[TYPE_MIN, TYPE_MAX]`, so a finite
//! value that rounds to `TYPE_MAX` is indistinguishable from NaN on
//! decode. Here finite values clamp to `[TYPE_MIN, TYPE_MAX - 1]` instead,
//! keeping `TYPE_MAX` exclusively for the NaN sentinel.

/// Encodes a single `f32` into a scaled `i16`, log-free.
pub fn encode_f32_to_i16(value: f32, scale_factor: f32, add_offset: f32) -> i16 {
    if value.is_nan() {
        return i16::MAX;
    }
    let scaled = value * scale_factor + add_offset;
    clamp_round_i16(scaled)
}

/// Decodes a scaled `i16` back into an `f32`.
pub fn decode_i16_to_f32(value: i16, scale_factor: f32, add_offset: f32) -> f32 {
    if value == i16::MAX {
        return f32::NAN;
    }
    value as f32 / scale_factor - add_offset
}

/// `log10(1 + x)` variant used by `PforDelta2dInt16Logarithmic`. Takes
/// `_add_offset` only to keep the same call shape as the other scalers;
/// `om_common_copy_float_to_int16_log10` has no offset term, so it's unused.
pub fn encode_f32_to_i16_log10(value: f32, scale_factor: f32, _add_offset: f32) -> i16 {
    if value.is_nan() {
        return i16::MAX;
    }
    let scaled = (1.0 + value).log10() * scale_factor;
    clamp_round_i16(scaled)
}

pub fn decode_i16_to_f32_log10(value: i16, scale_factor: f32, _add_offset: f32) -> f32 {
    if value == i16::MAX {
        return f32::NAN;
    }
    10f32.powf(value as f32 / scale_factor) - 1.0
}

/// Encodes a single `f32`/`f64` into a scaled native-width signed integer,
/// used by lossless `PforDelta2d` on floating-point arrays.
pub fn encode_f32_to_i32(value: f32, scale_factor: f32, add_offset: f32) -> i32 {
    if value.is_nan() {
        return i32::MAX;
    }
    clamp_round_i32((value * scale_factor + add_offset) as f64)
}

pub fn decode_i32_to_f32(value: i32, scale_factor: f32, add_offset: f32) -> f32 {
    if value == i32::MAX {
        return f32::NAN;
    }
    value as f32 / scale_factor - add_offset
}

pub fn encode_f64_to_i64(value: f64, scale_factor: f64, add_offset: f64) -> i64 {
    if value.is_nan() {
        return i64::MAX;
    }
    clamp_round_i64(value * scale_factor + add_offset)
}

pub fn decode_i64_to_f64(value: i64, scale_factor: f64, add_offset: f64) -> f64 {
    if value == i64::MAX {
        return f64::NAN;
    }
    value as f64 / scale_factor - add_offset
}

fn clamp_round_i16(scaled: f32) -> i16 {
    let clamped = scaled.clamp(i16::MIN as f32, (i16::MAX - 1) as f32);
    clamped.round() as i16
}

fn clamp_round_i32(scaled: f64) -> i32 {
    let clamped = scaled.clamp(i32::MIN as f64, (i32::MAX - 1) as f64);
    clamped.round() as i32
}

fn clamp_round_i64(scaled: f64) -> i64 {
    // i64::MAX doesn't round-trip exactly through f64; clamp against the
    // largest f64 that still converts back to a value < i64::MAX.
    let upper = (i64::MAX - 1) as f64;
    let clamped = scaled.clamp(i64::MIN as f64, upper);
    clamped.round() as i64
}
