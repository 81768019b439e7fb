//! 2-D delta / XOR filter (`spec.md` §4.2).
//!
//! A chunk is treated as a `rows x cols` matrix in row-major order, `cols`
//! being the chunk's extent along the fast (last) dimension. The forward
//! filter replaces every element but the first row with the difference (or,
//! for floats, the XOR) against the element directly above it; the inverse
//! filter undoes this with a column-wise running sum/XOR.
//!
//! The original (`delta2d.h`) exposes eight near-identical functions, one
//! per width. Here the per-width logic lives once, behind an explicit
//! `Width` parameter rather than being overloaded on pointer type — the
//! filter always operates on the same byte buffer the entropy codec
//! produced, in place.

/// Element width/kind the filter should interpret the buffer as.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Width {
    Int8,
    Int16,
    Int32,
    Int64,
    /// XOR filter over the raw bit pattern of an `f32`.
    XorF32,
    /// XOR filter over the raw bit pattern of an `f64`.
    XorF64,
}

impl Width {
    pub fn byte_width(self) -> usize {
        match self {
            Width::Int8 => 1,
            Width::Int16 => 2,
            Width::Int32 | Width::XorF32 => 4,
            Width::Int64 | Width::XorF64 => 8,
        }
    }
}

/// Applies the forward filter in place.
///
/// `buf` must hold exactly `rows * cols` elements of `width`'s byte width.
/// `rows == 0` or `cols == 0` is a no-op; the first row is always left
/// untouched.
pub fn encode(width: Width, rows: usize, cols: usize, buf: &mut [u8]) {
    assert_eq!(buf.len(), rows * cols * width.byte_width());
    if rows < 2 {
        return;
    }
    match width {
        Width::Int8 => encode_typed::<Int8Op>(rows, cols, buf),
        Width::Int16 => encode_typed::<Int16Op>(rows, cols, buf),
        Width::Int32 => encode_typed::<Int32Op>(rows, cols, buf),
        Width::Int64 => encode_typed::<Int64Op>(rows, cols, buf),
        Width::XorF32 => encode_typed::<XorF32Op>(rows, cols, buf),
        Width::XorF64 => encode_typed::<XorF64Op>(rows, cols, buf),
    }
}

/// Applies the inverse filter in place. See [`encode`] for buffer sizing.
pub fn decode(width: Width, rows: usize, cols: usize, buf: &mut [u8]) {
    assert_eq!(buf.len(), rows * cols * width.byte_width());
    if rows < 2 {
        return;
    }
    match width {
        Width::Int8 => decode_typed::<Int8Op>(rows, cols, buf),
        Width::Int16 => decode_typed::<Int16Op>(rows, cols, buf),
        Width::Int32 => decode_typed::<Int32Op>(rows, cols, buf),
        Width::Int64 => decode_typed::<Int64Op>(rows, cols, buf),
        Width::XorF32 => decode_typed::<XorF32Op>(rows, cols, buf),
        Width::XorF64 => decode_typed::<XorF64Op>(rows, cols, buf),
    }
}

/// Per-width read/write/combine operations, so the row-walking loop below is
/// written once.
trait ElementOp {
    const WIDTH: usize;
    type Repr: Copy;

    fn read(bytes: &[u8]) -> Self::Repr;
    fn write(value: Self::Repr, bytes: &mut [u8]);
    /// `current - previous` (delta) or `current ^ previous` (xor).
    fn forward(current: Self::Repr, previous: Self::Repr) -> Self::Repr;
    /// Inverse of `forward`: `diff + previous` or `diff ^ previous`.
    fn inverse(diff: Self::Repr, previous: Self::Repr) -> Self::Repr;
}

macro_rules! int_op {
    ($name:ident, $repr:ty, $width:expr) => {
        struct $name;
        impl ElementOp for $name {
            const WIDTH: usize = $width;
            type Repr = $repr;

            fn read(bytes: &[u8]) -> Self::Repr {
                <$repr>::from_ne_bytes(bytes.try_into().unwrap())
            }
            fn write(value: Self::Repr, bytes: &mut [u8]) {
                bytes.copy_from_slice(&value.to_ne_bytes());
            }
            fn forward(current: Self::Repr, previous: Self::Repr) -> Self::Repr {
                current.wrapping_sub(previous)
            }
            fn inverse(diff: Self::Repr, previous: Self::Repr) -> Self::Repr {
                diff.wrapping_add(previous)
            }
        }
    };
}

int_op!(Int8Op, i8, 1);
int_op!(Int16Op, i16, 2);
int_op!(Int32Op, i32, 4);
int_op!(Int64Op, i64, 8);

macro_rules! xor_op {
    ($name:ident, $repr:ty, $width:expr) => {
        struct $name;
        impl ElementOp for $name {
            const WIDTH: usize = $width;
            type Repr = $repr;

            fn read(bytes: &[u8]) -> Self::Repr {
                <$repr>::from_ne_bytes(bytes.try_into().unwrap())
            }
            fn write(value: Self::Repr, bytes: &mut [u8]) {
                bytes.copy_from_slice(&value.to_ne_bytes());
            }
            fn forward(current: Self::Repr, previous: Self::Repr) -> Self::Repr {
                current ^ previous
            }
            fn inverse(diff: Self::Repr, previous: Self::Repr) -> Self::Repr {
                diff ^ previous
            }
        }
    };
}

xor_op!(XorF32Op, u32, 4);
xor_op!(XorF64Op, u64, 8);

fn encode_typed<Op: ElementOp>(rows: usize, cols: usize, buf: &mut [u8]) {
    let w = Op::WIDTH;
    // Walk rows bottom-up so `previous` is always still the *original* row
    // above before it gets overwritten with its own delta.
    for r in (1..rows).rev() {
        for c in 0..cols {
            let prev_off = ((r - 1) * cols + c) * w;
            let cur_off = (r * cols + c) * w;
            let previous = Op::read(&buf[prev_off..prev_off + w]);
            let current = Op::read(&buf[cur_off..cur_off + w]);
            Op::write(Op::forward(current, previous), &mut buf[cur_off..cur_off + w]);
        }
    }
}

fn decode_typed<Op: ElementOp>(rows: usize, cols: usize, buf: &mut [u8]) {
    let w = Op::WIDTH;
    for r in 1..rows {
        for c in 0..cols {
            let prev_off = ((r - 1) * cols + c) * w;
            let cur_off = (r * cols + c) * w;
            let previous = Op::read(&buf[prev_off..prev_off + w]);
            let diff = Op::read(&buf[cur_off..cur_off + w]);
            Op::write(Op::inverse(diff, previous), &mut buf[cur_off..cur_off + w]);
        }
    }
}
