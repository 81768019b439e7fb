//! Definitions of error related things.

use std::fmt;

/// Errors of this crate.
///
/// Variants map one-to-one onto the stable error codes a caller needs to be
/// able to match on (`spec.md` §6): every non-`OK` code has exactly one
/// variant here, plus an `Io` wrapper for callers that layer file I/O on top
/// of the core (the core itself never performs I/O).
#[derive(Debug)]
#[non_exhaustive]
pub enum OmFileError {
    /// The (data type, compression) pair is not one of the supported
    /// combinations in the type/compression registry.
    InvalidCompressionType,
    /// The data type is not valid for the operation (e.g. an array-only
    /// width query called on a scalar type, or `STRING_ARRAY`).
    InvalidDataType,
    /// A planner or chunk driver needed bytes that were not present in the
    /// buffer the caller supplied.
    OutOfBoundRead,
    /// The buffer does not start with a recognized variable/legacy header.
    NotAnOmFile,
    /// The number of bytes consumed while decoding a data span did not
    /// match the span's declared size.
    DeflatedSizeMismatch,
    /// A dimension was zero.
    InvalidDimensions,
    /// A chunk dimension was zero or exceeded the corresponding dimension.
    InvalidChunkDimensions,
    /// A read offset was out of range for the array's dimensions.
    InvalidReadOffset,
    /// A read count was out of range given its read offset.
    InvalidReadCount,
    /// A cube offset placed the read window outside the destination cube.
    InvalidCubeOffset,
    /// Wrapper around an I/O error from the standard library.
    Io(std::io::Error),
}

impl From<std::io::Error> for OmFileError {
    fn from(e: std::io::Error) -> Self {
        OmFileError::Io(e)
    }
}

impl fmt::Display for OmFileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            OmFileError::InvalidCompressionType => write!(f, "Invalid compression type"),
            OmFileError::InvalidDataType => write!(f, "Invalid data type"),
            OmFileError::OutOfBoundRead => {
                write!(f, "Corrupted data with potential out-of-bound read")
            }
            OmFileError::NotAnOmFile => write!(f, "Not an OM file"),
            OmFileError::DeflatedSizeMismatch => {
                write!(f, "Corrupted data: deflated size does not match")
            }
            OmFileError::InvalidDimensions => write!(f, "Invalid dimensions"),
            OmFileError::InvalidChunkDimensions => write!(f, "Invalid chunk dimensions"),
            OmFileError::InvalidReadOffset => write!(f, "Invalid read offset"),
            OmFileError::InvalidReadCount => write!(f, "Invalid read count"),
            OmFileError::InvalidCubeOffset => write!(f, "Invalid cube offset"),
            OmFileError::Io(e) => write!(f, "IoError: {}", e),
        }
    }
}

impl std::error::Error for OmFileError {}

pub type Result<T> = std::result::Result<T, OmFileError>;
