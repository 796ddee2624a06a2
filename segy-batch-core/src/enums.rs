//! Enumerations used by the binary header.
//!
//! Follows the teacher's `enums.rs` convention: `num-derive`'s `FromPrimitive`/`ToPrimitive`
//! for the wire conversion, plus a `Display` impl, plus a `new` constructor that turns an
//! out-of-range code into a named error instead of panicking.
use num::FromPrimitive;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::SegyError;

/// Sample encoding selected by binary-header bytes 25-26.
///
/// Only the codes this specification recognizes are modeled; anything else is an
/// `UnknownFormatCode` at read time rather than a silently-accepted variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FormatCode {
    /// 1 = 4-byte IBM floating point. Samples are opaque; never decoded by this crate.
    IbmFloat32 = 1,
    /// 2 = 4-byte two's-complement integer.
    Int32 = 2,
    /// 3 = 2-byte two's-complement integer.
    Int16 = 3,
    /// 4 = 4-byte fixed-point with gain (obsolete).
    FixedPointGain32 = 4,
    /// 5 = 4-byte IEEE floating point.
    IeeeFloat32 = 5,
    /// 8 = 1-byte two's-complement integer.
    Int8 = 8,
}

impl FormatCode {
    /// Construct from the raw binary-header code, or a named error if unrecognized.
    pub fn new(code: i16) -> Result<Self, SegyError> {
        FormatCode::from_i16(code).ok_or(SegyError::UnknownFormatCode(code))
    }

    /// Byte width of a single sample datum under this format.
    pub fn datum_byte_length(self) -> usize {
        match self {
            FormatCode::IbmFloat32
            | FormatCode::Int32
            | FormatCode::FixedPointGain32
            | FormatCode::IeeeFloat32 => 4,
            FormatCode::Int16 => 2,
            FormatCode::Int8 => 1,
        }
    }
}

impl std::fmt::Display for FormatCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How a per-trace or per-field error should be handled once streaming has started.
///
/// Fatal errors (`TruncatedFile`, `PlanParseError`, ...) always abort regardless of this
/// setting; this only governs the per-trace recoverable kinds named in the error design
/// (expression runtime errors, `OutOfRange` on expression/copy edits, CSV binding errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RecoveryMode {
    /// Stop the plan at the first per-trace error (default).
    #[default]
    Abort,
    /// Leave the field's prior value untouched and continue.
    Skip,
    /// Leave the field untouched, but only warn once per (operation, kind).
    Warn,
}
