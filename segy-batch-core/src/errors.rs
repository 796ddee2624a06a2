//! Error types shared by every crate in the workspace.
//!
//! Mirrors the teacher's hand-rolled `RsgError`: a flat enum with manual
//! `Display`/`std::error::Error` impls rather than a derive-macro crate, so
//! that every error kind named in the error-handling design doc maps to an
//! explicit variant here.

/// Errors produced anywhere in the SEG-Y batch toolkit.
#[derive(Debug)]
pub enum SegyError {
    /// Wrapped `std::io` error.
    Io(std::io::Error),
    /// `std::array::TryFromSliceError` from the std library.
    TryFromSlice(std::array::TryFromSliceError),
    /// File is shorter than the fixed textual + binary header region.
    TruncatedFile,
    /// `(file size - headers) mod (240 + N * width) != 0`.
    InconsistentSampleCount { file_len: u64, trace_block_len: u64 },
    /// `format_code` is not one of the recognized values.
    UnknownFormatCode(i16),
    /// A named field does not exist in the binary or trace header table.
    UnknownField { name: String },
    /// A value does not fit in the field's declared width.
    OutOfRange { field: String, value: i64, width: u8 },
    /// A region write was handed a buffer of the wrong length.
    WrongRegionLength { region: &'static str, expected: usize, found: usize },
    /// Writer I/O failure; always fatal, triggers rollback.
    WriteError(std::io::Error),
    /// Plan failed to validate structurally before any I/O happened.
    PlanParseError { msg: String },
    /// Expression references a name outside the declared environment.
    UnknownVariable { name: String },
    /// Expression calls a function outside the allowed set.
    UnknownFunction { name: String },
    /// Expression divides by zero.
    DivisionByZero,
    /// Expression failed to parse.
    ExpressionParseError { msg: String },
    /// Fewer CSV rows than traces, in default row-index binding.
    CsvUnderflow { needed: usize, available: usize },
    /// Keyed CSV binding has no row for a trace's key value.
    CsvKeyMissing { key: String },
    /// CSV cell could not be parsed as the destination field's numeric type.
    CsvTypeError { raw: String },
    /// One or more validation findings had severity `error`.
    ValidationFailed { findings: usize },
    /// CSV source failed to open or parse.
    CsvSourceError { msg: String },
}

impl From<std::io::Error> for SegyError {
    fn from(e: std::io::Error) -> Self {
        SegyError::Io(e)
    }
}

impl From<std::array::TryFromSliceError> for SegyError {
    fn from(e: std::array::TryFromSliceError) -> Self {
        SegyError::TryFromSlice(e)
    }
}

impl std::fmt::Display for SegyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use SegyError::*;
        match self {
            Io(e) => write!(f, "{}", e),
            TryFromSlice(e) => write!(f, "{}", e),
            TruncatedFile => write!(f, "file is too short to hold a textual and binary header"),
            InconsistentSampleCount { file_len, trace_block_len } => write!(
                f,
                "trace region ({} bytes) is not a whole multiple of the trace block size ({} bytes)",
                file_len, trace_block_len
            ),
            UnknownFormatCode(code) => write!(f, "format code {} is not recognized", code),
            UnknownField { name } => write!(f, "'{}' is not a known header field", name),
            OutOfRange { field, value, width } => write!(
                f,
                "value {} does not fit in field '{}' ({}-byte)",
                value, field, width
            ),
            WrongRegionLength { region, expected, found } => write!(
                f,
                "{} must be exactly {} bytes, got {}",
                region, expected, found
            ),
            WriteError(e) => write!(f, "write failed: {}", e),
            PlanParseError { msg } => write!(f, "plan parse error: {}", msg),
            UnknownVariable { name } => write!(f, "unknown variable '{}'", name),
            UnknownFunction { name } => write!(f, "unknown function '{}'", name),
            DivisionByZero => write!(f, "division by zero"),
            ExpressionParseError { msg } => write!(f, "expression parse error: {}", msg),
            CsvUnderflow { needed, available } => write!(
                f,
                "CSV source has {} rows but {} traces need binding",
                available, needed
            ),
            CsvKeyMissing { key } => write!(f, "no CSV row found for key '{}'", key),
            CsvTypeError { raw } => write!(f, "'{}' could not be parsed as a numeric CSV value", raw),
            ValidationFailed { findings } => {
                write!(f, "{} validation finding(s) at error severity", findings)
            }
            CsvSourceError { msg } => write!(f, "CSV source error: {}", msg),
        }
    }
}

impl std::error::Error for SegyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use SegyError::*;
        match self {
            Io(e) | WriteError(e) => Some(e),
            TryFromSlice(e) => Some(e),
            _ => None,
        }
    }
}

