//! Core data model for the SEG-Y batch inspector/editor.
//!
//! This crate has no I/O of its own (that lives in `segy-batch-in` and
//! `segy-batch-out`) and no plan/expression semantics (that lives in
//! `segy-batch-edit`). It supplies the parts every other crate shares:
//! the [`field_table`] of named header fields, byte-level views over the
//! binary and trace headers ([`header_view`]), the EBCDIC textual-header
//! codec, the wire enums, and the error type every operation returns.
pub mod ebcdic;
pub mod enums;
pub mod errors;
pub mod field_table;
pub mod header_view;

pub use enums::{FormatCode, RecoveryMode};
pub use errors::SegyError;
pub use field_table::{binary_field, trace_field, FieldSpec, BINARY_HEADER_FIELDS, TRACE_HEADER_FIELDS};
pub use header_view::{BinHeaderBytes, TraceHeaderBytes, BINARY_HEADER_LEN, TRACE_HEADER_LEN};

/// Byte length of the (non-extended) textual header.
pub const TEXTUAL_HEADER_LEN: usize = ebcdic::TEXTUAL_HEADER_LEN;

/// A single trace: its 240-byte header plus its opaque sample payload.
///
/// Sample bytes are never interpreted by this crate; `format_code` only
/// determines how many bytes make up one datum, via [`FormatCode::datum_byte_length`].
#[derive(Debug, Clone)]
pub struct Trace {
    pub header: TraceHeaderBytes,
    pub samples: Vec<u8>,
}

impl Trace {
    pub fn new(header: TraceHeaderBytes, samples: Vec<u8>) -> Self {
        Self { header, samples }
    }
}

/// The three header regions every SEG-Y file starts with, decoded enough to
/// drive streaming (sample format, trace length) but otherwise left as byte views.
#[derive(Debug, Clone)]
pub struct FileHeaders {
    pub textual: String,
    pub binary: BinHeaderBytes,
    pub extended_textual: Vec<String>,
    /// Raw bytes of an optional 128-byte tape label preceding the textual
    /// header, when one was detected. Never parsed, only passed through.
    pub tape_label: Option<Vec<u8>>,
}

impl FileHeaders {
    /// Sample encoding declared by the binary header.
    pub fn format_code(&self) -> Result<FormatCode, SegyError> {
        FormatCode::new(self.binary.get_by_name("format_code")? as i16)
    }

    /// Declared samples-per-trace, used to size each trace's payload when the
    /// fixed-length-trace flag is set.
    pub fn samples_per_trace(&self) -> Result<u16, SegyError> {
        Ok(self.binary.get_by_name("samples_per_trace")? as u16)
    }
}
