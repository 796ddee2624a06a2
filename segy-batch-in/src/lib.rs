//! Streaming SEG-Y reader.
//!
//! Mirrors the shape of the teacher's `SegyFile` reader (`giga-segy-in/src/lib.rs`)
//! but drops its mmap-and-eager-load design: files here may be many gigabytes, and
//! the spec requires a constant-memory pass, so headers are read with plain
//! sequential `Read` calls and traces are handed out one at a time through an
//! iterator that never buffers more than the current trace.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use segy_batch_core::ebcdic;
use segy_batch_core::ebcdic::TAPE_LABEL_LEN;
use segy_batch_core::{
    BinHeaderBytes, FileHeaders, FormatCode, SegyError, Trace, TraceHeaderBytes,
    BINARY_HEADER_LEN, TEXTUAL_HEADER_LEN, TRACE_HEADER_LEN,
};

/// An open SEG-Y file positioned for sequential trace reads.
///
/// Holds the headers (decoded once) plus the open file handle; `iter_traces`
/// borrows the handle and hands out traces lazily. There is no seeking back:
/// once a trace has been consumed it cannot be re-read.
pub struct SegyReader {
    reader: BufReader<File>,
    headers: FileHeaders,
    format: FormatCode,
    fixed_trace_len: Option<u64>,
}

impl SegyReader {
    /// Open `path`, reading the textual, binary, and any extended textual headers.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SegyError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        // Probe the first TAPE_LABEL_LEN + 1 bytes to detect an optional tape
        // label (§12): if byte 0 doesn't look like the textual header's
        // conventional leading 'C' but the byte 128 positions in does, a
        // 128-byte label occupies the gap and is carried through unparsed.
        let mut probe = [0u8; TAPE_LABEL_LEN + 1];
        read_exact_or_truncated(&mut reader, &mut probe)?;
        let has_label = ebcdic::detects_tape_label(probe[0], probe[TAPE_LABEL_LEN]);

        let mut textual_raw = [0u8; TEXTUAL_HEADER_LEN];
        let tape_label = if has_label {
            textual_raw[0] = probe[TAPE_LABEL_LEN];
            read_exact_or_truncated(&mut reader, &mut textual_raw[1..])?;
            Some(probe[..TAPE_LABEL_LEN].to_vec())
        } else {
            textual_raw[..probe.len()].copy_from_slice(&probe);
            read_exact_or_truncated(&mut reader, &mut textual_raw[probe.len()..])?;
            None
        };
        let textual = String::from_utf8_lossy(&ebcdic::decode(&textual_raw).bytes).into_owned();

        let mut binary_raw = [0u8; BINARY_HEADER_LEN];
        read_exact_or_truncated(&mut reader, &mut binary_raw)?;
        let binary = BinHeaderBytes::from_bytes(binary_raw);

        let format = FormatCode::new(binary.get_by_name("format_code")? as i16)?;

        let ext_count = binary.get_by_name("extended_header_count")?;
        let mut extended_textual = Vec::new();
        if ext_count > 0 {
            for _ in 0..ext_count {
                let mut raw = [0u8; TEXTUAL_HEADER_LEN];
                read_exact_or_truncated(&mut reader, &mut raw)?;
                extended_textual.push(String::from_utf8_lossy(&ebcdic::decode(&raw).bytes).into_owned());
            }
        }

        let headers = FileHeaders { textual, binary, extended_textual, tape_label };
        let samples_per_trace = headers.samples_per_trace()?;
        let fixed_trace_len = if samples_per_trace > 0 {
            Some(TRACE_HEADER_LEN as u64 + samples_per_trace as u64 * format.datum_byte_length() as u64)
        } else {
            None
        };

        Ok(Self { reader, headers, format, fixed_trace_len })
    }

    pub fn headers(&self) -> &FileHeaders {
        &self.headers
    }

    pub fn format(&self) -> FormatCode {
        self.format
    }

    /// Total file length, used by `check_file_structure` to verify the trace
    /// region divides evenly into whole trace blocks.
    pub fn file_len<P: AsRef<Path>>(path: P) -> Result<u64, SegyError> {
        Ok(std::fs::metadata(path)?.len())
    }

    /// Consume `self` and return a lazy, finite, non-restartable trace iterator.
    pub fn iter_traces(self) -> TraceIter {
        TraceIter { reader: self.reader, format: self.format, fixed_trace_len: self.fixed_trace_len, exhausted: false }
    }
}

fn read_exact_or_truncated<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), SegyError> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SegyError::TruncatedFile
        } else {
            SegyError::Io(e)
        }
    })
}

/// Lazy sequence of `(header, samples)` pairs. Reads strictly sequentially and
/// never materializes more than one trace at a time.
pub struct TraceIter {
    reader: BufReader<File>,
    format: FormatCode,
    fixed_trace_len: Option<u64>,
    exhausted: bool,
}

impl Iterator for TraceIter {
    type Item = Result<Trace, SegyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let mut header_raw = [0u8; TRACE_HEADER_LEN];
        match self.reader.read_exact(&mut header_raw) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.exhausted = true;
                return None;
            }
            Err(e) => return Some(Err(SegyError::Io(e))),
        }
        let header = TraceHeaderBytes::from_bytes(header_raw);

        let samples_per_trace = match header.get_by_name("samples_per_trace") {
            Ok(v) if v > 0 => v as u64,
            _ => match self.fixed_trace_len {
                Some(len) => (len - TRACE_HEADER_LEN as u64) / self.format.datum_byte_length() as u64,
                None => return Some(Err(SegyError::InconsistentSampleCount { file_len: 0, trace_block_len: 0 })),
            },
        };
        let sample_bytes = samples_per_trace * self.format.datum_byte_length() as u64;
        let mut samples = vec![0u8; sample_bytes as usize];
        if let Err(e) = self.reader.read_exact(&mut samples) {
            self.exhausted = true;
            return Some(Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
                SegyError::TruncatedFile
            } else {
                SegyError::Io(e)
            }));
        }
        Some(Ok(Trace::new(header, samples)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_file(samples_per_trace: u16, trace_count: usize) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0x40u8; TEXTUAL_HEADER_LEN]).unwrap();

        let mut binary = [0u8; BINARY_HEADER_LEN];
        binary[20..22].copy_from_slice(&samples_per_trace.to_be_bytes());
        binary[24..26].copy_from_slice(&2i16.to_be_bytes()); // format_code = Int32
        f.write_all(&binary).unwrap();

        for i in 0..trace_count {
            let mut header = [0u8; TRACE_HEADER_LEN];
            header[0..4].copy_from_slice(&((i + 1) as i32).to_be_bytes());
            f.write_all(&header).unwrap();
            f.write_all(&vec![0u8; samples_per_trace as usize * 4]).unwrap();
        }
        f.flush().unwrap();
        f
    }

    #[test]
    fn reads_headers_and_iterates_traces() {
        let f = minimal_file(4, 3);
        let reader = SegyReader::open(f.path()).unwrap();
        assert_eq!(reader.format(), FormatCode::Int32);
        let traces: Vec<_> = reader.iter_traces().collect::<Result<_, _>>().unwrap();
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[0].samples.len(), 16);
        assert_eq!(traces[2].header.get_by_name("trace_sequence_line").unwrap(), 3);
    }

    #[test]
    fn truncated_file_is_reported() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0u8; 100]).unwrap();
        f.flush().unwrap();
        assert!(matches!(SegyReader::open(f.path()), Err(SegyError::TruncatedFile)));
    }

    #[test]
    fn minimal_file_has_no_tape_label() {
        let f = minimal_file(4, 1);
        let reader = SegyReader::open(f.path()).unwrap();
        assert!(reader.headers().tape_label.is_none());
    }

    #[test]
    fn detects_and_preserves_tape_label() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let tape_label = vec![0x11u8; TAPE_LABEL_LEN];
        f.write_all(&tape_label).unwrap();

        let mut header_line = String::from("C 1 CLIENT ACME");
        header_line.push_str(&" ".repeat(80 - header_line.len()));
        let mut text = String::new();
        for i in 0..ebcdic::LINES {
            if i > 0 {
                text.push('\n');
            }
            text.push_str(header_line.trim_end());
        }
        let encoded = ebcdic::encode(&text);
        f.write_all(&encoded.bytes).unwrap();

        let mut binary = [0u8; BINARY_HEADER_LEN];
        binary[20..22].copy_from_slice(&4u16.to_be_bytes());
        binary[24..26].copy_from_slice(&2i16.to_be_bytes());
        f.write_all(&binary).unwrap();
        f.flush().unwrap();

        let reader = SegyReader::open(f.path()).unwrap();
        assert_eq!(reader.headers().tape_label.as_deref(), Some(tape_label.as_slice()));
        assert!(reader.headers().textual.starts_with("C 1 CLIENT ACME"));
    }
}
