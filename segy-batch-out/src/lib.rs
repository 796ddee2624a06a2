//! Streaming SEG-Y writer.
//!
//! Symmetric to `segy-batch-in`'s reader: sequential `Write` calls, one
//! region at a time, with the same discipline the teacher's
//! `write_trace_internal` uses (`write_all`, no extra buffering tricks that
//! would defeat streaming). Adds the `discard` mode the spec requires for
//! dry runs: writes are still validated and counted, just not persisted.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use segy_batch_core::ebcdic::TAPE_LABEL_LEN;
use segy_batch_core::{SegyError, BINARY_HEADER_LEN, TEXTUAL_HEADER_LEN, TRACE_HEADER_LEN};

/// Whether writes actually reach disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Persist,
    Discard,
}

/// Counts of bytes written (or, in discard mode, bytes that would have been written).
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteCounts {
    pub textual_headers: u64,
    pub binary_headers: u64,
    pub extended_headers: u64,
    pub traces: u64,
    pub bytes: u64,
}

enum Sink {
    File(BufWriter<File>),
    Discard,
}

/// A SEG-Y output stream, writing region by region in the order the format requires.
pub struct SegyWriter {
    sink: Sink,
    path: Option<PathBuf>,
    counts: WriteCounts,
}

impl SegyWriter {
    /// Create a writer at `path` (truncating/creating it). In `Discard` mode no file
    /// is opened at all.
    pub fn create<P: AsRef<Path>>(path: P, mode: WriteMode) -> Result<Self, SegyError> {
        let sink = match mode {
            WriteMode::Persist => Sink::File(BufWriter::new(File::create(path.as_ref())?)),
            WriteMode::Discard => Sink::Discard,
        };
        Ok(Self { sink, path: Some(path.as_ref().to_path_buf()), counts: WriteCounts::default() })
    }

    fn write_region(&mut self, region: &'static str, expected: usize, bytes: &[u8]) -> Result<(), SegyError> {
        if bytes.len() != expected {
            return Err(SegyError::WrongRegionLength { region, expected, found: bytes.len() });
        }
        self.counts.bytes += bytes.len() as u64;
        if let Sink::File(w) = &mut self.sink {
            w.write_all(bytes).map_err(SegyError::WriteError)?;
        }
        Ok(())
    }

    /// Write the 128-byte tape label through unchanged, ahead of the textual
    /// header, when the input file had one (§12: pass-through only, never parsed).
    pub fn write_tape_label(&mut self, bytes: &[u8]) -> Result<(), SegyError> {
        self.write_region("tape label", TAPE_LABEL_LEN, bytes)
    }

    pub fn write_textual(&mut self, bytes: &[u8]) -> Result<(), SegyError> {
        self.write_region("textual header", TEXTUAL_HEADER_LEN, bytes)?;
        self.counts.textual_headers += 1;
        Ok(())
    }

    pub fn write_binary_header(&mut self, bytes: &[u8]) -> Result<(), SegyError> {
        self.write_region("binary header", BINARY_HEADER_LEN, bytes)?;
        self.counts.binary_headers += 1;
        Ok(())
    }

    pub fn write_extended(&mut self, bytes: &[u8]) -> Result<(), SegyError> {
        self.write_region("extended textual header", TEXTUAL_HEADER_LEN, bytes)?;
        self.counts.extended_headers += 1;
        Ok(())
    }

    /// Write one trace: its 240-byte header followed by its sample payload, verbatim.
    pub fn write_trace(&mut self, header: &[u8], samples: &[u8]) -> Result<(), SegyError> {
        self.write_region("trace header", TRACE_HEADER_LEN, header)?;
        self.counts.bytes += samples.len() as u64;
        if let Sink::File(w) = &mut self.sink {
            w.write_all(samples).map_err(SegyError::WriteError)?;
        }
        self.counts.traces += 1;
        Ok(())
    }

    pub fn counts(&self) -> WriteCounts {
        self.counts
    }

    /// Flush and fsync the underlying file, if persisting.
    pub fn close(mut self) -> Result<WriteCounts, SegyError> {
        if let Sink::File(w) = &mut self.sink {
            w.flush().map_err(SegyError::WriteError)?;
            w.get_ref().sync_all().map_err(SegyError::WriteError)?;
        }
        Ok(self.counts)
    }

    /// Delete the file this writer created, used to roll back a failed in-place edit.
    pub fn discard_output(self) -> Result<(), SegyError> {
        drop(self.sink);
        if let Some(path) = self.path {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_region_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = SegyWriter::create(dir.path().join("out.sgy"), WriteMode::Persist).unwrap();
        let err = w.write_textual(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, SegyError::WrongRegionLength { .. }));
    }

    #[test]
    fn discard_mode_counts_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sgy");
        let mut w = SegyWriter::create(&path, WriteMode::Discard).unwrap();
        w.write_textual(&[0x40u8; TEXTUAL_HEADER_LEN]).unwrap();
        w.write_binary_header(&[0u8; BINARY_HEADER_LEN]).unwrap();
        w.write_trace(&[0u8; TRACE_HEADER_LEN], &[0u8; 16]).unwrap();
        let counts = w.close().unwrap();
        assert_eq!(counts.traces, 1);
        assert!(!path.exists());
    }

    #[test]
    fn persist_mode_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sgy");
        let mut w = SegyWriter::create(&path, WriteMode::Persist).unwrap();
        w.write_textual(&[0x40u8; TEXTUAL_HEADER_LEN]).unwrap();
        w.write_binary_header(&[0u8; BINARY_HEADER_LEN]).unwrap();
        w.write_trace(&[0u8; TRACE_HEADER_LEN], &[0u8; 16]).unwrap();
        let counts = w.close().unwrap();
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, counts.bytes);
    }

    #[test]
    fn discard_output_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sgy");
        let mut w = SegyWriter::create(&path, WriteMode::Persist).unwrap();
        w.write_textual(&[0x40u8; TEXTUAL_HEADER_LEN]).unwrap();
        w.discard_output().unwrap();
        assert!(!path.exists());
    }
}
