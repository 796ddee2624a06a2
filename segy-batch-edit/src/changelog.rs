//! Changelog and validation-report sinks (§5, §6).
//!
//! The orchestrator owns these; it never renders a report itself (that is an
//! external collaborator's job per the Non-goals), it only writes typed
//! records to whatever sink the caller supplies. A CSV sink is provided here
//! because the changelog's own wire format *is* CSV (§6) and is therefore
//! part of the core's stable surface, not a rendering concern.
use std::io::Write;

use segy_batch_core::SegyError;

use crate::plan::ChangeEvent;
use crate::validator::{Finding, FindingSubject, Severity};

/// Receives one record per header field mutation. Implementations must be
/// prepared to be called from a single worker thread per file (§5: the
/// changelog sink is serialized, backed by a bounded queue upstream of here).
pub trait ChangelogSink {
    fn record(&mut self, file: &str, event: &ChangeEvent) -> Result<(), SegyError>;
}

/// Receives one record per validation finding.
pub trait ReportSink {
    fn record(&mut self, file: &str, finding: &Finding) -> Result<(), SegyError>;
}

/// An in-memory changelog, useful for tests and for the dry-run idempotence
/// property (§8): two dry runs must produce identical streams.
#[derive(Default)]
pub struct VecChangelogSink(pub Vec<(String, ChangeEvent)>);

impl ChangelogSink for VecChangelogSink {
    fn record(&mut self, file: &str, event: &ChangeEvent) -> Result<(), SegyError> {
        self.0.push((file.to_string(), event.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct VecReportSink(pub Vec<(String, Finding)>);

impl ReportSink for VecReportSink {
    fn record(&mut self, file: &str, finding: &Finding) -> Result<(), SegyError> {
        self.0.push((file.to_string(), finding.clone()));
        Ok(())
    }
}

/// Writes the changelog CSV schema from §6: `file, timestamp, trace_index_or_blank,
/// region, field, old_value, new_value`. The timestamp is supplied by the caller at
/// construction (this crate never reads the system clock) so that a run's changelog
/// is reproducible given the same plan, file, and stamped time.
pub struct CsvChangelogSink<W: Write> {
    writer: csv::Writer<W>,
    timestamp: String,
}

impl<W: Write> CsvChangelogSink<W> {
    pub fn new(writer: W, timestamp: String) -> Result<Self, SegyError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(["file", "timestamp", "trace_index", "region", "field", "old_value", "new_value"])
            .map_err(|e| SegyError::CsvSourceError { msg: e.to_string() })?;
        Ok(Self { writer, timestamp })
    }
}

impl<W: Write> ChangelogSink for CsvChangelogSink<W> {
    fn record(&mut self, file: &str, event: &ChangeEvent) -> Result<(), SegyError> {
        let trace_index = event.trace_index.map(|i| i.to_string()).unwrap_or_default();
        self.writer
            .write_record([
                file,
                &self.timestamp,
                &trace_index,
                event.region.as_str(),
                &event.field,
                &event.old_value.to_string(),
                &event.new_value.to_string(),
            ])
            .map_err(|e| SegyError::CsvSourceError { msg: e.to_string() })
    }
}

impl Finding {
    pub fn subject_label(&self) -> String {
        match self.subject {
            FindingSubject::File => String::new(),
            FindingSubject::Trace(i) => i.to_string(),
        }
    }

    pub fn severity_label(&self) -> &'static str {
        match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ChangeRegion;

    #[test]
    fn csv_sink_writes_header_and_rows() {
        let mut buf = Vec::new();
        {
            let mut sink = CsvChangelogSink::new(&mut buf, "2026-07-28T00:00:00Z".to_string()).unwrap();
            sink.record(
                "f.sgy",
                &ChangeEvent { trace_index: Some(3), region: ChangeRegion::Trace, field: "source_x".to_string(), old_value: 1, new_value: 2 },
            )
            .unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("file,timestamp,trace_index,region,field,old_value,new_value"));
        assert!(text.contains("f.sgy,2026-07-28T00:00:00Z,3,trace,source_x,1,2"));
    }
}
