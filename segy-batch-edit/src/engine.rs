//! Orchestrator / engine (component I): runs one plan against one file (§4.9).
use std::path::{Path, PathBuf};

use segy_batch_core::SegyError;
use segy_batch_in::SegyReader;
use segy_batch_out::{SegyWriter, WriteMode};

use crate::changelog::{ChangelogSink, ReportSink};
use crate::ebcdic_editor::TextualHeader;
use crate::expr::Environment;
use crate::plan::{EditOperation, EditPlan, OutputMode};
use crate::trace_editor::{self, CsvCache, WarnedSet};
use crate::validator::{self, Severity};
use crate::{binary_editor, ebcdic_editor};

/// Outcome of one `run_plan` call (§4.9 step 8's completion event).
#[derive(Debug, Default)]
pub struct RunSummary {
    pub traces_processed: usize,
    pub fields_changed: usize,
    pub validation_findings: usize,
}

/// Execute `plan` against the file at `input_path`, per the eight-step pipeline
/// in §4.9: open, read headers, validate, apply EBCDIC edits, apply binary
/// edits, stream traces, close, emit completion.
///
/// In `in_place` mode, output is written to a sibling temp file and only
/// swapped into place after every trace has written successfully; any error
/// leaves the original file untouched (§4.9, §9 "atomic in-place swap").
pub fn run_plan(
    input_path: &Path,
    plan: &EditPlan,
    changelog: &mut dyn ChangelogSink,
    report: &mut dyn ReportSink,
) -> Result<RunSummary, SegyError> {
    let file_label = input_path.to_string_lossy().into_owned();

    // (1)+(2) open, read headers.
    let header_reader = SegyReader::open(input_path)?;
    let headers = header_reader.headers().clone();

    // (3) validations.
    let mut findings = Vec::new();
    if plan.validations.check_file_structure {
        let file_len = SegyReader::file_len(input_path)?;
        let ext_count = headers.binary.get_by_name("extended_header_count")?;
        let samples_per_trace = headers.binary.get_by_name("samples_per_trace")?;
        let format_code_raw = headers.binary.get_by_name("format_code")? as i16;
        findings.extend(validator::check_file_structure(
            file_len,
            ext_count,
            format_code_raw,
            samples_per_trace,
            headers.tape_label.is_some(),
        ));
    }
    let needs_trace_scan = plan.validations.check_coordinate_range.is_some() || plan.validations.check_coordinate_outliers.is_some();
    if needs_trace_scan {
        let mut accumulator = validator::OutlierAccumulator::new();
        for (i, trace) in header_reader.iter_traces().enumerate() {
            let trace = trace?;
            if let Some(range) = &plan.validations.check_coordinate_range {
                findings.extend(validator::check_coordinate_range(i, &trace.header, range));
            }
            if plan.validations.check_coordinate_outliers.is_some() {
                accumulator.observe(i, &trace.header);
            }
        }
        if let Some(outlier_check) = &plan.validations.check_coordinate_outliers {
            findings.extend(accumulator.findings(outlier_check));
        }
    }
    for finding in &findings {
        report.record(&file_label, finding)?;
    }
    let error_count = findings.iter().filter(|f| f.severity == Severity::Error).count();
    if error_count > 0 && !plan.dry_run {
        return Err(SegyError::ValidationFailed { findings: error_count });
    }

    // Edit pass needs its own reader: the header_reader above may already have
    // been consumed by a validation scan (§4.9 runs validation before any write).
    let edit_reader = SegyReader::open(input_path)?;

    // (4)+(5) apply EBCDIC and binary-header edits; compile trace-header edits
    // for the streaming pass (§9: expression parsing happens before any trace
    // is read).
    let env = Environment::trace();
    let mut textual = TextualHeader::from_text(&headers.textual);
    let mut binary = headers.binary.clone();
    let mut compiled_trace_ops = Vec::new();
    let mut header_events = Vec::new();

    for op in &plan.edits {
        match op {
            EditOperation::EbcdicEdit { mode } => {
                header_events.extend(ebcdic_editor::apply(&mut textual, mode)?);
            }
            EditOperation::BinaryHeader { fields } => {
                header_events.extend(binary_editor::apply(&mut binary, fields)?);
            }
            EditOperation::TraceHeader { condition, fields } => {
                compiled_trace_ops.push(trace_editor::compile_operation(condition.as_deref(), fields, &env)?);
            }
        }
    }
    for event in &header_events {
        changelog.record(&file_label, event)?;
    }

    let output_path = resolve_output_path(input_path, &plan.output_mode)?;
    let write_mode = if matches!(plan.output_mode, OutputMode::Discard) { WriteMode::Discard } else { WriteMode::Persist };
    let mut writer = SegyWriter::create(&output_path, write_mode)?;

    let pipeline_result = run_pipeline(
        &mut writer,
        headers.tape_label.as_deref(),
        &textual,
        &binary,
        &headers.extended_textual,
        edit_reader,
        &compiled_trace_ops,
        plan,
        changelog,
        &file_label,
    );

    let (fields_changed, traces_processed) = match pipeline_result {
        Ok(v) => v,
        Err(e) => {
            writer.discard_output()?;
            return Err(e);
        }
    };

    writer.close()?;
    if matches!(plan.output_mode, OutputMode::InPlace) {
        std::fs::rename(&output_path, input_path)?;
    }

    Ok(RunSummary { traces_processed, fields_changed: fields_changed + header_events.len(), validation_findings: findings.len() })
}

fn resolve_output_path(input_path: &Path, mode: &OutputMode) -> Result<PathBuf, SegyError> {
    match mode {
        OutputMode::InPlace => {
            let dir = input_path.parent().unwrap_or_else(|| Path::new("."));
            let name = input_path.file_name().ok_or_else(|| SegyError::PlanParseError {
                msg: "input path has no file name".to_string(),
            })?;
            let mut tmp_name = std::ffi::OsString::from(".");
            tmp_name.push(name);
            tmp_name.push(".tmp");
            Ok(dir.join(tmp_name))
        }
        OutputMode::SeparateFolder { output_dir } => {
            std::fs::create_dir_all(output_dir)?;
            let name = input_path.file_name().ok_or_else(|| SegyError::PlanParseError {
                msg: "input path has no file name".to_string(),
            })?;
            Ok(output_dir.join(name))
        }
        OutputMode::Discard => Ok(input_path.with_extension("discard-unused")),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_pipeline(
    writer: &mut SegyWriter,
    tape_label: Option<&[u8]>,
    textual: &TextualHeader,
    binary: &segy_batch_core::BinHeaderBytes,
    extended_textual: &[String],
    edit_reader: SegyReader,
    compiled_trace_ops: &[trace_editor::CompiledTraceHeaderEdit],
    plan: &EditPlan,
    changelog: &mut dyn ChangelogSink,
    file_label: &str,
) -> Result<(usize, usize), SegyError> {
    if let Some(label) = tape_label {
        writer.write_tape_label(label)?;
    }
    writer.write_textual(&textual.encode()?)?;
    writer.write_binary_header(binary.as_bytes())?;
    for ext in extended_textual {
        writer.write_extended(&TextualHeader::from_text(ext).encode()?)?;
    }

    let mut csv_cache = CsvCache::default();
    let mut warned = WarnedSet::new();
    let mut fields_changed = 0;
    let mut traces_processed = 0;

    for (i, trace) in edit_reader.iter_traces().enumerate() {
        let mut trace = trace?;
        let events = trace_editor::apply_trace(&mut trace.header, i, compiled_trace_ops, &mut csv_cache, plan.recovery_mode, &mut warned)?;
        for event in &events {
            changelog.record(file_label, event)?;
        }
        fields_changed += events.len();
        writer.write_trace(trace.header.as_bytes(), &trace.samples)?;
        traces_processed += 1;
    }
    csv_cache.warn_surplus_rows(traces_processed);

    Ok((fields_changed, traces_processed))
}
