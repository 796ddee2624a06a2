//! Validator (component H): structural integrity and coordinate sanity checks.
use segy_batch_core::{FormatCode, TraceHeaderBytes};

use crate::plan::{CoordinateRange, OutlierCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingSubject {
    File,
    Trace(usize),
}

#[derive(Debug, Clone)]
pub struct Finding {
    pub subject: FindingSubject,
    pub severity: Severity,
    pub kind: &'static str,
    pub message: String,
    pub context: String,
}

/// `(file size - [128] - 3200 - 400 - extended) mod (240 + N*width) == 0`;
/// `format_code` recognized; `samples_per_trace > 0` (§4.8). `has_tape_label`
/// accounts for the optional 128-byte tape label (§12) that, when present,
/// precedes the textual header and is not itself part of the declared
/// header/trace regions.
pub fn check_file_structure(
    file_len: u64,
    extended_header_count: i64,
    format_code_raw: i16,
    samples_per_trace: i64,
    has_tape_label: bool,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    let format = match FormatCode::new(format_code_raw) {
        Ok(f) => Some(f),
        Err(_) => {
            findings.push(Finding {
                subject: FindingSubject::File,
                severity: Severity::Error,
                kind: "unknown_format_code",
                message: format!("format_code {} is not recognized", format_code_raw),
                context: String::new(),
            });
            None
        }
    };

    if samples_per_trace <= 0 {
        findings.push(Finding {
            subject: FindingSubject::File,
            severity: Severity::Error,
            kind: "invalid_samples_per_trace",
            message: format!("samples_per_trace must be > 0, found {}", samples_per_trace),
            context: String::new(),
        });
    }

    if let (Some(format), true) = (format, samples_per_trace > 0) {
        let tape_label_len = if has_tape_label { segy_batch_core::ebcdic::TAPE_LABEL_LEN as u64 } else { 0 };
        let header_region = tape_label_len + 3200u64 + 400 + extended_header_count.max(0) as u64 * 3200;
        let trace_block_len = 240u64 + samples_per_trace as u64 * format.datum_byte_length() as u64;
        if file_len < header_region {
            findings.push(Finding {
                subject: FindingSubject::File,
                severity: Severity::Error,
                kind: "truncated_file",
                message: "file is shorter than its declared header region".to_string(),
                context: String::new(),
            });
        } else if (file_len - header_region) % trace_block_len != 0 {
            findings.push(Finding {
                subject: FindingSubject::File,
                severity: Severity::Error,
                kind: "inconsistent_sample_count",
                message: format!(
                    "trace region ({} bytes) is not a whole multiple of the trace block size ({} bytes)",
                    file_len - header_region,
                    trace_block_len
                ),
                context: String::new(),
            });
        }
    }

    findings
}

const COORDINATE_FIELDS: &[(&str, &str)] =
    &[("source_x", "x"), ("source_y", "y"), ("group_x", "x"), ("group_y", "y"), ("cdp_x", "x"), ("cdp_y", "y")];

/// Apply `coordinate_scalar` to a raw integer coordinate (§4.8, GLOSSARY):
/// positive multiplies, negative divides, zero is treated as 1 with a warning.
pub fn apply_coordinate_scalar(raw: i64, scalar: i16) -> (f64, bool) {
    match scalar.cmp(&0) {
        std::cmp::Ordering::Greater => (raw as f64 * scalar as f64, false),
        std::cmp::Ordering::Less => (raw as f64 / (-scalar) as f64, false),
        std::cmp::Ordering::Equal => (raw as f64, true),
    }
}

/// Check one trace's scaled coordinates against the configured bounding box.
pub fn check_coordinate_range(trace_index: usize, header: &TraceHeaderBytes, config: &CoordinateRange) -> Vec<Finding> {
    let mut findings = Vec::new();
    let scalar = header.get_by_name("coordinate_scalar").unwrap_or(1) as i16;
    if scalar == 0 {
        findings.push(Finding {
            subject: FindingSubject::Trace(trace_index),
            severity: Severity::Warning,
            kind: "zero_coordinate_scalar",
            message: "coordinate_scalar is 0; treated as 1".to_string(),
            context: String::new(),
        });
    }
    for (name, axis) in COORDINATE_FIELDS {
        let raw = match header.get_by_name(name) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let (value, _) = apply_coordinate_scalar(raw, scalar);
        let (lo, hi) = if *axis == "x" { (config.x_min, config.x_max) } else { (config.y_min, config.y_max) };
        if value < lo || value > hi {
            findings.push(Finding {
                subject: FindingSubject::Trace(trace_index),
                severity: Severity::Error,
                kind: "coordinate_out_of_range",
                message: format!("{} = {} is outside [{}, {}]", name, value, lo, hi),
                context: name.to_string(),
            });
        }
    }
    findings
}

/// Accumulates scaled coordinate values across every trace so that
/// `check_coordinate_outliers` (median/MAD) can run after a full pass.
#[derive(Default)]
pub struct OutlierAccumulator {
    values: Vec<Vec<(usize, f64)>>,
}

impl OutlierAccumulator {
    pub fn new() -> Self {
        Self { values: vec![Vec::new(); COORDINATE_FIELDS.len()] }
    }

    pub fn observe(&mut self, trace_index: usize, header: &TraceHeaderBytes) {
        let scalar = header.get_by_name("coordinate_scalar").unwrap_or(1) as i16;
        for (i, (name, _)) in COORDINATE_FIELDS.iter().enumerate() {
            if let Ok(raw) = header.get_by_name(name) {
                let (value, _) = apply_coordinate_scalar(raw, scalar);
                self.values[i].push((trace_index, value));
            }
        }
    }

    /// Flag traces farther than `k * MAD` from the median, per field (§4.8).
    pub fn findings(&self, check: &OutlierCheck) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (i, (name, _)) in COORDINATE_FIELDS.iter().enumerate() {
            let series = &self.values[i];
            if series.is_empty() {
                continue;
            }
            let mut sorted: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
            let median = median_of(&mut sorted);
            let mut deviations: Vec<f64> = series.iter().map(|(_, v)| (*v - median).abs()).collect();
            let mad = median_of(&mut deviations);
            if mad == 0.0 {
                continue;
            }
            for (trace_index, value) in series {
                if (*value - median).abs() > check.k * mad {
                    findings.push(Finding {
                        subject: FindingSubject::Trace(*trace_index),
                        severity: Severity::Warning,
                        kind: "coordinate_outlier",
                        message: format!(
                            "{} = {} is {:.1} MAD from the median ({})",
                            name,
                            value,
                            (*value - median).abs() / mad,
                            median
                        ),
                        context: name.to_string(),
                    });
                }
            }
        }
        findings
    }
}

fn median_of(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segy_batch_core::TRACE_HEADER_LEN;

    #[test]
    fn file_structure_flags_inconsistent_sample_count() {
        let findings = check_file_structure(3200 + 400 + 100, 0, 2, 10, false);
        assert!(findings.iter().any(|f| f.kind == "inconsistent_sample_count"));
    }

    #[test]
    fn file_structure_accepts_consistent_file() {
        let trace_block = 240 + 10 * 4;
        let findings = check_file_structure(3200 + 400 + trace_block as u64 * 5, 0, 2, 10, false);
        assert!(findings.is_empty());
    }

    #[test]
    fn file_structure_accepts_consistent_file_with_tape_label() {
        let trace_block = 240 + 10 * 4;
        let findings = check_file_structure(128 + 3200 + 400 + trace_block as u64 * 5, 0, 2, 10, true);
        assert!(findings.is_empty());
    }

    #[test]
    fn zero_scalar_is_treated_as_one_with_warning() {
        let (value, warned) = apply_coordinate_scalar(500, 0);
        assert_eq!(value, 500.0);
        assert!(warned);
    }

    #[test]
    fn negative_scalar_divides() {
        let (value, _) = apply_coordinate_scalar(1000, -100);
        assert_eq!(value, 10.0);
    }

    #[test]
    fn outlier_detection_flags_single_outlier() {
        let mut acc = OutlierAccumulator::new();
        for i in 0..100 {
            let mut h = TraceHeaderBytes::from_bytes([0u8; TRACE_HEADER_LEN]);
            h.set_by_name("source_x", (i * 10) as i64).unwrap();
            acc.observe(i, &h);
        }
        let mut h = TraceHeaderBytes::from_bytes([0u8; TRACE_HEADER_LEN]);
        h.set_by_name("source_x", 1_000_000_000).unwrap();
        acc.observe(100, &h);

        let findings = acc.findings(&OutlierCheck { k: 10.0 });
        let flagged: Vec<_> = findings.iter().filter(|f| f.context == "source_x").collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].subject, FindingSubject::Trace(100));
    }
}
