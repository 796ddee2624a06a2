//! CSV-driven per-trace field binding (§4.7.1).
use std::collections::HashMap;
use std::path::Path;

use segy_batch_core::SegyError;

/// A loaded CSV source: header names and every data row, read once and kept
/// for the lifetime of the plan.
pub struct CsvSource {
    column_index: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl CsvSource {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SegyError> {
        let mut reader = csv::Reader::from_path(path.as_ref())
            .map_err(|e| SegyError::CsvSourceError { msg: e.to_string() })?;
        let headers = reader.headers().map_err(|e| SegyError::CsvSourceError { msg: e.to_string() })?.clone();
        let column_index = headers.iter().enumerate().map(|(i, h)| (h.to_string(), i)).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record.map_err(|e| SegyError::CsvSourceError { msg: e.to_string() })?);
        }
        Ok(Self { column_index, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: &str) -> Result<&str, SegyError> {
        let idx = *self
            .column_index
            .get(column)
            .ok_or_else(|| SegyError::CsvSourceError { msg: format!("no such column '{}'", column) })?;
        Ok(self.rows[row].get(idx).unwrap_or(""))
    }
}

/// How CSV rows map to traces, and the cached lookup structures each mode needs.
pub enum BindingMode {
    /// Row N binds to trace index N (§4.7.1 default).
    RowIndex,
    /// Row lookup keyed by the current value of a named trace-header field.
    Keyed { key_column: String, index: HashMap<i64, usize> },
}

pub struct CsvBinding {
    source: CsvSource,
    column: String,
    mode: BindingMode,
}

impl CsvBinding {
    /// Build a binding over an already-loaded source. For keyed mode, the
    /// key index is built once here (over the CSV column sharing the
    /// key field's name) rather than per trace.
    pub fn new(source: CsvSource, column: String, key_column: Option<String>) -> Result<Self, SegyError> {
        let mode = match key_column {
            None => BindingMode::RowIndex,
            Some(key_column) => {
                let mut index = HashMap::new();
                for row in 0..source.row_count() {
                    let raw = source.cell(row, &key_column)?;
                    let key: i64 = raw
                        .trim()
                        .parse()
                        .map_err(|_| SegyError::CsvTypeError { raw: raw.to_string() })?;
                    index.insert(key, row);
                }
                BindingMode::Keyed { key_column, index }
            }
        };
        Ok(Self { source, column, mode })
    }

    /// Resolve the value bound to `trace_index`, given the current value of this
    /// trace's `key_column` field when in keyed mode. Returns the raw cell text;
    /// the caller parses it per the destination field's type (§4.7.1).
    pub fn value_for_trace(&mut self, trace_index: usize, key_field_value: i64) -> Result<&str, SegyError> {
        let row = match &self.mode {
            BindingMode::RowIndex => {
                if trace_index >= self.source.row_count() {
                    return Err(SegyError::CsvUnderflow {
                        needed: trace_index + 1,
                        available: self.source.row_count(),
                    });
                }
                trace_index
            }
            BindingMode::Keyed { index, .. } => *index
                .get(&key_field_value)
                .ok_or_else(|| SegyError::CsvKeyMissing { key: key_field_value.to_string() })?,
        };
        self.source.cell(row, &self.column)
    }

    /// Whether extra unused CSV rows exist beyond `trace_count` in row-index mode;
    /// the caller warns once, per §4.7.1's "extras are ignored with a warning".
    pub fn has_surplus_rows(&self, trace_count: usize) -> bool {
        matches!(self.mode, BindingMode::RowIndex) && self.source.row_count() > trace_count
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

/// Parse a CSV cell for a destination field: integers parse directly; anything
/// non-integer is retried as a float only if `allow_float` is set (coordinate
/// fields), per §4.7.1.
pub fn parse_cell(raw: &str, allow_float: bool) -> Result<i64, SegyError> {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(i);
    }
    if allow_float {
        if let Ok(f) = trimmed.parse::<f64>() {
            return Ok(f.round() as i64);
        }
    }
    Err(SegyError::CsvTypeError { raw: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn row_index_binding_reads_in_order() {
        let f = write_csv("value\n10\n20\n30\n");
        let source = CsvSource::load(f.path()).unwrap();
        let mut binding = CsvBinding::new(source, "value".to_string(), None).unwrap();
        assert_eq!(binding.value_for_trace(0, 0).unwrap(), "10");
        assert_eq!(binding.value_for_trace(2, 0).unwrap(), "30");
    }

    #[test]
    fn row_index_underflow_is_reported() {
        let f = write_csv("value\n10\n");
        let source = CsvSource::load(f.path()).unwrap();
        let mut binding = CsvBinding::new(source, "value".to_string(), None).unwrap();
        assert!(matches!(binding.value_for_trace(5, 0), Err(SegyError::CsvUnderflow { .. })));
    }

    #[test]
    fn keyed_binding_looks_up_by_field_value() {
        let f = write_csv("field_record,value\n7,100\n9,200\n");
        let source = CsvSource::load(f.path()).unwrap();
        let mut binding = CsvBinding::new(source, "value".to_string(), Some("field_record".to_string())).unwrap();
        assert_eq!(binding.value_for_trace(0, 9).unwrap(), "200");
        assert!(matches!(binding.value_for_trace(0, 42), Err(SegyError::CsvKeyMissing { .. })));
    }

    #[test]
    fn parse_cell_rejects_non_numeric_unless_float_allowed() {
        assert!(parse_cell("abc", false).is_err());
        assert_eq!(parse_cell("3.7", true).unwrap(), 4);
    }
}
