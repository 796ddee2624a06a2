//! Trace-header editor (component G).
//!
//! Expressions and conditions are compiled once, before any trace is streamed
//! (§4.6's safety property and §7's "fatal before streaming" policy for
//! `UnknownField`): [`compile_operation`] does all the name/arity/grammar
//! checking up front, so [`apply_trace`] only ever does arithmetic and byte
//! writes in the hot per-trace loop.
use std::collections::HashMap;
use std::path::PathBuf;

use segy_batch_core::{field_table, RecoveryMode, SegyError, TraceHeaderBytes};

use crate::csv_binding::{parse_cell, CsvBinding, CsvSource};
use crate::expr::{self, Environment, Expr, Value, VarLookup};
use crate::plan::{ChangeEvent, ChangeRegion, TraceFieldEdit};

/// Fields whose destination accepts a fractional CSV value (§4.7.1): the six
/// coordinate fields, everything else must be an exact integer.
const FLOAT_ELIGIBLE_FIELDS: &[&str] = &["source_x", "source_y", "group_x", "group_y", "cdp_x", "cdp_y"];

#[derive(Debug, Clone)]
pub enum CompiledFieldEdit {
    Constant { name: String, value: i64 },
    Expression { name: String, expr: Expr },
    CopyFrom { name: String, source_field: String },
    CsvColumn { name: String, csv_file: PathBuf, csv_column: String, key_column: Option<String> },
}

impl CompiledFieldEdit {
    fn target(&self) -> &str {
        match self {
            CompiledFieldEdit::Constant { name, .. }
            | CompiledFieldEdit::Expression { name, .. }
            | CompiledFieldEdit::CopyFrom { name, .. }
            | CompiledFieldEdit::CsvColumn { name, .. } => name,
        }
    }
}

/// A `TraceHeaderEdit` operation, fully validated against the field table and
/// the expression grammar.
#[derive(Clone)]
pub struct CompiledTraceHeaderEdit {
    pub condition: Option<Expr>,
    pub fields: Vec<CompiledFieldEdit>,
}

/// Validate and parse one `TraceFieldEdit`. Every target/source field name is
/// checked against the trace-header table now, not at trace-processing time.
pub fn compile_field_edit(edit: &TraceFieldEdit, env: &Environment) -> Result<CompiledFieldEdit, SegyError> {
    field_table::trace_field(edit.target_field())?;
    match edit {
        TraceFieldEdit::Constant { name, value } => Ok(CompiledFieldEdit::Constant { name: name.clone(), value: *value }),
        TraceFieldEdit::Expression { name, expr } => {
            Ok(CompiledFieldEdit::Expression { name: name.clone(), expr: expr::parse(expr, env)? })
        }
        TraceFieldEdit::CopyFrom { name, source_field } => {
            field_table::trace_field(source_field)?;
            Ok(CompiledFieldEdit::CopyFrom { name: name.clone(), source_field: source_field.clone() })
        }
        TraceFieldEdit::CsvColumn { name, csv_file, csv_column, key_column } => {
            if let Some(kc) = key_column {
                field_table::trace_field(kc)?;
            }
            Ok(CompiledFieldEdit::CsvColumn {
                name: name.clone(),
                csv_file: csv_file.clone(),
                csv_column: csv_column.clone(),
                key_column: key_column.clone(),
            })
        }
    }
}

/// Compile a `TraceHeaderEdit`'s condition and field list.
pub fn compile_operation(
    condition: Option<&str>,
    fields: &[TraceFieldEdit],
    env: &Environment,
) -> Result<CompiledTraceHeaderEdit, SegyError> {
    let condition = condition.map(|c| expr::parse(c, env)).transpose()?;
    let fields = fields.iter().map(|f| compile_field_edit(f, env)).collect::<Result<Vec<_>, _>>()?;
    Ok(CompiledTraceHeaderEdit { condition, fields })
}

struct HeaderVars<'a> {
    header: &'a TraceHeaderBytes,
    trace_index: i64,
}

impl VarLookup for HeaderVars<'_> {
    fn lookup(&self, name: &str) -> Result<Value, SegyError> {
        if name == "trace_index" {
            Ok(Value::Int(self.trace_index))
        } else {
            Ok(Value::Int(self.header.get_by_name(name)?))
        }
    }
}

/// Lazily-loaded, plan-lifetime-cached CSV bindings, keyed by (file, column, key column).
#[derive(Default)]
pub struct CsvCache {
    bindings: HashMap<(PathBuf, String, Option<String>), CsvBinding>,
}

impl CsvCache {
    fn get_or_load(&mut self, csv_file: &PathBuf, column: &str, key_column: &Option<String>) -> Result<&mut CsvBinding, SegyError> {
        let key = (csv_file.clone(), column.to_string(), key_column.clone());
        if !self.bindings.contains_key(&key) {
            let source = CsvSource::load(csv_file)?;
            let binding = CsvBinding::new(source, column.to_string(), key_column.clone())?;
            self.bindings.insert(key.clone(), binding);
        }
        Ok(self.bindings.get_mut(&key).unwrap())
    }

    /// Log one warning per row-index-bound CSV source that had more rows than
    /// traces were processed (§4.7.1: "extras are ignored with a warning").
    /// Called once after the trace stream is exhausted, not per trace.
    pub fn warn_surplus_rows(&self, trace_count: usize) {
        for ((path, _, _), binding) in &self.bindings {
            if binding.has_surplus_rows(trace_count) {
                log::warn!(
                    "CSV source '{}' column '{}' has more rows than traces ({}); extra rows ignored",
                    path.display(),
                    binding.column(),
                    trace_count
                );
            }
        }
    }
}

/// Whether a per-trace error kind is recoverable at all (§7): everything else
/// (`UnknownField`, I/O, `WrongRegionLength`, ...) is fatal regardless of
/// `recovery` and always propagates. `OutOfRange` is only recoverable for
/// `Expression`/`CopyFrom`/`CsvColumn` edits: a `Constant` edit has no
/// fallback value to skip to, so it stays fatal even under `Skip`/`Warn`,
/// matching the binary-header editor's treatment of the same error.
fn is_recoverable(err: &SegyError, field: &CompiledFieldEdit) -> bool {
    if matches!(err, SegyError::OutOfRange { .. }) && matches!(field, CompiledFieldEdit::Constant { .. }) {
        return false;
    }
    matches!(
        err,
        SegyError::UnknownVariable { .. }
            | SegyError::UnknownFunction { .. }
            | SegyError::DivisionByZero
            | SegyError::OutOfRange { .. }
            | SegyError::CsvUnderflow { .. }
            | SegyError::CsvKeyMissing { .. }
            | SegyError::CsvTypeError { .. }
    )
}

fn error_kind(err: &SegyError) -> &'static str {
    match err {
        SegyError::UnknownVariable { .. } => "unknown_variable",
        SegyError::UnknownFunction { .. } => "unknown_function",
        SegyError::DivisionByZero => "division_by_zero",
        SegyError::OutOfRange { .. } => "out_of_range",
        SegyError::CsvUnderflow { .. } => "csv_underflow",
        SegyError::CsvKeyMissing { .. } => "csv_key_missing",
        SegyError::CsvTypeError { .. } => "csv_type_error",
        _ => "other",
    }
}

/// Tracks which `(operation index, error kind)` pairs have already produced a
/// warning, so repeats across traces stay silent (§7: "at most once per
/// (operation, kind)").
#[derive(Default)]
pub struct WarnedSet(std::collections::HashSet<(usize, &'static str)>);

impl WarnedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time this (operation, kind) pair is seen.
    fn first_time(&mut self, op_index: usize, kind: &'static str) -> bool {
        self.0.insert((op_index, kind))
    }
}

/// Apply every compiled `TraceHeaderEdit` to one trace, in plan order (§4.7).
///
/// A per-field error that [`is_recoverable`] is handled per `recovery`: `Abort`
/// propagates it (aborting the whole plan, the documented default); `Skip`
/// leaves the field at its prior value and moves on silently; `Warn` does the
/// same but logs once per `(operation, kind)` via `warned`. Anything else
/// (unknown field, I/O) always propagates regardless of `recovery`.
pub fn apply_trace(
    header: &mut TraceHeaderBytes,
    trace_index: usize,
    operations: &[CompiledTraceHeaderEdit],
    csv_cache: &mut CsvCache,
    recovery: RecoveryMode,
    warned: &mut WarnedSet,
) -> Result<Vec<ChangeEvent>, SegyError> {
    let mut events = Vec::new();
    for (op_index, op) in operations.iter().enumerate() {
        let current = HeaderVars { header, trace_index: trace_index as i64 };
        if let Some(cond) = &op.condition {
            if !cond.eval(&current)?.truthy() {
                continue;
            }
        }
        let snapshot = header.clone();
        let snapshot_vars = HeaderVars { header: &snapshot, trace_index: trace_index as i64 };

        for field in &op.fields {
            let target = field.target();
            let old_value = header.get_by_name(target)?;
            let computed: Result<i64, SegyError> = (|| match field {
                CompiledFieldEdit::Constant { value, .. } => Ok(*value),
                CompiledFieldEdit::Expression { expr, .. } => Ok(expr.eval(&snapshot_vars)?.to_field_i64()),
                CompiledFieldEdit::CopyFrom { source_field, .. } => snapshot.get_by_name(source_field),
                CompiledFieldEdit::CsvColumn { csv_file, csv_column, key_column, .. } => {
                    let key_value = match key_column {
                        Some(kc) => snapshot.get_by_name(kc)?,
                        None => 0,
                    };
                    let binding = csv_cache.get_or_load(csv_file, csv_column, key_column)?;
                    let raw = binding.value_for_trace(trace_index, key_value)?;
                    let allow_float = FLOAT_ELIGIBLE_FIELDS.contains(&target);
                    parse_cell(raw, allow_float)
                }
            })();

            let new_value = match computed.and_then(|v| header.set_by_name(target, v).map(|_| v)) {
                Ok(v) => v,
                Err(e) if is_recoverable(&e, field) && recovery != RecoveryMode::Abort => {
                    if recovery == RecoveryMode::Warn && warned.first_time(op_index, error_kind(&e)) {
                        log::warn!("trace {}: field '{}': {} (recovered, kept prior value)", trace_index, target, e);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };
            if old_value != new_value {
                events.push(ChangeEvent {
                    trace_index: Some(trace_index),
                    region: ChangeRegion::Trace,
                    field: target.to_string(),
                    old_value,
                    new_value,
                });
            }
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use segy_batch_core::TRACE_HEADER_LEN;

    fn header_with(field: &str, value: i64) -> TraceHeaderBytes {
        let mut h = TraceHeaderBytes::from_bytes([0u8; TRACE_HEADER_LEN]);
        h.set_by_name(field, value).unwrap();
        h
    }

    #[test]
    fn expression_edit_scales_source_x() {
        let env = Environment::trace();
        let op = compile_operation(
            None,
            &[TraceFieldEdit::Expression { name: "source_x".to_string(), expr: "source_x * 10".to_string() }],
            &env,
        )
        .unwrap();
        let mut header = header_with("source_x", 100);
        let mut cache = CsvCache::default();
        let mut warned = WarnedSet::new();
        let events = apply_trace(&mut header, 0, &[op], &mut cache, RecoveryMode::Abort, &mut warned).unwrap();
        assert_eq!(header.get_by_name("source_x").unwrap(), 1000);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn conditional_copy_only_applies_when_true() {
        let env = Environment::trace();
        let op = compile_operation(
            Some("trace_sequence_line > 100"),
            &[TraceFieldEdit::CopyFrom { name: "cdp_x".to_string(), source_field: "source_x".to_string() }],
            &env,
        )
        .unwrap();
        let mut cache = CsvCache::default();
        let mut warned = WarnedSet::new();

        let mut low = header_with("trace_sequence_line", 50);
        low.set_by_name("source_x", 777).unwrap();
        apply_trace(&mut low, 0, &[op.clone()], &mut cache, RecoveryMode::Abort, &mut warned).unwrap();
        assert_eq!(low.get_by_name("cdp_x").unwrap(), 0);

        let mut high = header_with("trace_sequence_line", 150);
        high.set_by_name("source_x", 777).unwrap();
        apply_trace(&mut high, 0, &[op], &mut cache, RecoveryMode::Abort, &mut warned).unwrap();
        assert_eq!(high.get_by_name("cdp_x").unwrap(), 777);
    }

    #[test]
    fn same_operation_expressions_see_pre_op_snapshot_not_each_other() {
        let env = Environment::trace();
        let op = compile_operation(
            None,
            &[
                TraceFieldEdit::Expression { name: "source_x".to_string(), expr: "source_x + 1".to_string() },
                TraceFieldEdit::Expression { name: "group_x".to_string(), expr: "source_x + 1".to_string() },
            ],
            &env,
        )
        .unwrap();
        let mut header = header_with("source_x", 10);
        let mut cache = CsvCache::default();
        let mut warned = WarnedSet::new();
        apply_trace(&mut header, 0, &[op], &mut cache, RecoveryMode::Abort, &mut warned).unwrap();
        assert_eq!(header.get_by_name("source_x").unwrap(), 11);
        // group_x's expression reads source_x from the snapshot (10), not the
        // already-updated live value (11).
        assert_eq!(header.get_by_name("group_x").unwrap(), 11);
    }

    #[test]
    fn skip_recovery_still_propagates_out_of_range_for_constant_edit() {
        // A constant has no fallback value to skip to, so it stays fatal even
        // under Skip/Warn (matches binary_editor's treatment of the same error).
        let env = Environment::trace();
        let op = compile_operation(
            None,
            &[TraceFieldEdit::Constant { name: "coordinate_scalar".to_string(), value: 100_000 }],
            &env,
        )
        .unwrap();
        let mut header = header_with("coordinate_scalar", 7);
        let mut cache = CsvCache::default();
        let mut warned = WarnedSet::new();
        let err = apply_trace(&mut header, 0, &[op], &mut cache, RecoveryMode::Skip, &mut warned).unwrap_err();
        assert!(matches!(err, SegyError::OutOfRange { .. }));
        assert_eq!(header.get_by_name("coordinate_scalar").unwrap(), 7);
    }

    #[test]
    fn skip_recovery_leaves_field_untouched_on_out_of_range_for_expression_edit() {
        let env = Environment::trace();
        let op = compile_operation(
            None,
            &[TraceFieldEdit::Expression { name: "coordinate_scalar".to_string(), expr: "100000".to_string() }],
            &env,
        )
        .unwrap();
        let mut header = header_with("coordinate_scalar", 7);
        let mut cache = CsvCache::default();
        let mut warned = WarnedSet::new();
        let events = apply_trace(&mut header, 0, &[op], &mut cache, RecoveryMode::Skip, &mut warned).unwrap();
        assert!(events.is_empty());
        assert_eq!(header.get_by_name("coordinate_scalar").unwrap(), 7);
    }

    #[test]
    fn abort_recovery_propagates_out_of_range() {
        let env = Environment::trace();
        let op = compile_operation(
            None,
            &[TraceFieldEdit::Constant { name: "coordinate_scalar".to_string(), value: 100_000 }],
            &env,
        )
        .unwrap();
        let mut header = header_with("coordinate_scalar", 7);
        let mut cache = CsvCache::default();
        let mut warned = WarnedSet::new();
        let err = apply_trace(&mut header, 0, &[op], &mut cache, RecoveryMode::Abort, &mut warned).unwrap_err();
        assert!(matches!(err, SegyError::OutOfRange { .. }));
    }
}
