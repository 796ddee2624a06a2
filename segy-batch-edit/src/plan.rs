//! The declarative edit plan: the tagged unions in §3, made concrete as Rust enums.
//!
//! `serde` derives are feature-gated the same way the teacher's `SegySettings`
//! optionally derives `Serialize`/`Deserialize` (`giga-segy-core`'s `serde`
//! feature) — the YAML loader that turns a plan file into one of these values
//! is an external collaborator (§1 Non-goals), but the type it produces lives
//! here so that collaborator and the engine agree on a schema.
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use segy_batch_core::RecoveryMode;

/// Where edited output goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum OutputMode {
    InPlace,
    SeparateFolder { output_dir: PathBuf },
    Discard,
}

/// Bounds and parameters for the opt-in validator checks (§4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    pub check_file_structure: bool,
    pub check_coordinate_range: Option<CoordinateRange>,
    pub check_coordinate_outliers: Option<OutlierCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinateRange {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutlierCheck {
    #[serde(default = "default_k")]
    pub k: f64,
}

fn default_k() -> f64 {
    10.0
}

/// A single binary-header field write, or a custom-offset write when the name
/// isn't one of the canonical fields (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryFieldEdit {
    pub name: String,
    pub value: i64,
    #[serde(default)]
    pub custom_offset: Option<CustomOffset>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomOffset {
    pub offset: usize,
    pub width: u8,
    pub signed: bool,
}

/// One entry of a `TraceHeaderEdit`'s field list (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum TraceFieldEdit {
    Constant { name: String, value: i64 },
    Expression { name: String, expr: String },
    CopyFrom { name: String, source_field: String },
    CsvColumn { name: String, csv_file: PathBuf, csv_column: String, key_column: Option<String> },
}

impl TraceFieldEdit {
    pub fn target_field(&self) -> &str {
        match self {
            TraceFieldEdit::Constant { name, .. }
            | TraceFieldEdit::Expression { name, .. }
            | TraceFieldEdit::CopyFrom { name, .. }
            | TraceFieldEdit::CsvColumn { name, .. } => name,
        }
    }
}

/// The tagged union of edit operations (§3), applied in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum EditOperation {
    EbcdicEdit {
        mode: EbcdicEditMode,
    },
    BinaryHeader {
        fields: Vec<BinaryFieldEdit>,
    },
    TraceHeader {
        condition: Option<String>,
        fields: Vec<TraceFieldEdit>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum EbcdicEditMode {
    Lines { lines: BTreeMap<usize, String> },
    Template { template: Vec<String> },
}

/// A fully specified batch edit plan (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditPlan {
    pub output_mode: OutputMode,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub validations: ValidationConfig,
    #[serde(default)]
    pub recovery_mode: RecoveryMode,
    pub edits: Vec<EditOperation>,
}

/// One mutation recorded to the changelog (§6).
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub trace_index: Option<usize>,
    pub region: ChangeRegion,
    pub field: String,
    pub old_value: i64,
    pub new_value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeRegion {
    Ebcdic,
    Binary,
    Trace,
}

impl ChangeRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRegion::Ebcdic => "ebcdic",
            ChangeRegion::Binary => "binary",
            ChangeRegion::Trace => "trace",
        }
    }
}
