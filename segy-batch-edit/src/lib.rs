//! Declarative SEG-Y batch edit plans.
//!
//! Ties the reader ([`segy_batch_in`]) and writer ([`segy_batch_out`])
//! together with the plan types, the sandboxed expression evaluator, the
//! header editors, CSV binding, the validator, and the orchestrating
//! [`engine::run_plan`].
pub mod binary_editor;
pub mod changelog;
pub mod csv_binding;
pub mod ebcdic_editor;
pub mod engine;
pub mod expr;
pub mod plan;
pub mod trace_editor;
pub mod validator;

pub use engine::{run_plan, RunSummary};
pub use plan::{
    BinaryFieldEdit, ChangeEvent, ChangeRegion, CoordinateRange, EbcdicEditMode, EditOperation, EditPlan,
    OutlierCheck, OutputMode, TraceFieldEdit, ValidationConfig,
};
pub use validator::{Finding, FindingSubject, Severity};
