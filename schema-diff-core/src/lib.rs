//! Wires the four subsystems together into one comparison run: resolve each
//! side (provisioning an ephemeral container first, if it's a script),
//! extract a [`schema_diff_model::SchemaModel`] from each, and diff them.
//!
//! The CLI argument parser, exit-code mapping, and human-readable renderer
//! are deliberately not here — this crate's public surface ends at
//! `(DiffTree, Status)` and a classified [`CoreError`].

mod error;
mod pipeline;
mod side;
mod status;

pub use error::CoreError;
pub use pipeline::run_comparison;
pub use side::SideSpec;
pub use status::Status;

pub use schema_diff_compare::DiffTree;
pub use schema_diff_extract::framework::{NoopProgressListener, Phase, ProgressListener, TracingProgressListener};
pub use schema_diff_provisioner::ExecutionPolicy;
pub use schema_diff_types::Dialect;
