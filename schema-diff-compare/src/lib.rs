//! The hierarchical, signature-based diff engine. Tables are compared first;
//! within a table present on both sides, columns, then constraints, then
//! indexes are compared, so a dropped table never also produces a flood of
//! dropped-column/constraint/index noise for objects that belong to it.

mod diff;
mod engine;

pub use diff::{ColumnMismatch, ColumnMismatchKind, DiffTree, TableDiff};
pub use engine::compare;
