//! The normalized, vendor-agnostic schema model shared by every dialect
//! extractor and consumed by the comparison engine.
//!
//! Identifiers are stored exactly as the catalog returned them, but every
//! lookup and comparison goes through [`case_fold`] so `USERS` and `users`
//! are the same table.

mod column;
mod constraint;
mod index;
mod schema;
mod signature;
mod table;
mod type_spec;
mod validate;

pub use column::{strip_default_wrapping, Column};
pub use constraint::{Constraint, ConstraintKind, ForeignKeyAction};
pub use index::{Index, IndexType};
pub use schema::SchemaModel;
pub use signature::{normalize_check_clause, Signature};
pub use table::Table;
pub use type_spec::TypeSpec;
pub use validate::{validate, ValidationWarning};

/// Case-folds an identifier for comparison purposes. The catalog form of the
/// identifier is always preserved on the entity itself; this is only used as
/// a map key or an equality check.
pub fn case_fold(ident: &str) -> String {
    ident.to_lowercase()
}
