use crate::signature::{self, Signature};
use serde::{Deserialize, Serialize};

/// Canonical foreign-key referential action. Vendor-specific encodings are
/// normalized to these tokens by each extractor before the constraint ever
/// reaches the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ForeignKeyAction {
    pub fn as_token(self) -> &'static str {
        match self {
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET_NULL",
            ForeignKeyAction::SetDefault => "SET_DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
            ForeignKeyAction::NoAction => "NO_ACTION",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey {
        referenced_table: String,
        referenced_columns: Vec<String>,
        on_update: ForeignKeyAction,
        on_delete: ForeignKeyAction,
    },
    Unique,
    Check {
        clause: String,
    },
}

/// A table-level constraint. `name` is advisory only: matching between two
/// models is always done through [`Constraint::signature`], never through
/// the name, because vendor constraint names are frequently generated and
/// unstable (`SYS_C0012345` in Oracle, random hashes in Postgres).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub columns: Vec<String>,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn primary_key(name: impl Into<String>, columns: Vec<String>) -> Self {
        Constraint {
            name: name.into(),
            columns,
            kind: ConstraintKind::PrimaryKey,
        }
    }

    pub fn unique(name: impl Into<String>, columns: Vec<String>) -> Self {
        Constraint {
            name: name.into(),
            columns,
            kind: ConstraintKind::Unique,
        }
    }

    pub fn foreign_key(
        name: impl Into<String>,
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
        on_update: ForeignKeyAction,
        on_delete: ForeignKeyAction,
    ) -> Self {
        Constraint {
            name: name.into(),
            columns,
            kind: ConstraintKind::ForeignKey {
                referenced_table: referenced_table.into(),
                referenced_columns,
                on_update,
                on_delete,
            },
        }
    }

    pub fn check(name: impl Into<String>, columns: Vec<String>, clause: impl Into<String>) -> Self {
        Constraint {
            name: name.into(),
            columns,
            kind: ConstraintKind::Check { clause: clause.into() },
        }
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey)
    }
}

impl Signature for Constraint {
    /// Pure function of the constraint's semantically significant fields.
    /// Never consults the enclosing table or model.
    fn signature(&self) -> String {
        match &self.kind {
            ConstraintKind::PrimaryKey => signature::pk_signature(&self.columns),
            ConstraintKind::Unique => signature::unique_signature(&self.columns),
            ConstraintKind::ForeignKey {
                referenced_table,
                referenced_columns,
                on_update,
                on_delete,
            } => signature::fk_signature(
                &self.columns,
                referenced_table,
                referenced_columns,
                *on_update,
                *on_delete,
            ),
            ConstraintKind::Check { clause } => signature::check_signature(clause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_does_not_affect_signature() {
        let a = Constraint::unique("UK_X", vec!["email".into()]);
        let b = Constraint::unique("UQ_E", vec!["email".into()]);
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn column_order_affects_signature() {
        let a = Constraint::unique("u", vec!["a".into(), "b".into()]);
        let b = Constraint::unique("u", vec!["b".into(), "a".into()]);
        assert_ne!(a.signature(), b.signature());
    }
}
