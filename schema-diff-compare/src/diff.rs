use schema_diff_model::{Column, Constraint, Index};
use serde::{Deserialize, Serialize};

/// The full result of comparing a reference [`SchemaModel`](schema_diff_model::SchemaModel)
/// against a target one. Tables are ordered alphabetically by case-folded
/// name; within a table, missing/extra/modified objects are emitted in that
/// order for every object type, so two runs over the same pair of models
/// always produce byte-identical output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffTree {
    pub missing_tables: Vec<String>,
    pub extra_tables: Vec<String>,
    pub tables: Vec<TableDiff>,
}

impl DiffTree {
    pub fn is_empty(&self) -> bool {
        self.missing_tables.is_empty() && self.extra_tables.is_empty() && self.tables.is_empty()
    }
}

/// The diff for one table present on both sides. Only constructed when at
/// least one field below is non-empty; a table with no drift never appears
/// in [`DiffTree::tables`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDiff {
    pub name: String,
    pub missing_columns: Vec<String>,
    pub extra_columns: Vec<String>,
    pub modified_columns: Vec<ColumnMismatch>,
    pub missing_constraints: Vec<Constraint>,
    pub extra_constraints: Vec<Constraint>,
    pub missing_indexes: Vec<Index>,
    pub extra_indexes: Vec<Index>,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.missing_columns.is_empty()
            && self.extra_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.missing_constraints.is_empty()
            && self.extra_constraints.is_empty()
            && self.missing_indexes.is_empty()
            && self.extra_indexes.is_empty()
    }
}

/// One atomic mismatch between a reference column and its target
/// counterpart of the same name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnMismatch {
    pub column: String,
    pub kind: ColumnMismatchKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnMismatchKind {
    Type { reference: String, target: String },
    Nullability { reference: bool, target: bool },
    AutoIncrement { reference: bool, target: bool },
    Unsigned { reference: bool, target: bool },
    Default { reference: Option<String>, target: Option<String> },
}

pub(crate) fn column_mismatches(reference: &Column, target: &Column, equivalent_types: bool) -> Vec<ColumnMismatchKind> {
    let mut mismatches = Vec::new();

    if !equivalent_types {
        mismatches.push(ColumnMismatchKind::Type {
            reference: format!("{:?}", reference.tpe),
            target: format!("{:?}", target.tpe),
        });
    }
    if reference.nullable != target.nullable {
        mismatches.push(ColumnMismatchKind::Nullability {
            reference: reference.nullable,
            target: target.nullable,
        });
    }
    if reference.auto_increment != target.auto_increment {
        mismatches.push(ColumnMismatchKind::AutoIncrement {
            reference: reference.auto_increment,
            target: target.auto_increment,
        });
    }
    if reference.unsigned != target.unsigned {
        mismatches.push(ColumnMismatchKind::Unsigned {
            reference: reference.unsigned,
            target: target.unsigned,
        });
    }
    if reference.default != target.default {
        mismatches.push(ColumnMismatchKind::Default {
            reference: reference.default.clone(),
            target: target.default.clone(),
        });
    }

    mismatches
}
