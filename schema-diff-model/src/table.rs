use crate::{Column, Constraint, Index};
use serde::{Deserialize, Serialize};

/// One table of a [`SchemaModel`](crate::SchemaModel).
///
/// Column order is preserved (catalog `ordinal_position`). Constraints and
/// indexes are logically sets matched by signature, but stored as `Vec` to
/// keep extraction deterministic and because the comparison engine builds
/// its own signature multisets from them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
    pub indexes: Vec<Index>,
    pub comment: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            comment: None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        let folded = crate::case_fold(name);
        self.columns.iter().find(|c| crate::case_fold(&c.name) == folded)
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.is_primary_key())
    }
}
