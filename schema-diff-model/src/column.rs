use crate::TypeSpec;
use serde::{Deserialize, Serialize};

/// One column of a [`Table`](crate::Table).
///
/// `table` is a case-folded back-reference to the owning table's name, never
/// a pointer, per the arena-plus-index layout described for the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ordinal_position: u32,
    pub tpe: TypeSpec,
    pub nullable: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
    pub unsigned: bool,
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, ordinal_position: u32, tpe: TypeSpec) -> Self {
        Column {
            name: name.into(),
            ordinal_position,
            tpe,
            nullable: true,
            default: None,
            auto_increment: false,
            unsigned: false,
            comment: None,
        }
    }
}

/// Strips the universal wrapping a raw catalog default value arrives in:
/// surrounding single quotes if the whole value is quoted, and MSSQL's
/// surrounding parentheses.
///
/// This performs no semantic normalization of the expression itself.
/// Default-value equality is always syntactic.
pub fn strip_default_wrapping(raw: &str) -> String {
    let mut value = raw.trim();

    loop {
        if value.len() >= 2 && value.starts_with('(') && value.ends_with(')') {
            value = &value[1..value.len() - 1];
            continue;
        }
        if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
            value = &value[1..value.len() - 1];
            continue;
        }
        break;
    }

    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_quotes() {
        assert_eq!(strip_default_wrapping("'active'"), "active");
    }

    #[test]
    fn strips_mssql_parens() {
        assert_eq!(strip_default_wrapping("((0))"), "0");
    }

    #[test]
    fn leaves_unwrapped_values_alone() {
        assert_eq!(strip_default_wrapping("CURRENT_TIMESTAMP"), "CURRENT_TIMESTAMP");
    }

    #[test]
    fn leaves_partial_quote_alone() {
        assert_eq!(strip_default_wrapping("'it''s"), "'it''s");
    }
}
