use crate::{case_fold, constraint::ConstraintKind, signature::Signature, SchemaModel};
use std::collections::HashSet;

/// A non-fatal finding surfaced by [`validate`]. These are delivered to the
/// caller as progress-callback warnings (`onWarning`), never promoted to
/// errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A foreign key's referenced table is not present in this model.
    DanglingReference { table: String, constraint: String, referenced_table: String },
}

/// Runs the post-extraction metadata validation hook described for the
/// extractor framework:
///
/// - every constraint's column list references real columns of its table
///   (violation is a bug in the extractor, so this panics)
/// - no duplicate signatures within a single table (likewise a bug)
/// - every FK's referenced table either exists in the model or is reported
///   as a dangling-reference warning (this one is a legitimate, non-fatal
///   outcome: the reference may live in a schema this extraction did not
///   scan)
pub fn validate(model: &SchemaModel) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for table in model.tables() {
        let column_names: HashSet<String> = table.columns.iter().map(|c| case_fold(&c.name)).collect();

        for constraint in &table.constraints {
            for column in &constraint.columns {
                assert!(
                    column_names.contains(&case_fold(column)),
                    "constraint {} on table {} references unknown column {}",
                    constraint.name,
                    table.name,
                    column
                );
            }

            if let ConstraintKind::ForeignKey { referenced_table, .. } = &constraint.kind {
                if model.table(referenced_table).is_none() {
                    warnings.push(ValidationWarning::DanglingReference {
                        table: table.name.clone(),
                        constraint: constraint.name.clone(),
                        referenced_table: referenced_table.clone(),
                    });
                }
            }
        }

        let mut seen_constraint_signatures = HashSet::new();
        for constraint in &table.constraints {
            assert!(
                seen_constraint_signatures.insert(constraint.signature()),
                "duplicate constraint signature on table {}",
                table.name
            );
        }

        let mut seen_index_signatures = HashSet::new();
        for index in &table.indexes {
            assert!(
                seen_index_signatures.insert(index.signature()),
                "duplicate index signature on table {}",
                table.name
            );
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, Constraint, ForeignKeyAction, Table, TypeSpec};

    #[test]
    fn flags_dangling_foreign_key() {
        let mut model = SchemaModel::new("public");
        let mut orders = Table::new("orders");
        orders.columns.push(Column::new("user_id", 1, TypeSpec::new("int")));
        orders.constraints.push(Constraint::foreign_key(
            "fk_user",
            vec!["user_id".into()],
            "users",
            vec!["id".into()],
            ForeignKeyAction::NoAction,
            ForeignKeyAction::NoAction,
        ));
        model.insert_table(orders);

        let warnings = validate(&model);
        assert_eq!(
            warnings,
            vec![ValidationWarning::DanglingReference {
                table: "orders".into(),
                constraint: "fk_user".into(),
                referenced_table: "users".into(),
            }]
        );
    }

    #[test]
    fn no_warnings_when_referenced_table_exists() {
        let mut model = SchemaModel::new("public");
        model.insert_table(Table::new("users"));

        let mut orders = Table::new("orders");
        orders.columns.push(Column::new("user_id", 1, TypeSpec::new("int")));
        orders.constraints.push(Constraint::foreign_key(
            "fk_user",
            vec!["user_id".into()],
            "users",
            vec!["id".into()],
            ForeignKeyAction::NoAction,
            ForeignKeyAction::NoAction,
        ));
        model.insert_table(orders);

        assert!(validate(&model).is_empty());
    }

    #[test]
    #[should_panic(expected = "references unknown column")]
    fn panics_on_constraint_referencing_unknown_column() {
        let mut model = SchemaModel::new("public");
        let mut table = Table::new("orders");
        table.constraints.push(Constraint::unique("uq", vec!["ghost".into()]));
        model.insert_table(table);
        validate(&model);
    }
}
