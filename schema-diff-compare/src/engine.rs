use crate::diff::{column_mismatches, ColumnMismatch, DiffTree, TableDiff};
use indexmap::IndexMap;
use schema_diff_model::{case_fold, Constraint, Index, SchemaModel, Signature, Table};
use schema_diff_types::{Dialect, TypeNormalizer};

/// Compares a reference model against a target one, hierarchically: tables
/// first, then (for tables present on both sides) columns, constraints, and
/// indexes. Constraints and indexes are matched solely by signature, never
/// by name (see [`Signature`]).
///
/// `dialect` selects the [`TypeNormalizer`] used for the column type
/// comparison; both models are expected to come from the same dialect. A
/// cross-dialect comparison is outside this engine's scope and will simply
/// report every differently-spelled type as a mismatch.
pub fn compare(reference: &SchemaModel, target: &SchemaModel, dialect: Dialect) -> DiffTree {
    let normalizer = TypeNormalizer::new(dialect);

    let reference_names: IndexMap<String, &str> = reference.table_names().map(|n| (case_fold(n), n)).collect();
    let target_names: IndexMap<String, &str> = target.table_names().map(|n| (case_fold(n), n)).collect();

    let mut missing_tables: Vec<String> = reference_names
        .iter()
        .filter(|(folded, _)| !target_names.contains_key(*folded))
        .map(|(_, name)| name.to_string())
        .collect();
    missing_tables.sort();

    let mut extra_tables: Vec<String> = target_names
        .iter()
        .filter(|(folded, _)| !reference_names.contains_key(*folded))
        .map(|(_, name)| name.to_string())
        .collect();
    extra_tables.sort();

    let mut shared: Vec<&str> = reference_names
        .iter()
        .filter(|(folded, _)| target_names.contains_key(*folded))
        .map(|(_, name)| *name)
        .collect();
    shared.sort_by_key(|name| case_fold(name));

    let mut tables = Vec::new();
    for name in shared {
        let r_table = reference.table(name).expect("present on both sides by construction");
        let t_table = target.table(name).expect("present on both sides by construction");
        let diff = compare_table(r_table, t_table, &normalizer);
        if !diff.is_empty() {
            tables.push(diff);
        }
    }

    DiffTree {
        missing_tables,
        extra_tables,
        tables,
    }
}

fn compare_table(reference: &Table, target: &Table, normalizer: &TypeNormalizer) -> TableDiff {
    let mut diff = TableDiff {
        name: reference.name.clone(),
        ..Default::default()
    };

    let target_columns: IndexMap<String, &schema_diff_model::Column> =
        target.columns.iter().map(|c| (case_fold(&c.name), c)).collect();
    let reference_columns: IndexMap<String, &schema_diff_model::Column> =
        reference.columns.iter().map(|c| (case_fold(&c.name), c)).collect();

    for column in &reference.columns {
        let folded = case_fold(&column.name);
        match target_columns.get(&folded) {
            None => diff.missing_columns.push(column.name.clone()),
            Some(target_column) => {
                let equivalent_types = normalizer.equivalent(&column.tpe, &target_column.tpe);
                for kind in column_mismatches(column, target_column, equivalent_types) {
                    diff.modified_columns.push(ColumnMismatch {
                        column: column.name.clone(),
                        kind,
                    });
                }
            }
        }
    }
    for column in &target.columns {
        if !reference_columns.contains_key(&case_fold(&column.name)) {
            diff.extra_columns.push(column.name.clone());
        }
    }

    let (missing_constraints, extra_constraints) = diff_by_signature(&reference.constraints, &target.constraints);
    diff.missing_constraints = missing_constraints;
    diff.extra_constraints = extra_constraints;

    let (missing_indexes, extra_indexes) = diff_by_signature(&reference.indexes, &target.indexes);
    diff.missing_indexes = missing_indexes;
    diff.extra_indexes = extra_indexes;

    diff
}

/// Builds a signature multiset for each side and reports what's missing
/// (present in `reference`, absent from `target`) and extra (the reverse).
/// A signature appearing `n` times on one side and `m` times on the other
/// contributes `max(0, n - m)` missing and `max(0, m - n)` extra entries,
/// preserving each side's original object for the report.
fn diff_by_signature<T: Signature + Clone>(reference: &[T], target: &[T]) -> (Vec<T>, Vec<T>) {
    let mut target_counts: IndexMap<String, usize> = IndexMap::new();
    for item in target {
        *target_counts.entry(item.signature()).or_insert(0) += 1;
    }

    let mut missing = Vec::new();
    for item in reference {
        let sig = item.signature();
        let count = target_counts.entry(sig).or_insert(0);
        if *count == 0 {
            missing.push(item.clone());
        } else {
            *count -= 1;
        }
    }

    let mut reference_counts: IndexMap<String, usize> = IndexMap::new();
    for item in reference {
        *reference_counts.entry(item.signature()).or_insert(0) += 1;
    }

    let mut extra = Vec::new();
    for item in target {
        let sig = item.signature();
        let count = reference_counts.entry(sig).or_insert(0);
        if *count == 0 {
            extra.push(item.clone());
        } else {
            *count -= 1;
        }
    }

    (missing, extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_diff_model::{Column, ForeignKeyAction, IndexType, TypeSpec};

    fn sample_model() -> SchemaModel {
        let mut model = SchemaModel::new("public");
        let mut table = Table::new("users");
        table.columns.push(Column::new("id", 1, TypeSpec::new("integer")));
        table.columns.push(Column::new("email", 2, TypeSpec::new("varchar").with_length(255)));
        table.constraints.push(Constraint::primary_key("pk_users", vec!["id".into()]));
        table.constraints.push(Constraint::unique("uq_email", vec!["email".into()]));
        table.indexes.push(Index::new("ix_email", vec!["email".into()], true, IndexType::BTree));
        model.insert_table(table);
        model
    }

    #[test]
    fn identical_models_produce_an_empty_tree() {
        let model = sample_model();
        let diff = compare(&model, &model, Dialect::Postgres);
        assert!(diff.is_empty());
    }

    #[test]
    fn missing_table_is_reported() {
        let reference = sample_model();
        let target = SchemaModel::new("public");
        let diff = compare(&reference, &target, Dialect::Postgres);
        assert_eq!(diff.missing_tables, vec!["users".to_string()]);
        assert!(diff.tables.is_empty());
    }

    #[test]
    fn extra_table_is_reported() {
        let reference = SchemaModel::new("public");
        let target = sample_model();
        let diff = compare(&reference, &target, Dialect::Postgres);
        assert_eq!(diff.extra_tables, vec!["users".to_string()]);
    }

    #[test]
    fn constraint_name_differences_do_not_produce_a_diff() {
        let reference = sample_model();
        let mut target = SchemaModel::new("public");
        let mut table = Table::new("users");
        table.columns.push(Column::new("id", 1, TypeSpec::new("integer")));
        table.columns.push(Column::new("email", 2, TypeSpec::new("varchar").with_length(255)));
        table.constraints.push(Constraint::primary_key("PK_USERS_X", vec!["id".into()]));
        table.constraints.push(Constraint::unique("UK_E", vec!["email".into()]));
        table.indexes.push(Index::new("idx_e", vec!["email".into()], true, IndexType::BTree));
        target.insert_table(table);

        let diff = compare(&reference, &target, Dialect::Postgres);
        assert!(diff.is_empty());
    }

    #[test]
    fn dropped_foreign_key_is_reported_as_missing() {
        let mut reference = SchemaModel::new("public");
        let mut r_table = Table::new("orders");
        r_table.columns.push(Column::new("id", 1, TypeSpec::new("integer")));
        r_table.constraints.push(Constraint::foreign_key(
            "fk_user",
            vec!["user_id".into()],
            "users",
            vec!["id".into()],
            ForeignKeyAction::NoAction,
            ForeignKeyAction::Cascade,
        ));
        reference.insert_table(r_table);

        let mut target = SchemaModel::new("public");
        let mut t_table = Table::new("orders");
        t_table.columns.push(Column::new("id", 1, TypeSpec::new("integer")));
        target.insert_table(t_table);

        let diff = compare(&reference, &target, Dialect::Postgres);
        assert_eq!(diff.tables.len(), 1);
        assert_eq!(diff.tables[0].missing_constraints.len(), 1);
        assert!(diff.tables[0].extra_constraints.is_empty());
    }

    #[test]
    fn type_alias_spelling_is_not_a_mismatch() {
        let mut reference = SchemaModel::new("public");
        let mut r_table = Table::new("widgets");
        r_table.columns.push(Column::new("count", 1, TypeSpec::new("int4")));
        reference.insert_table(r_table);

        let mut target = SchemaModel::new("public");
        let mut t_table = Table::new("widgets");
        t_table.columns.push(Column::new("count", 1, TypeSpec::new("integer")));
        target.insert_table(t_table);

        let diff = compare(&reference, &target, Dialect::Postgres);
        assert!(diff.is_empty());
    }

    #[test]
    fn length_change_is_reported_as_a_type_mismatch() {
        let mut reference = SchemaModel::new("public");
        let mut r_table = Table::new("widgets");
        r_table
            .columns
            .push(Column::new("name", 1, TypeSpec::new("varchar").with_length(100)));
        reference.insert_table(r_table);

        let mut target = SchemaModel::new("public");
        let mut t_table = Table::new("widgets");
        t_table
            .columns
            .push(Column::new("name", 1, TypeSpec::new("varchar").with_length(200)));
        target.insert_table(t_table);

        let diff = compare(&reference, &target, Dialect::Postgres);
        assert_eq!(diff.tables.len(), 1);
        assert_eq!(diff.tables[0].modified_columns.len(), 1);
    }
}
