use schema_diff_core::Status;

#[test]
fn empty_diff_tree_is_identical() {
    let diff = schema_diff_compare::DiffTree::default();
    assert_eq!(Status::from_diff(&diff), Status::Identical);
}

#[test]
fn non_empty_diff_tree_is_differences_found() {
    let mut diff = schema_diff_compare::DiffTree::default();
    diff.missing_tables.push("orders".to_string());
    assert_eq!(Status::from_diff(&diff), Status::DifferencesFound);
}
