use crate::{case_fold, Table};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The top-level, vendor-normalized schema extracted from one side of a
/// comparison.
///
/// Tables are keyed by case-folded name in an [`IndexMap`] so catalog order
/// is preserved for deterministic iteration while lookups are
/// case-insensitive. Immutable from the moment the extractor returns it;
/// may be read concurrently by the comparison engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    pub schema_name: String,
    tables: IndexMap<String, Table>,
}

impl SchemaModel {
    pub fn new(schema_name: impl Into<String>) -> Self {
        SchemaModel {
            schema_name: schema_name.into(),
            tables: IndexMap::new(),
        }
    }

    /// Inserts a table, keyed by its case-folded name. Panics if a table
    /// with the same case-folded name already exists: the extractor phases
    /// are responsible for not producing duplicate catalog rows.
    pub fn insert_table(&mut self, table: Table) {
        let key = case_fold(&table.name);
        let previous = self.tables.insert(key, table);
        assert!(previous.is_none(), "duplicate table name in a single SchemaModel");
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&case_fold(name))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.values().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Table;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut model = SchemaModel::new("public");
        model.insert_table(Table::new("Users"));
        assert!(model.table("users").is_some());
        assert!(model.table("USERS").is_some());
    }

    #[test]
    fn table_name_is_preserved_as_returned_by_catalog() {
        let mut model = SchemaModel::new("public");
        model.insert_table(Table::new("Users"));
        assert_eq!(model.table("users").unwrap().name, "Users");
    }
}
