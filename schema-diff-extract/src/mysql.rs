//! MySQL / MariaDB extractor.
//!
//! Reads `information_schema.tables/columns/key_column_usage/table_constraints`
//! and `information_schema.statistics` for indexes. MySQL keys foreign keys by
//! constraint name across `key_column_usage` and `referential_constraints`
//! rather than exposing the action columns directly on `key_column_usage`, so
//! constraints are joined through `CONSTRAINT_NAME`, not re-derived per row.

use crate::error::ExtractError;
use crate::framework::{begin_read_committed_snapshot, end_read_committed_snapshot, DialectExtractor};
use async_trait::async_trait;
use quaint::prelude::*;
use quaint::single::Quaint;
use schema_diff_model::{strip_default_wrapping, Column, Constraint, ForeignKeyAction, Index, IndexType, Table, TypeSpec};
use schema_diff_types::Dialect;
use std::collections::HashMap;

pub struct MySqlExtractor {
    conn: Quaint,
    schema: String,
}

impl MySqlExtractor {
    pub async fn connect(url: &str, schema: impl Into<String>) -> Result<Self, ExtractError> {
        let conn = Quaint::new(url)
            .await
            .map_err(|err| ExtractError::Configuration(err.to_string()))?;
        Ok(MySqlExtractor {
            conn,
            schema: schema.into(),
        })
    }
}

#[async_trait]
impl DialectExtractor for MySqlExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn schema_name(&self) -> String {
        self.schema.clone()
    }

    async fn begin_scope(&self) -> Result<(), ExtractError> {
        begin_read_committed_snapshot(&self.conn, "SET SESSION TRANSACTION ISOLATION LEVEL READ COMMITTED").await
    }

    async fn end_scope(&self) {
        end_read_committed_snapshot(&self.conn).await;
    }

    async fn extract_tables(&self, attempt: u32) -> Result<Vec<Table>, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT table_name, table_comment
                 FROM information_schema.tables
                 WHERE table_schema = ? AND table_type = 'BASE TABLE'
                 ORDER BY table_name",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut table = Table::new(row["table_name"].to_string().unwrap_or_default());
                let comment = row["table_comment"].to_string().unwrap_or_default();
                table.comment = if comment.is_empty() { None } else { Some(comment) };
                table
            })
            .collect())
    }

    async fn extract_columns(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT table_name, column_name, ordinal_position, data_type, column_type,
                        character_maximum_length, numeric_precision, numeric_scale,
                        is_nullable, column_default, extra, column_comment
                 FROM information_schema.columns
                 WHERE table_schema = ?
                 ORDER BY table_name, ordinal_position",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for row in rows {
            let table_name = row["table_name"].to_string().unwrap_or_default();
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };

            let column_type = row["column_type"].to_string().unwrap_or_default();
            let unsigned = column_type.to_lowercase().contains("unsigned");

            let mut tpe = TypeSpec::new(row["data_type"].to_string().unwrap_or_default());
            if let Some(len) = row["character_maximum_length"].as_i64() {
                tpe = tpe.with_length(len as u64);
            }
            if let (Some(precision), Some(scale)) = (row["numeric_precision"].as_i64(), row["numeric_scale"].as_i64())
            {
                tpe = tpe.with_precision_scale(precision as u32, scale as u32);
            }
            if unsigned {
                tpe = tpe.unsigned();
            }

            let extra = row["extra"].to_string().unwrap_or_default().to_lowercase();
            let comment = row["column_comment"].to_string().unwrap_or_default();

            let mut column = Column::new(row["column_name"].to_string().unwrap_or_default(), 0, tpe);
            column.ordinal_position = row["ordinal_position"].as_i64().unwrap_or_default() as u32;
            column.nullable = row["is_nullable"].to_string().as_deref() == Some("YES");
            column.default = row["column_default"].to_string().map(|d| strip_default_wrapping(&d));
            column.auto_increment = extra.contains("auto_increment");
            column.unsigned = unsigned;
            column.comment = if comment.is_empty() { None } else { Some(comment) };

            table.columns.push(column);
            count += 1;
        }

        Ok(count)
    }

    async fn extract_constraints(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        // `key_column_usage` alone cannot tell a PK apart from a lone-column
        // unique key; `table_constraints.constraint_type` is the source of
        // truth, joined on name because MySQL does not expose a stable
        // constraint id the way Postgres's `pg_constraint.oid` does.
        let rows = self
            .conn
            .query_raw(
                "SELECT tc.table_name, tc.constraint_name, tc.constraint_type,
                        kcu.column_name, kcu.ordinal_position,
                        kcu.referenced_table_name, kcu.referenced_column_name,
                        rc.update_rule, rc.delete_rule
                 FROM information_schema.table_constraints tc
                 JOIN information_schema.key_column_usage kcu
                      ON kcu.constraint_schema = tc.constraint_schema
                     AND kcu.constraint_name = tc.constraint_name
                     AND kcu.table_name = tc.table_name
                 LEFT JOIN information_schema.referential_constraints rc
                      ON rc.constraint_schema = tc.constraint_schema
                     AND rc.constraint_name = tc.constraint_name
                 WHERE tc.table_schema = ? AND tc.constraint_type != 'CHECK'
                 ORDER BY tc.table_name, tc.constraint_name, kcu.ordinal_position",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        let checks = self
            .conn
            .query_raw(
                "SELECT table_name, constraint_name, check_clause
                 FROM information_schema.check_constraints
                 WHERE constraint_schema = ?",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        let mut grouped: HashMap<(String, String), (String, Vec<String>, Option<String>, Vec<String>, Option<String>, Option<String>)> =
            HashMap::new();

        for row in rows {
            let table_name = row["table_name"].to_string().unwrap_or_default();
            let constraint_name = row["constraint_name"].to_string().unwrap_or_default();
            let entry = grouped
                .entry((table_name, constraint_name))
                .or_insert_with(|| (row["constraint_type"].to_string().unwrap_or_default(), Vec::new(), None, Vec::new(), None, None));

            entry.1.push(row["column_name"].to_string().unwrap_or_default());
            if let Some(referenced_table) = row["referenced_table_name"].to_string() {
                entry.2 = Some(referenced_table);
            }
            if let Some(referenced_column) = row["referenced_column_name"].to_string() {
                entry.3.push(referenced_column);
            }
            entry.4 = row["update_rule"].to_string();
            entry.5 = row["delete_rule"].to_string();
        }

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for ((table_name, constraint_name), (kind, columns, referenced_table, referenced_columns, on_update, on_delete)) in grouped {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };

            let constraint = match kind.as_str() {
                "PRIMARY KEY" => Constraint::primary_key(constraint_name, columns),
                "UNIQUE" => Constraint::unique(constraint_name, columns),
                "FOREIGN KEY" => Constraint::foreign_key(
                    constraint_name,
                    columns,
                    referenced_table.unwrap_or_default(),
                    referenced_columns,
                    fk_action(on_update.as_deref()),
                    fk_action(on_delete.as_deref()),
                ),
                _ => continue,
            };

            table.constraints.push(constraint);
            count += 1;
        }

        for row in checks {
            let table_name = row["table_name"].to_string().unwrap_or_default();
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            let name = row["constraint_name"].to_string().unwrap_or_default();
            let clause = row["check_clause"].to_string().unwrap_or_default();
            table.constraints.push(Constraint::check(name, Vec::new(), clause));
            count += 1;
        }

        Ok(count)
    }

    async fn extract_indexes(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT table_name, index_name, non_unique, index_type, column_name, seq_in_index
                 FROM information_schema.statistics
                 WHERE table_schema = ? AND index_name != 'PRIMARY'
                 ORDER BY table_name, index_name, seq_in_index",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        let mut grouped: HashMap<(String, String), (bool, String, Vec<String>)> = HashMap::new();

        for row in rows {
            let table_name = row["table_name"].to_string().unwrap_or_default();
            let index_name = row["index_name"].to_string().unwrap_or_default();
            let entry = grouped.entry((table_name, index_name)).or_insert_with(|| {
                (
                    row["non_unique"].as_i64().unwrap_or(1) == 0,
                    row["index_type"].to_string().unwrap_or_default(),
                    Vec::new(),
                )
            });
            entry.2.push(row["column_name"].to_string().unwrap_or_default());
        }

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for ((table_name, index_name), (unique, index_type, columns)) in grouped {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };

            let kind = match index_type.to_uppercase().as_str() {
                "HASH" => IndexType::Hash,
                "FULLTEXT" | "SPATIAL" => IndexType::Regular,
                _ => IndexType::BTree,
            };

            table.indexes.push(Index::new(index_name, columns, unique, kind));
            count += 1;
        }

        Ok(count)
    }
}

fn fk_action(rule: Option<&str>) -> ForeignKeyAction {
    match rule.map(str::to_uppercase).as_deref() {
        Some("CASCADE") => ForeignKeyAction::Cascade,
        Some("SET NULL") => ForeignKeyAction::SetNull,
        Some("SET DEFAULT") => ForeignKeyAction::SetDefault,
        Some("RESTRICT") => ForeignKeyAction::Restrict,
        _ => ForeignKeyAction::NoAction,
    }
}

fn classify(err: quaint::error::Error, attempt: u32) -> ExtractError {
    use crate::framework::codes::MYSQL_TRANSIENT;

    let code = err
        .original_code()
        .and_then(|c| c.parse::<u32>().ok());

    match code {
        Some(code) if MYSQL_TRANSIENT.contains(&code) => ExtractError::Transient {
            message: err.to_string(),
            attempt,
        },
        _ => ExtractError::Permanent(err.to_string()),
    }
}
