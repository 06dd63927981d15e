//! SQL Server extractor.
//!
//! Reads `sys.tables`, `sys.columns`, `sys.key_constraints`,
//! `sys.foreign_keys`, `sys.check_constraints`, and `sys.indexes`. SQL Server
//! reports `nvarchar`/`nchar` lengths in bytes (two per character) and uses
//! `-1` for `MAX`; both are normalized away before the length ever reaches
//! the model.

use crate::error::ExtractError;
use crate::framework::{begin_read_committed_snapshot, end_read_committed_snapshot, DialectExtractor};
use async_trait::async_trait;
use quaint::prelude::*;
use quaint::single::Quaint;
use schema_diff_model::{strip_default_wrapping, Column, Constraint, ForeignKeyAction, Index, IndexType, Table, TypeSpec};
use schema_diff_types::Dialect;
use std::collections::HashMap;

const NVARCHAR_TYPES: &[&str] = &["nvarchar", "nchar"];

pub struct MssqlExtractor {
    conn: Quaint,
    schema: String,
}

impl MssqlExtractor {
    pub async fn connect(url: &str, schema: impl Into<String>) -> Result<Self, ExtractError> {
        let conn = Quaint::new(url)
            .await
            .map_err(|err| ExtractError::Configuration(err.to_string()))?;
        Ok(MssqlExtractor {
            conn,
            schema: schema.into(),
        })
    }
}

#[async_trait]
impl DialectExtractor for MssqlExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Mssql
    }

    fn schema_name(&self) -> String {
        self.schema.clone()
    }

    async fn begin_scope(&self) -> Result<(), ExtractError> {
        begin_read_committed_snapshot(&self.conn, "SET TRANSACTION ISOLATION LEVEL READ COMMITTED").await
    }

    async fn end_scope(&self) {
        end_read_committed_snapshot(&self.conn).await;
    }

    async fn extract_tables(&self, attempt: u32) -> Result<Vec<Table>, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT t.name AS table_name,
                        CAST(ep.value AS nvarchar(max)) AS comment
                 FROM sys.tables t
                 JOIN sys.schemas s ON s.schema_id = t.schema_id
                 LEFT JOIN sys.extended_properties ep
                        ON ep.major_id = t.object_id AND ep.minor_id = 0 AND ep.name = 'MS_Description'
                 WHERE s.name = @P1 AND t.is_ms_shipped = 0
                 ORDER BY t.name",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut table = Table::new(row["table_name"].to_string().unwrap_or_default());
                table.comment = row["comment"].to_string();
                table
            })
            .collect())
    }

    async fn extract_columns(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT t.name AS table_name, c.name AS column_name, c.column_id,
                        ty.name AS data_type, c.max_length, c.precision, c.scale,
                        c.is_nullable, c.is_identity,
                        OBJECT_DEFINITION(c.default_object_id) AS column_default
                 FROM sys.columns c
                 JOIN sys.tables t ON t.object_id = c.object_id
                 JOIN sys.schemas s ON s.schema_id = t.schema_id
                 JOIN sys.types ty ON ty.user_type_id = c.user_type_id
                 WHERE s.name = @P1
                 ORDER BY t.name, c.column_id",
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

            let data_type = row["data_type"].to_string().unwrap_or_default();
            let max_length = row["max_length"].as_i64().unwrap_or(0);

            let mut tpe = TypeSpec::new(&data_type);
            if max_length == -1 {
                // sys.columns reports MAX as -1 regardless of character width.
            } else if NVARCHAR_TYPES.contains(&data_type.to_lowercase().as_str()) {
                tpe = tpe.with_length((max_length / 2) as u64);
            } else if max_length > 0 {
                tpe = tpe.with_length(max_length as u64);
            }
            if let (Some(precision), Some(scale)) = (row["precision"].as_i64(), row["scale"].as_i64()) {
                if precision > 0 {
                    tpe = tpe.with_precision_scale(precision as u32, scale as u32);
                }
            }

            let mut column = Column::new(row["column_name"].to_string().unwrap_or_default(), 0, tpe);
            column.ordinal_position = row["column_id"].as_i64().unwrap_or_default() as u32;
            column.nullable = row["is_nullable"].as_bool().unwrap_or(true);
            column.default = row["column_default"].to_string().map(|d| strip_default_wrapping(&d));
            column.auto_increment = row["is_identity"].as_bool().unwrap_or(false);

            table.columns.push(column);
            count += 1;
        }

        Ok(count)
    }

    async fn extract_constraints(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let key_rows = self
            .conn
            .query_raw(
                "SELECT t.name AS table_name, kc.name AS constraint_name, kc.type AS kind,
                        col.name AS column_name, ic.key_ordinal
                 FROM sys.key_constraints kc
                 JOIN sys.tables t ON t.object_id = kc.parent_object_id
                 JOIN sys.schemas s ON s.schema_id = t.schema_id
                 JOIN sys.index_columns ic ON ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id
                 JOIN sys.columns col ON col.object_id = ic.object_id AND col.column_id = ic.column_id
                 WHERE s.name = @P1
                 ORDER BY t.name, kc.name, ic.key_ordinal",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        let fk_rows = self
            .conn
            .query_raw(
                "SELECT t.name AS table_name, fk.name AS constraint_name,
                        pc.name AS column_name, rt.name AS referenced_table, rc.name AS referenced_column,
                        fk.update_referential_action_desc, fk.delete_referential_action_desc, fkc.constraint_column_id
                 FROM sys.foreign_keys fk
                 JOIN sys.tables t ON t.object_id = fk.parent_object_id
                 JOIN sys.schemas s ON s.schema_id = t.schema_id
                 JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
                 JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
                 JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id
                 JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
                 WHERE s.name = @P1
                 ORDER BY t.name, fk.name, fkc.constraint_column_id",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        let check_rows = self
            .conn
            .query_raw(
                "SELECT t.name AS table_name, cc.name AS constraint_name, cc.definition
                 FROM sys.check_constraints cc
                 JOIN sys.tables t ON t.object_id = cc.parent_object_id
                 JOIN sys.schemas s ON s.schema_id = t.schema_id
                 WHERE s.name = @P1",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        let mut keys: HashMap<(String, String), (String, Vec<String>)> = HashMap::new();
        for row in key_rows {
            let table_name = row["table_name"].to_string().unwrap_or_default();
            let constraint_name = row["constraint_name"].to_string().unwrap_or_default();
            let entry = keys
                .entry((table_name, constraint_name))
                .or_insert_with(|| (row["kind"].to_string().unwrap_or_default(), Vec::new()));
            entry.1.push(row["column_name"].to_string().unwrap_or_default());
        }
        for ((table_name, name), (kind, columns)) in keys {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            let constraint = match kind.trim() {
                "PK" => Constraint::primary_key(name, columns),
                _ => Constraint::unique(name, columns),
            };
            table.constraints.push(constraint);
            count += 1;
        }

        let mut fks: HashMap<(String, String), (Vec<String>, String, Vec<String>, Option<String>, Option<String>)> = HashMap::new();
        for row in fk_rows {
            let table_name = row["table_name"].to_string().unwrap_or_default();
            let constraint_name = row["constraint_name"].to_string().unwrap_or_default();
            let entry = fks.entry((table_name, constraint_name)).or_insert_with(|| {
                (
                    Vec::new(),
                    row["referenced_table"].to_string().unwrap_or_default(),
                    Vec::new(),
                    row["update_referential_action_desc"].to_string(),
                    row["delete_referential_action_desc"].to_string(),
                )
            });
            entry.0.push(row["column_name"].to_string().unwrap_or_default());
            entry.2.push(row["referenced_column"].to_string().unwrap_or_default());
        }
        for ((table_name, name), (columns, referenced_table, referenced_columns, on_update, on_delete)) in fks {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            table.constraints.push(Constraint::foreign_key(
                name,
                columns,
                referenced_table,
                referenced_columns,
                fk_action(on_update.as_deref()),
                fk_action(on_delete.as_deref()),
            ));
            count += 1;
        }

        for row in check_rows {
            let table_name = row["table_name"].to_string().unwrap_or_default();
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            let name = row["constraint_name"].to_string().unwrap_or_default();
            let clause = row["definition"].to_string().unwrap_or_default();
            table.constraints.push(Constraint::check(name, Vec::new(), clause));
            count += 1;
        }

        Ok(count)
    }

    async fn extract_indexes(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT t.name AS table_name, i.name AS index_name, i.is_unique, i.type_desc,
                        col.name AS column_name, ic.key_ordinal
                 FROM sys.indexes i
                 JOIN sys.tables t ON t.object_id = i.object_id
                 JOIN sys.schemas s ON s.schema_id = t.schema_id
                 JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
                 JOIN sys.columns col ON col.object_id = ic.object_id AND col.column_id = ic.column_id
                 WHERE s.name = @P1 AND i.is_primary_key = 0 AND i.name IS NOT NULL
                 ORDER BY t.name, i.name, ic.key_ordinal",
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
                    row["is_unique"].as_bool().unwrap_or(false),
                    row["type_desc"].to_string().unwrap_or_default(),
                    Vec::new(),
                )
            });
            entry.2.push(row["column_name"].to_string().unwrap_or_default());
        }

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for ((table_name, index_name), (unique, type_desc, columns)) in grouped {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            let kind = match type_desc.as_str() {
                "CLUSTERED" => IndexType::Clustered,
                "NONCLUSTERED" => IndexType::Nonclustered,
                _ => IndexType::Nonclustered,
            };
            table.indexes.push(Index::new(index_name, columns, unique, kind));
            count += 1;
        }

        Ok(count)
    }
}

fn fk_action(desc: Option<&str>) -> ForeignKeyAction {
    match desc {
        Some("CASCADE") => ForeignKeyAction::Cascade,
        Some("SET_NULL") => ForeignKeyAction::SetNull,
        Some("SET_DEFAULT") => ForeignKeyAction::SetDefault,
        _ => ForeignKeyAction::NoAction,
    }
}

fn classify(err: quaint::error::Error, attempt: u32) -> ExtractError {
    use crate::framework::codes::MSSQL_TRANSIENT;

    let code = err
        .original_code()
        .and_then(|c| c.parse::<u32>().ok());

    match code {
        Some(code) if MSSQL_TRANSIENT.contains(&code) => ExtractError::Transient {
            message: err.to_string(),
            attempt,
        },
        _ => ExtractError::Permanent(err.to_string()),
    }
}
