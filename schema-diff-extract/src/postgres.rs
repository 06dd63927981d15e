//! PostgreSQL extractor.
//!
//! Reads `pg_class`, `pg_attribute`, `pg_constraint`, `pg_index`,
//! `pg_depend`, and `information_schema.columns`. Only the user schema
//! (`public` unless the caller overrides it) is scanned; views and system
//! tables never reach the model.

use crate::error::ExtractError;
use crate::framework::{begin_read_committed_snapshot, end_read_committed_snapshot, DialectExtractor};
use async_trait::async_trait;
use quaint::prelude::*;
use quaint::single::Quaint;
use schema_diff_model::{Column, Constraint, ForeignKeyAction, Index, IndexType, Table, TypeSpec};
use schema_diff_types::Dialect;
use std::collections::HashMap;

pub struct PostgresExtractor {
    conn: Quaint,
    schema: String,
}

impl PostgresExtractor {
    pub async fn connect(url: &str, schema: impl Into<String>) -> Result<Self, ExtractError> {
        let conn = Quaint::new(url)
            .await
            .map_err(|err| ExtractError::Configuration(err.to_string()))?;
        Ok(PostgresExtractor {
            conn,
            schema: schema.into(),
        })
    }
}

#[async_trait]
impl DialectExtractor for PostgresExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn schema_name(&self) -> String {
        self.schema.clone()
    }

    async fn begin_scope(&self) -> Result<(), ExtractError> {
        begin_read_committed_snapshot(&self.conn, "SET TRANSACTION ISOLATION LEVEL READ COMMITTED, READ ONLY").await
    }

    async fn end_scope(&self) {
        end_read_committed_snapshot(&self.conn).await;
    }

    async fn extract_tables(&self, attempt: u32) -> Result<Vec<Table>, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT c.relname AS table_name, obj_description(c.oid) AS comment
                 FROM pg_class c
                 JOIN pg_namespace n ON n.oid = c.relnamespace
                 WHERE c.relkind = 'r' AND n.nspname = $1
                 ORDER BY c.relname",
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
                "SELECT c.table_name, c.column_name, c.ordinal_position, c.data_type,
                        c.character_maximum_length, c.numeric_precision, c.numeric_scale,
                        c.is_nullable, c.column_default, c.is_identity
                 FROM information_schema.columns c
                 WHERE c.table_schema = $1
                 ORDER BY c.table_name, c.ordinal_position",
                &[self.schema.as_str().into()],
            )
            .await
            .map_err(|err| classify(err, attempt))?;

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for row in rows {
            let table_name = row["table_name"].to_string().unwrap_or_default();
            let Some(table) = by_table.get_mut(&table_name) else {
                // Orphan row: the table was filtered out of the Tables phase
                // (a view, most likely). Deliberately skipped, not resurrected.
                continue;
            };

            let default_raw = row["column_default"].to_string();
            let is_identity = row["is_identity"].to_string().as_deref() == Some("YES");
            let auto_increment = is_identity
                || default_raw
                    .as_deref()
                    .map(|d| d.contains("nextval("))
                    .unwrap_or(false);

            let mut tpe = TypeSpec::new(row["data_type"].to_string().unwrap_or_default());
            if let Some(len) = row["character_maximum_length"].as_i64() {
                tpe = tpe.with_length(len as u64);
            }
            if let (Some(precision), Some(scale)) = (row["numeric_precision"].as_i64(), row["numeric_scale"].as_i64())
            {
                tpe = tpe.with_precision_scale(precision as u32, scale as u32);
            }

            let mut column = Column::new(row["column_name"].to_string().unwrap_or_default(), 0, tpe);
            column.ordinal_position = row["ordinal_position"].as_i64().unwrap_or_default() as u32;
            column.nullable = row["is_nullable"].to_string().as_deref() == Some("YES");
            column.default = default_raw.map(|d| schema_diff_model_default(&d));
            column.auto_increment = auto_increment;

            table.columns.push(column);
            count += 1;
        }

        Ok(count)
    }

    async fn extract_constraints(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT t.relname AS table_name, con.conname, con.contype,
                        pg_get_constraintdef(con.oid) AS definition,
                        ARRAY(SELECT a.attname FROM unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
                              JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
                              ORDER BY k.ord) AS columns,
                        ft.relname AS referenced_table,
                        ARRAY(SELECT a.attname FROM unnest(con.confkey) WITH ORDINALITY AS k(attnum, ord)
                              JOIN pg_attribute a ON a.attrelid = con.confrelid AND a.attnum = k.attnum
                              ORDER BY k.ord) AS referenced_columns,
                        con.confupdtype, con.confdeltype
                 FROM pg_constraint con
                 JOIN pg_class t ON t.oid = con.conrelid
                 JOIN pg_namespace n ON n.oid = t.relnamespace
                 LEFT JOIN pg_class ft ON ft.oid = con.confrelid
                 WHERE n.nspname = $1",
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

            let name = row["conname"].to_string().unwrap_or_default();
            let columns: Vec<String> = row["columns"]
                .to_string()
                .map(parse_pg_text_array)
                .unwrap_or_default();
            let contype = row["contype"].to_string().unwrap_or_default();

            let constraint = match contype.as_str() {
                "p" => Constraint::primary_key(name, columns),
                "u" => Constraint::unique(name, columns),
                "f" => {
                    let referenced_table = row["referenced_table"].to_string().unwrap_or_default();
                    let referenced_columns: Vec<String> = row["referenced_columns"]
                        .to_string()
                        .map(parse_pg_text_array)
                        .unwrap_or_default();
                    let on_update = fk_action(row["confupdtype"].to_string().as_deref());
                    let on_delete = fk_action(row["confdeltype"].to_string().as_deref());
                    Constraint::foreign_key(name, columns, referenced_table, referenced_columns, on_update, on_delete)
                }
                "c" => {
                    let def = row["definition"].to_string().unwrap_or_default();
                    let clause = def.strip_prefix("CHECK ").unwrap_or(&def).to_string();
                    Constraint::check(name, columns, clause)
                }
                _ => continue,
            };

            table.constraints.push(constraint);
            count += 1;
        }

        Ok(count)
    }

    async fn extract_indexes(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let rows = self
            .conn
            .query_raw(
                "SELECT t.relname AS table_name, i.relname AS index_name, ix.indisunique, am.amname,
                        ARRAY(SELECT a.attname FROM unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord)
                              JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
                              ORDER BY k.ord) AS columns
                 FROM pg_index ix
                 JOIN pg_class t ON t.oid = ix.indrelid
                 JOIN pg_class i ON i.oid = ix.indexrelid
                 JOIN pg_am am ON am.oid = i.relam
                 JOIN pg_namespace n ON n.oid = t.relnamespace
                 WHERE n.nspname = $1 AND ix.indisprimary = false",
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

            let columns = row["columns"].to_string().map(parse_pg_text_array).unwrap_or_default();
            let unique = row["indisunique"].as_bool().unwrap_or(false);
            let index_type = match row["amname"].to_string().as_deref() {
                Some("hash") => IndexType::Hash,
                Some("gin") => IndexType::Gin,
                Some("gist") => IndexType::Gist,
                Some("brin") => IndexType::Brin,
                Some("spgist") => IndexType::SpGist,
                _ => IndexType::BTree,
            };

            table
                .indexes
                .push(Index::new(row["index_name"].to_string().unwrap_or_default(), columns, unique, index_type));
            count += 1;
        }

        Ok(count)
    }
}

fn fk_action(code: Option<&str>) -> ForeignKeyAction {
    match code {
        Some("c") => ForeignKeyAction::Cascade,
        Some("n") => ForeignKeyAction::SetNull,
        Some("d") => ForeignKeyAction::SetDefault,
        Some("r") => ForeignKeyAction::Restrict,
        _ => ForeignKeyAction::NoAction,
    }
}

/// Default values are returned stripped of surrounding single quotes when
/// the entire value is quoted.
fn schema_diff_model_default(raw: &str) -> String {
    schema_diff_model::strip_default_wrapping(raw)
}

fn parse_pg_text_array(raw: String) -> Vec<String> {
    raw.trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_matches('"').to_string())
        .collect()
}

fn classify(err: quaint::error::Error, attempt: u32) -> ExtractError {
    use crate::framework::codes::POSTGRES_TRANSIENT;

    let code = err.original_code().unwrap_or_default();
    if POSTGRES_TRANSIENT.contains(&code) {
        ExtractError::Transient {
            message: err.to_string(),
            attempt,
        }
    } else {
        ExtractError::Permanent(err.to_string())
    }
}
