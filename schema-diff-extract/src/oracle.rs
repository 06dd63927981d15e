//! Oracle extractor.
//!
//! The `oracle` crate is a thin, synchronous wrapper over OCI, so every
//! catalog read here runs on a blocking task via [`tokio::task::spawn_blocking`]
//! rather than holding up the async runtime.
//!
//! `ALL_TAB_COLUMNS.DATA_DEFAULT` is a `LONG`, and Oracle forbids ordering a
//! result set by a `LONG` column (and restricts filtering on one), so column
//! rows are fetched unordered and sorted by `column_id` once they're back in
//! memory rather than via `ORDER BY`. Recycle-bin objects (`BIN$...` names
//! left behind by `DROP TABLE` without `PURGE`) are excluded in the `ALL_TABLES`
//! query, since that catalog carries no `LONG` column to conflict with a
//! `WHERE` clause.

use crate::error::ExtractError;
use crate::framework::DialectExtractor;
use async_trait::async_trait;
use oracle::Connection;
use schema_diff_model::{strip_default_wrapping, Column, Constraint, ForeignKeyAction, Index, IndexType, Table, TypeSpec};
use schema_diff_types::Dialect;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub struct OracleExtractor {
    conn: Arc<Mutex<Connection>>,
    schema: String,
}

impl OracleExtractor {
    pub async fn connect(connect_string: &str, user: &str, password: &str, schema: impl Into<String>) -> Result<Self, ExtractError> {
        let connect_string = connect_string.to_string();
        let user = user.to_string();
        let password = password.to_string();

        let conn = tokio::task::spawn_blocking(move || Connection::connect(&user, &password, &connect_string))
            .await
            .map_err(|err| ExtractError::Configuration(err.to_string()))?
            .map_err(|err| ExtractError::Configuration(err.to_string()))?;

        Ok(OracleExtractor {
            conn: Arc::new(Mutex::new(conn)),
            schema: schema.into().to_uppercase(),
        })
    }

    async fn blocking<T, F>(&self, attempt: u32, f: F) -> Result<T, ExtractError>
    where
        F: FnOnce(&Connection) -> oracle::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap();
            f(&guard)
        })
        .await
        .map_err(|err| ExtractError::Permanent(err.to_string()))?
        .map_err(|err| classify(err, attempt))
    }

    /// Classic sequence-plus-trigger auto-increment: a `BEFORE INSERT` trigger
    /// assigns `:NEW.<col> := seq.NEXTVAL`. `TRIGGER_BODY` is a `LONG`, so it
    /// can't be filtered or ordered on in SQL; rows are fetched unfiltered on
    /// body content and scanned in memory for the `:NEW.<col>`/`NEXTVAL`
    /// co-occurrence, same pattern as the `DATA_DEFAULT` handling above.
    async fn trigger_driven_auto_increment_columns(&self, attempt: u32) -> Result<HashSet<(String, String)>, ExtractError> {
        let schema = self.schema.clone();

        let triggers = self
            .blocking(attempt, move |conn| {
                let mut out = Vec::new();
                let query = conn.query(
                    "SELECT table_name, trigger_body
                     FROM all_triggers
                     WHERE owner = :1 AND triggering_event LIKE '%INSERT%'
                           AND before_or_after = 'BEFORE' AND status = 'ENABLED'",
                    &[&schema],
                )?;
                for row in query {
                    let row = row?;
                    out.push((row.get::<_, String>("table_name")?, row.get::<_, String>("trigger_body")?));
                }
                Ok(out)
            })
            .await?;

        let mut flagged = HashSet::new();
        for (table_name, body) in triggers {
            let upper = body.to_uppercase();
            if !upper.contains("NEXTVAL") {
                continue;
            }
            for (idx, matched) in upper.match_indices(":NEW.") {
                let column: String = upper[idx + matched.len()..]
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                if !column.is_empty() {
                    flagged.insert((table_name.clone(), column));
                }
            }
        }
        Ok(flagged)
    }
}

#[async_trait]
impl DialectExtractor for OracleExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn schema_name(&self) -> String {
        self.schema.clone()
    }

    async fn begin_scope(&self) -> Result<(), ExtractError> {
        self.blocking(1, |conn| {
            conn.execute("SET TRANSACTION READ ONLY", &[])?;
            Ok(())
        })
        .await
    }

    async fn end_scope(&self) {
        let conn = self.conn.clone();
        let _ = tokio::task::spawn_blocking(move || conn.lock().unwrap().rollback()).await;
    }

    async fn extract_tables(&self, attempt: u32) -> Result<Vec<Table>, ExtractError> {
        let schema = self.schema.clone();
        self.blocking(attempt, move |conn| {
            let mut tables = Vec::new();
            let rows = conn.query(
                "SELECT table_name, comments
                 FROM all_tables t
                 LEFT JOIN all_tab_comments c
                        ON c.owner = t.owner AND c.table_name = t.table_name AND c.table_type = 'TABLE'
                 WHERE t.owner = :1 AND t.table_name NOT LIKE 'BIN$%'
                 ORDER BY t.table_name",
                &[&schema],
            )?;
            for row in rows {
                let row = row?;
                let name: String = row.get("table_name")?;
                let comment: Option<String> = row.get("comments")?;
                let mut table = Table::new(name);
                table.comment = comment;
                tables.push(table);
            }
            Ok(tables)
        })
        .await
    }

    async fn extract_columns(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let schema = self.schema.clone();

        struct Row {
            table_name: String,
            column_name: String,
            column_id: i64,
            data_type: String,
            data_length: Option<i64>,
            data_precision: Option<i64>,
            data_scale: Option<i64>,
            nullable: String,
            data_default: Option<String>,
        }

        let rows = self
            .blocking(attempt, move |conn| {
                let mut out = Vec::new();
                // DATA_DEFAULT is the only LONG column selected, and it is
                // never referenced in WHERE/ORDER BY below.
                let query = conn.query(
                    "SELECT table_name, column_name, column_id, data_type, data_length,
                            data_precision, data_scale, nullable, data_default
                     FROM all_tab_columns
                     WHERE owner = :1",
                    &[&schema],
                )?;
                for row in query {
                    let row = row?;
                    out.push(Row {
                        table_name: row.get("table_name")?,
                        column_name: row.get("column_name")?,
                        column_id: row.get("column_id")?,
                        data_type: row.get("data_type")?,
                        data_length: row.get("data_length")?,
                        data_precision: row.get("data_precision")?,
                        data_scale: row.get("data_scale")?,
                        nullable: row.get("nullable")?,
                        data_default: row.get("data_default")?,
                    });
                }
                out.sort_by_key(|r| (r.table_name.clone(), r.column_id));
                Ok(out)
            })
            .await?;

        let trigger_auto_increment = self.trigger_driven_auto_increment_columns(attempt).await?;

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for row in rows {
            let Some(table) = by_table.get_mut(&row.table_name) else {
                continue;
            };

            let mut tpe = TypeSpec::new(row.data_type.clone());
            if let Some(precision) = row.data_precision {
                tpe = tpe.with_precision_scale(precision as u32, row.data_scale.unwrap_or(0) as u32);
            } else if let Some(length) = row.data_length {
                if matches!(row.data_type.as_str(), "VARCHAR2" | "CHAR" | "NVARCHAR2" | "NCHAR" | "RAW") {
                    tpe = tpe.with_length(length as u64);
                }
            }

            let identity_auto_increment = row
                .data_default
                .as_deref()
                .map(|d| d.to_uppercase().contains("ISEQ$$"))
                .unwrap_or(false);
            let auto_increment =
                identity_auto_increment || trigger_auto_increment.contains(&(row.table_name.clone(), row.column_name.to_uppercase()));

            let mut column = Column::new(row.column_name, row.column_id as u32, tpe);
            column.nullable = row.nullable == "Y";
            column.default = row.data_default.map(|d| strip_default_wrapping(d.trim()));
            column.auto_increment = auto_increment;

            table.columns.push(column);
            count += 1;
        }

        Ok(count)
    }

    async fn extract_constraints(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let schema = self.schema.clone();

        struct ConstraintRow {
            table_name: String,
            constraint_name: String,
            constraint_type: String,
            column_name: String,
            position: i64,
            referenced_table: Option<String>,
            referenced_column: Option<String>,
            delete_rule: Option<String>,
            search_condition: Option<String>,
        }

        let rows = self
            .blocking(attempt, move |conn| {
                let mut out = Vec::new();
                let query = conn.query(
                    "SELECT c.table_name, c.constraint_name, c.constraint_type,
                            cc.column_name, cc.position,
                            rc.table_name AS referenced_table, rcc.column_name AS referenced_column,
                            c.delete_rule, c.search_condition
                     FROM all_constraints c
                     JOIN all_cons_columns cc
                          ON cc.owner = c.owner AND cc.constraint_name = c.constraint_name
                     LEFT JOIN all_constraints rc
                          ON rc.owner = c.r_owner AND rc.constraint_name = c.r_constraint_name
                     LEFT JOIN all_cons_columns rcc
                          ON rcc.owner = rc.owner AND rcc.constraint_name = rc.constraint_name AND rcc.position = cc.position
                     WHERE c.owner = :1 AND c.constraint_type IN ('P', 'U', 'R', 'C') AND c.status = 'ENABLED'
                     ORDER BY c.table_name, c.constraint_name, cc.position",
                    &[&schema],
                )?;
                for row in query {
                    let row = row?;
                    out.push(ConstraintRow {
                        table_name: row.get("table_name")?,
                        constraint_name: row.get("constraint_name")?,
                        constraint_type: row.get("constraint_type")?,
                        column_name: row.get("column_name")?,
                        position: row.get("position")?,
                        referenced_table: row.get("referenced_table")?,
                        referenced_column: row.get("referenced_column")?,
                        delete_rule: row.get("delete_rule")?,
                        // SEARCH_CONDITION is a LONG too; harmless here since
                        // it's never filtered or ordered on.
                        search_condition: row.get("search_condition")?,
                    });
                }
                Ok(out)
            })
            .await?;

        let mut grouped: HashMap<(String, String), Vec<ConstraintRow>> = HashMap::new();
        for row in rows {
            grouped
                .entry((row.table_name.clone(), row.constraint_name.clone()))
                .or_default()
                .push(row);
        }

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for ((table_name, name), mut group) in grouped {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            group.sort_by_key(|r| r.position);

            let kind = group[0].constraint_type.clone();
            let columns: Vec<String> = group.iter().map(|r| r.column_name.clone()).collect();

            let constraint = match kind.as_str() {
                "P" => Constraint::primary_key(name, columns),
                "U" => Constraint::unique(name, columns),
                "R" => {
                    let referenced_table = group[0].referenced_table.clone().unwrap_or_default();
                    let referenced_columns: Vec<String> =
                        group.iter().filter_map(|r| r.referenced_column.clone()).collect();
                    // Oracle has no ON UPDATE action; only DELETE is modeled.
                    let on_delete = match group[0].delete_rule.as_deref() {
                        Some("CASCADE") => ForeignKeyAction::Cascade,
                        Some("SET NULL") => ForeignKeyAction::SetNull,
                        _ => ForeignKeyAction::NoAction,
                    };
                    Constraint::foreign_key(name, columns, referenced_table, referenced_columns, ForeignKeyAction::NoAction, on_delete)
                }
                "C" => {
                    let clause = group[0].search_condition.clone().unwrap_or_default();
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
        let schema = self.schema.clone();

        struct IndexRow {
            table_name: String,
            index_name: String,
            uniqueness: String,
            index_type: String,
            column_name: String,
            column_position: i64,
        }

        let rows = self
            .blocking(attempt, move |conn| {
                let mut out = Vec::new();
                let query = conn.query(
                    "SELECT i.table_name, i.index_name, i.uniqueness, i.index_type,
                            ic.column_name, ic.column_position
                     FROM all_indexes i
                     JOIN all_ind_columns ic ON ic.index_owner = i.owner AND ic.index_name = i.index_name
                     LEFT JOIN all_constraints pk
                            ON pk.owner = i.owner AND pk.constraint_name = i.index_name AND pk.constraint_type = 'P'
                     WHERE i.owner = :1 AND pk.constraint_name IS NULL
                     ORDER BY i.table_name, i.index_name, ic.column_position",
                    &[&schema],
                )?;
                for row in query {
                    let row = row?;
                    out.push(IndexRow {
                        table_name: row.get("table_name")?,
                        index_name: row.get("index_name")?,
                        uniqueness: row.get("uniqueness")?,
                        index_type: row.get("index_type")?,
                        column_name: row.get("column_name")?,
                        column_position: row.get("column_position")?,
                    });
                }
                Ok(out)
            })
            .await?;

        let mut grouped: HashMap<(String, String), Vec<IndexRow>> = HashMap::new();
        for row in rows {
            grouped
                .entry((row.table_name.clone(), row.index_name.clone()))
                .or_default()
                .push(row);
        }

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for ((table_name, index_name), mut group) in grouped {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            group.sort_by_key(|r| r.column_position);

            let unique = group[0].uniqueness == "UNIQUE";
            let kind = if group[0].index_type.contains("BITMAP") {
                IndexType::Bitmap
            } else if group[0].index_type.contains("FUNCTION-BASED") {
                IndexType::FunctionBased
            } else {
                IndexType::Regular
            };
            let columns = group.into_iter().map(|r| r.column_name).collect();

            table.indexes.push(Index::new(index_name, columns, unique, kind));
            count += 1;
        }

        Ok(count)
    }
}

fn classify(err: oracle::Error, attempt: u32) -> ExtractError {
    use crate::framework::codes::ORACLE_TRANSIENT;

    let message = err.to_string();
    if ORACLE_TRANSIENT.iter().any(|code| message.contains(code)) {
        ExtractError::Transient { message, attempt }
    } else {
        ExtractError::Permanent(message)
    }
}
