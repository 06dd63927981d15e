//! DB2 LUW extractor.
//!
//! No native async Rust DB2 driver exists, so this extractor goes through
//! `odbc-api` against the vendor ODBC driver, the same way the Oracle
//! extractor goes through OCI: every catalog read is synchronous and is run
//! on a blocking task.
//!
//! Foreign keys are read from `SYSCAT.REFERENCES` joined to
//! `SYSCAT.KEYCOLUSE` for both sides of the relationship; `SYSCAT.REFERENCES`
//! carries the delete/update rule codes directly, filtered to regular (not
//! informational) constraints via `ENFORCED = 'Y'`.

use crate::error::ExtractError;
use crate::framework::DialectExtractor;
use async_trait::async_trait;
use odbc_api::{Connection, Cursor, Environment};
use schema_diff_model::{strip_default_wrapping, Column, Constraint, ForeignKeyAction, Index, IndexType, Table, TypeSpec};
use schema_diff_types::Dialect;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct Db2Extractor {
    connection: Arc<Mutex<Connection<'static>>>,
    _environment: Arc<Environment>,
    schema: String,
}

impl Db2Extractor {
    /// Opens one connection, shared across every phase of the extraction.
    /// `Connection<'env>` borrows from the `Environment` it was opened
    /// against; `environment` is always a clone of the process-wide static
    /// `Environment`, which outlives every extractor, so the transmute to
    /// `'static` below is sound.
    pub async fn connect(environment: Arc<Environment>, connection_string: impl Into<String>, schema: impl Into<String>) -> Result<Self, ExtractError> {
        let connection_string = connection_string.into();
        let env = environment.clone();

        let conn = tokio::task::spawn_blocking(move || {
            let conn = env.connect_with_connection_string(&connection_string, odbc_api::ConnectionOptions::default())?;
            Ok::<_, odbc_api::Error>(unsafe { std::mem::transmute::<Connection<'_>, Connection<'static>>(conn) })
        })
        .await
        .map_err(|err| ExtractError::Configuration(err.to_string()))?
        .map_err(|err| ExtractError::Configuration(err.to_string()))?;

        Ok(Db2Extractor {
            connection: Arc::new(Mutex::new(conn)),
            _environment: environment,
            schema: schema.into().to_uppercase(),
        })
    }

    async fn blocking<T, F>(&self, attempt: u32, f: F) -> Result<T, ExtractError>
    where
        F: FnOnce(&Connection<'static>) -> Result<T, odbc_api::Error> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let guard = connection.lock().unwrap();
            f(&guard)
        })
        .await
        .map_err(|err| ExtractError::Permanent(err.to_string()))?
        .map_err(|err| classify(err, attempt))
    }
}

#[async_trait]
impl DialectExtractor for Db2Extractor {
    fn dialect(&self) -> Dialect {
        Dialect::Db2
    }

    fn schema_name(&self) -> String {
        self.schema.clone()
    }

    async fn begin_scope(&self) -> Result<(), ExtractError> {
        self.blocking(1, |conn| conn.set_autocommit(false)).await
    }

    async fn end_scope(&self) {
        let connection = self.connection.clone();
        let _ = tokio::task::spawn_blocking(move || connection.lock().unwrap().rollback()).await;
    }

    async fn extract_tables(&self, attempt: u32) -> Result<Vec<Table>, ExtractError> {
        let schema = self.schema.clone();
        self.blocking(attempt, move |conn| {
            let mut tables = Vec::new();
            let query = "SELECT TABNAME, REMARKS FROM SYSCAT.TABLES \
                         WHERE TABSCHEMA = ? AND TYPE = 'T' ORDER BY TABNAME";
            if let Some(mut cursor) = conn.execute(query, &schema.as_str())? {
                let mut row_set = fetch_text_columns(&mut cursor, 2)?;
                for row in row_set.drain(..) {
                    let mut table = Table::new(row[0].clone().unwrap_or_default());
                    table.comment = row[1].clone();
                    tables.push(table);
                }
            }
            Ok(tables)
        })
        .await
    }

    async fn extract_columns(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let schema = self.schema.clone();
        let rows = self
            .blocking(attempt, move |conn| {
                let query = "SELECT TABNAME, COLNAME, COLNO, TYPENAME, LENGTH, SCALE, \
                                    NULLS, DEFAULT, IDENTITY \
                             FROM SYSCAT.COLUMNS WHERE TABSCHEMA = ? ORDER BY TABNAME, COLNO";
                let mut out = Vec::new();
                if let Some(mut cursor) = conn.execute(query, &schema.as_str())? {
                    out = fetch_text_columns(&mut cursor, 9)?;
                }
                Ok(out)
            })
            .await?;

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for row in rows {
            let table_name = row[0].clone().unwrap_or_default();
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };

            let type_name = row[3].clone().unwrap_or_default();
            let length: i64 = row[4].as_deref().and_then(|v| v.parse().ok()).unwrap_or(0);
            let scale: i64 = row[5].as_deref().and_then(|v| v.parse().ok()).unwrap_or(0);

            let mut tpe = TypeSpec::new(type_name.clone());
            match type_name.to_uppercase().as_str() {
                "VARCHAR" | "CHARACTER" | "GRAPHIC" | "VARGRAPHIC" => {
                    tpe = tpe.with_length(length as u64);
                }
                "DECIMAL" | "NUMERIC" => {
                    tpe = tpe.with_precision_scale(length as u32, scale as u32);
                }
                _ => {}
            }

            let mut column = Column::new(row[1].clone().unwrap_or_default(), 0, tpe);
            column.ordinal_position = row[2].as_deref().and_then(|v| v.parse().ok()).unwrap_or(0);
            column.nullable = row[6].as_deref() == Some("Y");
            column.default = row[7].clone().map(|d| strip_default_wrapping(&d));
            column.auto_increment = matches!(row[8].as_deref(), Some("Y") | Some("G"));

            table.columns.push(column);
            count += 1;
        }

        Ok(count)
    }

    async fn extract_constraints(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let schema = self.schema.clone();

        let key_rows = self
            .blocking(attempt, {
                let schema = schema.clone();
                move |conn| {
                    let query = "SELECT kcu.TABNAME, tc.CONSTNAME, tc.TYPE, kcu.COLNAME, kcu.COLSEQ \
                                 FROM SYSCAT.TABCONST tc \
                                 JOIN SYSCAT.KEYCOLUSE kcu \
                                      ON kcu.TABSCHEMA = tc.TABSCHEMA AND kcu.CONSTNAME = tc.CONSTNAME \
                                 WHERE tc.TABSCHEMA = ? AND tc.TYPE IN ('P', 'U') \
                                 ORDER BY kcu.TABNAME, tc.CONSTNAME, kcu.COLSEQ";
                    let mut out = Vec::new();
                    if let Some(mut cursor) = conn.execute(query, &schema.as_str())? {
                        out = fetch_text_columns(&mut cursor, 5)?;
                    }
                    Ok(out)
                }
            })
            .await?;

        let fk_rows = self
            .blocking(attempt, {
                let schema = schema.clone();
                move |conn| {
                    let query = "SELECT r.TABNAME, r.CONSTNAME, fk.COLNAME, pk.COLNAME, \
                                        r.REFTABNAME, r.UPDATERULE, r.DELETERULE, fk.COLSEQ \
                                 FROM SYSCAT.REFERENCES r \
                                 JOIN SYSCAT.KEYCOLUSE fk \
                                      ON fk.TABSCHEMA = r.TABSCHEMA AND fk.CONSTNAME = r.CONSTNAME \
                                 JOIN SYSCAT.KEYCOLUSE pk \
                                      ON pk.TABSCHEMA = r.REFTABSCHEMA AND pk.CONSTNAME = r.REFKEYNAME \
                                     AND pk.COLSEQ = fk.COLSEQ \
                                 WHERE r.TABSCHEMA = ? AND r.ENFORCED = 'Y' \
                                 ORDER BY r.TABNAME, r.CONSTNAME, fk.COLSEQ";
                    let mut out = Vec::new();
                    if let Some(mut cursor) = conn.execute(query, &schema.as_str())? {
                        out = fetch_text_columns(&mut cursor, 8)?;
                    }
                    Ok(out)
                }
            })
            .await?;

        let check_rows = self
            .blocking(attempt, move |conn| {
                let query = "SELECT TABNAME, CONSTNAME, TEXT FROM SYSCAT.CHECKS \
                             WHERE TABSCHEMA = ?";
                let mut out = Vec::new();
                if let Some(mut cursor) = conn.execute(query, &schema.as_str())? {
                    out = fetch_text_columns(&mut cursor, 3)?;
                }
                Ok(out)
            })
            .await?;

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        let mut keys: HashMap<(String, String), (String, Vec<String>)> = HashMap::new();
        for row in key_rows {
            let table_name = row[0].clone().unwrap_or_default();
            let constraint_name = row[1].clone().unwrap_or_default();
            let entry = keys
                .entry((table_name, constraint_name))
                .or_insert_with(|| (row[2].clone().unwrap_or_default(), Vec::new()));
            entry.1.push(row[3].clone().unwrap_or_default());
        }
        for ((table_name, name), (kind, columns)) in keys {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            let constraint = match kind.trim() {
                "P" => Constraint::primary_key(name, columns),
                _ => Constraint::unique(name, columns),
            };
            table.constraints.push(constraint);
            count += 1;
        }

        let mut fks: HashMap<(String, String), (Vec<String>, Vec<String>, String, Option<String>, Option<String>)> = HashMap::new();
        for row in fk_rows {
            let table_name = row[0].clone().unwrap_or_default();
            let constraint_name = row[1].clone().unwrap_or_default();
            let entry = fks.entry((table_name, constraint_name)).or_insert_with(|| {
                (Vec::new(), Vec::new(), row[4].clone().unwrap_or_default(), row[5].clone(), row[6].clone())
            });
            entry.0.push(row[2].clone().unwrap_or_default());
            entry.1.push(row[3].clone().unwrap_or_default());
        }
        for ((table_name, name), (columns, referenced_columns, referenced_table, on_update, on_delete)) in fks {
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
            let table_name = row[0].clone().unwrap_or_default();
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            let name = row[1].clone().unwrap_or_default();
            let clause = row[2].clone().unwrap_or_default();
            table.constraints.push(Constraint::check(name, Vec::new(), clause));
            count += 1;
        }

        Ok(count)
    }

    async fn extract_indexes(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError> {
        let schema = self.schema.clone();
        let rows = self
            .blocking(attempt, move |conn| {
                let query = "SELECT ic.TABNAME, i.INDNAME, i.UNIQUERULE, i.INDEXTYPE, ic.COLNAME, ic.COLSEQ \
                             FROM SYSCAT.INDEXES i \
                             JOIN SYSCAT.INDEXCOLUSE ic ON ic.INDSCHEMA = i.INDSCHEMA AND ic.INDNAME = i.INDNAME \
                             WHERE i.INDSCHEMA = ? AND i.UNIQUERULE != 'P' \
                             ORDER BY ic.TABNAME, i.INDNAME, ic.COLSEQ";
                let mut out = Vec::new();
                if let Some(mut cursor) = conn.execute(query, &schema.as_str())? {
                    out = fetch_text_columns(&mut cursor, 6)?;
                }
                Ok(out)
            })
            .await?;

        let mut grouped: HashMap<(String, String), (bool, String, Vec<String>)> = HashMap::new();
        for row in rows {
            let table_name = row[0].clone().unwrap_or_default();
            let index_name = row[1].clone().unwrap_or_default();
            let entry = grouped.entry((table_name, index_name)).or_insert_with(|| {
                (row[2].as_deref() == Some("U"), row[3].clone().unwrap_or_default(), Vec::new())
            });
            entry.2.push(row[4].clone().unwrap_or_default());
        }

        let mut by_table: HashMap<String, &mut Table> = tables.iter_mut().map(|t| (t.name.clone(), t)).collect();
        let mut count = 0;

        for ((table_name, index_name), (unique, index_type, columns)) in grouped {
            let Some(table) = by_table.get_mut(&table_name) else {
                continue;
            };
            let kind = if index_type.trim() == "BLOK" {
                IndexType::Bitmap
            } else {
                IndexType::Regular
            };
            table.indexes.push(Index::new(index_name, columns, unique, kind));
            count += 1;
        }

        Ok(count)
    }
}

fn fk_action(code: Option<&str>) -> ForeignKeyAction {
    match code {
        Some("C") => ForeignKeyAction::Cascade,
        Some("N") => ForeignKeyAction::SetNull,
        Some("R") => ForeignKeyAction::Restrict,
        _ => ForeignKeyAction::NoAction,
    }
}

/// Reads every row of the cursor into a `Vec` of nullable-text columns.
/// DB2's ODBC driver returns every catalog column as character data, so a
/// single text-binding buffer covers tables, columns, and constraints alike.
fn fetch_text_columns(cursor: &mut impl Cursor, column_count: u16) -> Result<Vec<Vec<Option<String>>>, odbc_api::Error> {
    let mut rows = Vec::new();

    while let Some(mut row) = cursor.next_row()? {
        let mut values = Vec::with_capacity(column_count as usize);
        for index in 1..=column_count {
            let mut buf: Vec<u8> = Vec::new();
            row.get_text(index, &mut buf)?;
            values.push(if buf.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&buf).trim().to_string())
            });
        }
        rows.push(values);
    }

    Ok(rows)
}

fn classify(err: odbc_api::Error, attempt: u32) -> ExtractError {
    use crate::framework::codes::DB2_TRANSIENT;

    let message = err.to_string();
    let transient = DB2_TRANSIENT.iter().any(|code| message.contains(&code.to_string()));
    if transient {
        ExtractError::Transient { message, attempt }
    } else {
        ExtractError::Permanent(message)
    }
}
