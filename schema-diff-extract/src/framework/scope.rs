use crate::error::ExtractError;
use async_trait::async_trait;
use quaint::connector::Queryable;

/// Sets the connection up for a consistent, read-only snapshot read and
/// restores it afterwards. Shared by the quaint-backed extractors
/// (Postgres/MySQL/MSSQL); Oracle and DB2 implement the equivalent
/// themselves against their own driver's session API.
pub async fn begin_read_committed_snapshot(conn: &dyn Queryable, isolation_statement: &str) -> Result<(), ExtractError> {
    conn.raw_cmd(isolation_statement)
        .await
        .map_err(|err| ExtractError::Configuration(err.to_string()))?;
    conn.raw_cmd("BEGIN")
        .await
        .map_err(|err| ExtractError::Configuration(err.to_string()))?;
    Ok(())
}

pub async fn end_read_committed_snapshot(conn: &dyn Queryable) {
    if let Err(err) = conn.raw_cmd("ROLLBACK").await {
        tracing::warn!(error = %err, "failed to roll back snapshot transaction");
    }
}

/// Marker trait documenting the scope contract (`begin_scope`/`end_scope`)
/// so each dialect module's impl block reads the same way.
#[async_trait]
pub trait ConnectionScope {
    async fn begin_scope(&self) -> Result<(), ExtractError>;
    async fn end_scope(&self);
}
