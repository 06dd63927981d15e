//! The shared contract every dialect extractor implements (`extract`), and
//! the framework wrapped around it: scoped connection setup, per-phase
//! progress events, query timeouts, and transient-error retry.
//!
//! Later phases depend on earlier ones (a column row discarded without its
//! table is silently dropped), so within one extraction the four phases
//! always run in order: Tables, then Columns, then Constraints, then
//! Indexes, on a single connection/transaction.

mod phases;
mod progress;
mod retry;
mod scope;

pub use phases::Phase;
pub use progress::{NoopProgressListener, ProgressListener, TracingProgressListener};
pub use retry::{codes, retry_transient, MAX_ATTEMPTS, QUERY_TIMEOUT};
pub use scope::{begin_read_committed_snapshot, end_read_committed_snapshot};

use crate::error::ExtractError;
use async_trait::async_trait;
use schema_diff_model::{validate, SchemaModel, Table, ValidationWarning};
use schema_diff_types::Dialect;
use std::time::Instant;

/// Implemented once per dialect. The framework drives the four phases in
/// order, wrapping each in a retry/timeout/progress-event envelope; the
/// extractor itself only needs to know how to read its own catalog.
#[async_trait]
pub trait DialectExtractor: Send + Sync {
    fn dialect(&self) -> Dialect;
    fn schema_name(&self) -> String;

    /// Saves prior `auto_commit`/`read_only`/isolation, sets isolation to
    /// read-committed (or the dialect's closest equivalent), sets
    /// read-only, and begins a transaction.
    async fn begin_scope(&self) -> Result<(), ExtractError>;

    /// Restores whatever `begin_scope` saved, on every exit path.
    async fn end_scope(&self);

    async fn extract_tables(&self, attempt: u32) -> Result<Vec<Table>, ExtractError>;
    async fn extract_columns(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError>;
    async fn extract_constraints(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError>;
    async fn extract_indexes(&self, tables: &mut [Table], attempt: u32) -> Result<usize, ExtractError>;
}

/// Drives one dialect extractor through its four phases and assembles the
/// resulting [`SchemaModel`], returning any dangling-reference warnings
/// produced by the post-extraction validation hook.
pub async fn run_extraction<E: DialectExtractor>(
    extractor: &E,
    progress: &dyn ProgressListener,
) -> Result<(SchemaModel, Vec<ValidationWarning>), ExtractError> {
    extractor.begin_scope().await?;

    let result = run_phases(extractor, progress).await;

    extractor.end_scope().await;

    let mut tables = result?;
    tables.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let mut model = SchemaModel::new(extractor.schema_name());
    for table in tables {
        model.insert_table(table);
    }

    let warnings = validate(&model);
    for warning in &warnings {
        progress.on_warning(&format!("{warning:?}"));
    }

    Ok((model, warnings))
}

async fn run_phases<E: DialectExtractor>(
    extractor: &E,
    progress: &dyn ProgressListener,
) -> Result<Vec<Table>, ExtractError> {
    let mut tables = run_phase(Phase::Tables, progress, |attempt| extractor.extract_tables(attempt)).await?;

    let column_count = run_phase(Phase::Columns, progress, |attempt| {
        extractor.extract_columns(&mut tables, attempt)
    })
    .await?;
    let _ = column_count;

    run_phase(Phase::Constraints, progress, |attempt| {
        extractor.extract_constraints(&mut tables, attempt)
    })
    .await?;

    run_phase(Phase::Indexes, progress, |attempt| {
        extractor.extract_indexes(&mut tables, attempt)
    })
    .await?;

    Ok(tables)
}

async fn run_phase<T, F, Fut>(phase: Phase, progress: &dyn ProgressListener, op: F) -> Result<T, ExtractError>
where
    F: Fn(u32) -> Fut,
    T: PhaseItemCount,
    Fut: std::future::Future<Output = Result<T, ExtractError>>,
{
    progress.on_phase_start(phase);
    let start = Instant::now();

    let result = retry_transient(|attempt| async move {
        match tokio::time::timeout(QUERY_TIMEOUT, op(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractError::Timeout(QUERY_TIMEOUT)),
        }
    })
    .await;

    if let Ok(value) = &result {
        progress.on_phase_complete(phase, value.item_count(), start.elapsed());
    }

    result
}

/// How many catalog rows a phase's result represents, for the
/// `onPhaseComplete(phase, items, duration_ms)` event.
trait PhaseItemCount {
    fn item_count(&self) -> usize;
}

impl PhaseItemCount for Vec<Table> {
    fn item_count(&self) -> usize {
        self.len()
    }
}

impl PhaseItemCount for usize {
    fn item_count(&self) -> usize {
        *self
    }
}
