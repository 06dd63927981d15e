//! Executes a DDL script against a freshly-started container.
//!
//! Production schemas contain dialect idioms (`DELIMITER $$`, PL/SQL
//! blocks) that a naive statement splitter mishandles. The default,
//! resilient execution policy keeps going past individual statement
//! failures so the core tool can still compare whatever objects did get
//! created, instead of failing the whole comparison over one bad
//! statement.

mod split;

use async_trait::async_trait;
use quaint::connector::Queryable;
use schema_diff_types::Dialect;
use thiserror::Error;

pub use split::{preprocess_mysql, split_statements, strip_bom, strip_line_comments};

/// How the provisioner reacts to one statement failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Skip the failing statement, record a truncated error preview,
    /// continue. The default.
    Resilient,
    /// Abort the whole script on the first failing statement.
    Strict,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        ExecutionPolicy::Resilient
    }
}

const MAX_RECORDED_ERRORS: usize = 10;
const ERROR_PREVIEW_LEN: usize = 200;

#[derive(Clone, Debug)]
pub struct StatementError {
    pub statement_preview: String,
    pub error_preview: String,
}

#[derive(Clone, Debug, Default)]
pub struct ProvisionResult {
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub first_n_errors: Vec<StatementError>,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("all {0} statements in the script failed to execute")]
    AllStatementsFailed(usize),
    #[error("statement failed under the strict execution policy: {0}")]
    StrictModeAbort(String),
}

/// Executes every statement of `script` against `conn`, preprocessed for
/// `dialect`'s quirks, under `policy`.
pub async fn provision(
    conn: &dyn Queryable,
    dialect: Dialect,
    script: &str,
    policy: ExecutionPolicy,
) -> Result<ProvisionResult, ProvisionError> {
    let script = strip_bom(script);
    let script = strip_line_comments(&script);
    let script = if dialect == Dialect::MySql {
        preprocess_mysql(&script)
    } else {
        script
    };

    let statements = split_statements(dialect, &script);
    let total = statements.len();
    let mut result = ProvisionResult::default();

    for statement in statements {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            continue;
        }

        result.executed += 1;
        tracing::debug!(statement = %truncate(trimmed, ERROR_PREVIEW_LEN), "executing provisioning statement");

        match conn.raw_cmd(trimmed).await {
            Ok(()) => result.succeeded += 1,
            Err(err) => {
                result.failed += 1;
                let preview = StatementError {
                    statement_preview: truncate(trimmed, ERROR_PREVIEW_LEN),
                    error_preview: truncate(&err.to_string(), ERROR_PREVIEW_LEN),
                };

                tracing::warn!(error = %preview.error_preview, "provisioning statement failed");

                if policy == ExecutionPolicy::Strict {
                    return Err(ProvisionError::StrictModeAbort(preview.error_preview));
                }

                if result.first_n_errors.len() < MAX_RECORDED_ERRORS {
                    result.first_n_errors.push(preview);
                }
            }
        }
    }

    if total > 0 && result.succeeded == 0 {
        return Err(ProvisionError::AllStatementsFailed(total));
    }

    Ok(result)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Marker trait for callers that want to provision against something other
/// than a live `quaint` connection (e.g. a test double). Not used by
/// `provision` itself, which takes `&dyn Queryable` directly, but kept for
/// symmetry with the extractor framework's connection abstraction.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn read(&self) -> std::io::Result<String>;
}

#[async_trait]
impl ScriptSource for std::path::PathBuf {
    async fn read(&self) -> std::io::Result<String> {
        tokio::fs::read_to_string(self).await
    }
}
