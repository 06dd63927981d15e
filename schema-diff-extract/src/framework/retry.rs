use crate::error::ExtractError;
use std::future::Future;
use std::time::Duration;

pub const MAX_ATTEMPTS: u32 = 3;
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(300);

/// Retries `op` up to [`MAX_ATTEMPTS`] times with linear backoff
/// (`attempt × 1s`), but only when the error is classified transient.
/// Non-retryable errors surface on the first attempt.
pub async fn retry_transient<T, F, Fut>(op: F) -> Result<T, ExtractError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, ExtractError>>,
{
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "transient error, retrying");
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Dialect-specific transient error code tables. A code is transient iff it
/// represents a deadlock, lock timeout, or connection reset that a retry is
/// likely to resolve.
pub mod codes {
    /// Postgres SQLSTATEs: `40001` serialization failure, `40P01` deadlock.
    pub const POSTGRES_TRANSIENT: &[&str] = &["40001", "40P01"];
    /// MySQL error numbers: 1213 deadlock, 1205 lock wait timeout.
    pub const MYSQL_TRANSIENT: &[u32] = &[1213, 1205];
    /// MSSQL error number: 1205 deadlock victim.
    pub const MSSQL_TRANSIENT: &[u32] = &[1205];
    /// Oracle error codes: ORA-00060 deadlock, ORA-00054 resource busy (NOWAIT).
    pub const ORACLE_TRANSIENT: &[&str] = &["ORA-00060", "ORA-00054"];
    /// DB2 SQLCODEs: -911 deadlock/timeout rollback, -913 deadlock/timeout no rollback.
    pub const DB2_TRANSIENT: &[i32] = &[-911, -913];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_and_eventually_succeeds() {
        let calls = AtomicU32::new(0);

        let result: Result<&str, ExtractError> = retry_transient(|attempt| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(ExtractError::Transient {
                        message: "deadlock".into(),
                        attempt,
                    })
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);

        let result: Result<(), ExtractError> = retry_transient(|_attempt| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExtractError::Permanent("syntax error".into()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), ExtractError> = retry_transient(|attempt| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExtractError::Transient {
                    message: "deadlock".into(),
                    attempt,
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}
