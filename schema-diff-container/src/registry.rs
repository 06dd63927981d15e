//! Process-wide shutdown hook registry.
//!
//! The only process-wide state in the container subsystem: it tracks every
//! ephemeral container still believed to be running so a caller can fire
//! `shutdown_all()` once, e.g. from a `ctrlc` handler or a panic hook,
//! instead of needing to thread every live `ContainerLifecycle` handle
//! through to wherever the process decides to exit.
//!
//! Registration and firing are both safe to call concurrently; firing is
//! idempotent because each entry's own `stop()` is idempotent.

use crate::ContainerLifecycle;
use std::sync::{Mutex, OnceLock};
use tokio::sync::Mutex as AsyncMutex;
use std::sync::Arc;

type StopFn = Arc<AsyncMutex<Option<testcontainers::ContainerAsync<testcontainers::GenericImage>>>>;

static REGISTRY: OnceLock<Mutex<Vec<StopFn>>> = OnceLock::new();

fn registry() -> &'static Mutex<Vec<StopFn>> {
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

pub(crate) fn register(lifecycle: &ContainerLifecycle) {
    if let Some(container) = lifecycle.container_handle() {
        registry().lock().unwrap().push(container);
    }
}

/// Stops every container this process has started and not already stopped.
/// Safe to call more than once; safe to call from a signal handler context
/// that cannot itself be `async` by blocking on a short-lived runtime.
pub fn shutdown_all() {
    let handles: Vec<StopFn> = {
        let mut guard = registry().lock().unwrap();
        std::mem::take(&mut *guard)
    };

    if handles.is_empty() {
        return;
    }

    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            tracing::warn!("shutdown_all called outside a tokio runtime; containers were not stopped");
            return;
        }
    };

    for handle in handles {
        runtime.spawn(async move {
            let mut guard = handle.lock().await;
            if let Some(container) = guard.take() {
                if let Err(err) = container.stop().await {
                    tracing::warn!(error = %err, "error stopping container during shutdown");
                }
            }
        });
    }
}
