use super::Phase;
use std::time::Duration;

/// Delivered synchronously; listeners must not block, since they are
/// invoked on the same task driving extraction. Progress callbacks for a
/// single side are totally ordered: start/end pairs nest. There is no
/// ordering guarantee across the reference and target sides.
pub trait ProgressListener: Send + Sync {
    fn on_phase_start(&self, phase: Phase) {
        let _ = phase;
    }

    fn on_phase_complete(&self, phase: Phase, items: usize, duration: Duration) {
        let _ = (phase, items, duration);
    }

    fn on_warning(&self, text: &str) {
        let _ = text;
    }
}

/// A listener that only emits `tracing` events, for callers that don't need
/// their own progress UI.
pub struct TracingProgressListener {
    pub side: &'static str,
}

impl ProgressListener for TracingProgressListener {
    fn on_phase_start(&self, phase: Phase) {
        tracing::info!(side = self.side, phase = phase.as_str(), "phase started");
    }

    fn on_phase_complete(&self, phase: Phase, items: usize, duration: Duration) {
        tracing::info!(
            side = self.side,
            phase = phase.as_str(),
            items,
            duration_ms = duration.as_millis() as u64,
            "phase complete"
        );
    }

    fn on_warning(&self, text: &str) {
        tracing::warn!(side = self.side, warning = text, "extraction warning");
    }
}

pub struct NoopProgressListener;

impl ProgressListener for NoopProgressListener {}
