// src/utils/progress_bars/progress_callback.rs - Progress callbacks for batch monitoring

use log::debug;
use std::sync::Arc;
use std::time::Instant;

/// Type alias for progress callback functions
/// Takes phase name and optional detailed progress information
pub type ProgressCallback = Arc<dyn Fn(String, Option<String>) + Send + Sync>;

/// A callback that only writes debug log lines.
pub fn create_simple_callback(label: &str) -> ProgressCallback {
    let label = label.to_string();
    Arc::new(move |phase: String, details: Option<String>| {
        let detail_str = details.map(|d| format!(" - {}", d)).unwrap_or_default();
        debug!("[{}] Progress: {}{}", label, phase, detail_str);
    })
}

/// Convenience macro for reporting a phase change through an optional callback
#[macro_export]
macro_rules! update_progress {
    ($callback:expr, $phase:expr) => {
        if let Some(ref cb) = $callback {
            cb($phase.to_string(), None);
        }
    };
    ($callback:expr, $phase:expr, $details:expr) => {
        if let Some(ref cb) = $callback {
            cb($phase.to_string(), Some($details.to_string()));
        }
    };
}

/// Convenience macro for reporting counted progress through an optional callback
#[macro_export]
macro_rules! update_detailed_progress {
    ($callback:expr, $phase:expr, $current:expr, $total:expr) => {
        if let Some(ref cb) = $callback {
            let details = format!("{}/{}", $current, $total);
            cb($phase.to_string(), Some(details));
        }
    };
    ($callback:expr, $phase:expr, $current:expr, $total:expr, $extra:expr) => {
        if let Some(ref cb) = $callback {
            let details = format!("{}/{} ({})", $current, $total, $extra);
            cb($phase.to_string(), Some(details));
        }
    };
}

/// Tracks the current phase of a run and forwards updates to an optional callback
pub struct ProgressTracker {
    callback: Option<ProgressCallback>,
    current_phase: String,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            current_phase: "Initializing".to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn set_phase(&mut self, phase: &str) {
        self.current_phase = phase.to_string();
        update_progress!(self.callback, phase);
    }

    pub fn current_phase(&self) -> &str {
        &self.current_phase
    }

    pub fn finish_phase(&self, summary: &str) {
        let elapsed = self.start_time.elapsed();
        update_progress!(
            self.callback,
            "Completed",
            format!("{} in {:.2}s", summary, elapsed.as_secs_f64())
        );
    }
}
