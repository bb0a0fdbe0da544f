//! Operation lifecycle events and the observer seam.
//!
//! Algorithm code never talks to a logger directly; it reports [`Event`]s to
//! an injected [`Observer`]. [`NoopObserver`] drops them and [`LogObserver`]
//! forwards them to the `log` facade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Process-wide unique, monotonically increasing operation identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub u64);

static NEXT_OPERATION: AtomicU64 = AtomicU64::new(1);

impl OperationId {
    pub fn next() -> Self {
        Self(NEXT_OPERATION.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Non-fatal condition reported alongside a successful result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The threshold search found weak or no class separation.
    ///
    /// `fallback` is set when the mid-range cutoff replaced the search result.
    PoorSeparation {
        context: String,
        ratio: f64,
        fallback: bool,
    },
    /// A stage met an input it cannot improve (e.g. zero variance) and
    /// passed it through unchanged.
    DegenerateInput { stage: String, reason: String },
    /// A tile had too little contrast to threshold and was left background.
    LowContrastTile { col: usize, row: usize, range: u8 },
    /// A tile with too few pixels reused a neighbour's cutoffs.
    BorrowedThreshold {
        col: usize,
        row: usize,
        from: (usize, usize),
    },
    /// The stitched tile masks were all one class; a whole-image threshold
    /// replaced them.
    GlobalFallback { method: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::PoorSeparation {
                context,
                ratio,
                fallback,
            } => write!(
                f,
                "{context}: poor class separation (ratio {ratio:.3}, fallback={fallback})"
            ),
            Warning::DegenerateInput { stage, reason } => write!(f, "{stage}: {reason}"),
            Warning::LowContrastTile { col, row, range } => {
                write!(f, "tile ({col}, {row}): intensity range {range} too low")
            }
            Warning::BorrowedThreshold { col, row, from } => write!(
                f,
                "tile ({col}, {row}): too few pixels, borrowed cutoffs of tile {from:?}"
            ),
            Warning::GlobalFallback { method } => {
                write!(f, "{method}: uniform output, applied a global threshold")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    OperationStarted {
        id: OperationId,
        at: SystemTime,
    },
    StageStarted {
        id: OperationId,
        stage: &'static str,
    },
    StageFinished {
        id: OperationId,
        stage: &'static str,
        elapsed: Duration,
    },
    Warning {
        id: OperationId,
        warning: Warning,
    },
    /// Sent before `OperationFinished` when a run fails; `message` carries
    /// the error, e.g. the pyramid level and sizes of a combination error.
    OperationFailed {
        id: OperationId,
        message: String,
    },
    OperationFinished {
        id: OperationId,
        at: SystemTime,
        elapsed: Duration,
        success: bool,
    },
}

/// Receiver of progress events. Implementations must tolerate calls from
/// worker threads.
pub trait Observer: Sync {
    fn on_event(&self, _event: &Event) {}
}

/// Observer that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Observer that forwards events to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_event(&self, event: &Event) {
        match event {
            Event::OperationStarted { id, .. } => log::info!("{id} started"),
            Event::StageStarted { id, stage } => log::debug!("{id} {stage} started"),
            Event::StageFinished { id, stage, elapsed } => {
                log::debug!("{id} {stage} finished in {:.3} ms", elapsed.as_secs_f64() * 1e3)
            }
            Event::Warning { id, warning } => log::warn!("{id} {warning}"),
            Event::OperationFailed { id, message } => log::error!("{id} failed: {message}"),
            Event::OperationFinished {
                id,
                elapsed,
                success,
                ..
            } => log::info!(
                "{id} finished (success={success}) in {:.3} ms",
                elapsed.as_secs_f64() * 1e3
            ),
        }
    }
}
