//! Scan pipeline: OCR payload normalization, result classification and the
//! capture/process state machine that ties them to history and reminders.

pub mod classify;
pub mod confidence;
pub mod flow;
pub mod ocr;
pub mod sanitize;

pub use classify::*;
pub use confidence::*;
pub use flow::*;
pub use ocr::*;
pub use sanitize::*;

use thiserror::Error;

use crate::history::HistoryError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("A scan is already being processed")]
    AlreadyProcessing,

    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    #[error("Scan flow has been unmounted")]
    Unmounted,

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Scan state lock poisoned")]
    LockPoisoned,
}
