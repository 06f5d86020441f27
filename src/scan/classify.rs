use serde::Serialize;

use super::confidence::{confidence_percent, is_high_confidence};
use crate::models::{DetectedMedicine, ScanResult};

/// Shown when the OCR collaborator rejected without a message.
pub const DEFAULT_SCAN_ERROR: &str = "An unexpected error occurred while processing your image.";

/// Prompt announced when the user must type the medicine name.
pub const MANUAL_NAME_PROMPT: &str = "Please confirm the medicine name before setting a reminder";

/// Actionable tips listed under a failed scan.
pub const SCAN_FAILURE_GUIDANCE: [&str; 4] = [
    "Make sure your image is clear and well-lit",
    "Focus on the medicine label",
    "Try uploading a different image",
    "Refresh the page if the problem persists",
];

/// Exactly one of the four result states.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanView {
    Loading,
    Error {
        message: String,
        guidance: Vec<String>,
    },
    Empty,
    Success {
        confidence_percent: u8,
        detail: SuccessDetail,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuccessDetail {
    /// Full detail; "Set Reminder" is bound to `medicine`.
    HighConfidence { medicine: DetectedMedicine },
    /// Raw text plus manual name entry.
    LowConfidence { raw_text: String },
}

impl ScanView {
    pub fn is_high_confidence(&self) -> bool {
        matches!(
            self,
            ScanView::Success {
                detail: SuccessDetail::HighConfidence { .. },
                ..
            }
        )
    }

    /// Medicine the "Set Reminder" action is pre-bound to, if any.
    pub fn reminder_target(&self) -> Option<&str> {
        match self {
            ScanView::Success {
                detail: SuccessDetail::HighConfidence { medicine },
                ..
            } => Some(medicine.name.as_str()),
            _ => None,
        }
    }
}

/// Pick the view for the current scan state.
/// Loading wins over an error, an error wins over stale data.
pub fn classify(
    is_loading: bool,
    error: Option<&str>,
    result: Option<&ScanResult>,
    threshold: f64,
) -> ScanView {
    if is_loading {
        return ScanView::Loading;
    }
    if let Some(message) = error {
        let message = if message.trim().is_empty() {
            DEFAULT_SCAN_ERROR.to_string()
        } else {
            message.to_string()
        };
        return ScanView::Error {
            message,
            guidance: SCAN_FAILURE_GUIDANCE.iter().map(|s| s.to_string()).collect(),
        };
    }
    let Some(result) = result else {
        return ScanView::Empty;
    };

    let detail = match result.named_medicine() {
        Some(medicine) if is_high_confidence(result.confidence, threshold) => {
            SuccessDetail::HighConfidence {
                medicine: medicine.clone(),
            }
        }
        _ => SuccessDetail::LowConfidence {
            raw_text: result.raw_text.clone(),
        },
    };

    ScanView::Success {
        confidence_percent: confidence_percent(result.confidence),
        detail,
    }
}

/// Accept a typed medicine name from the low-confidence fallback.
/// Returns `None` for blank input, which keeps the confirm action disabled.
pub fn confirm_manual_name(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
