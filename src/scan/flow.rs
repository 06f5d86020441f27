//! Capture → process → result state machine.
//!
//! One scan may be in flight per flow. The OCR await happens with no lock
//! held; once it resolves the result is applied only if the flow is still
//! mounted, has not been reset since the scan started, and is still
//! processing that same scan. Anything else is discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, TimeZone};
use serde::Serialize;
use uuid::Uuid;

use super::classify::{classify, confirm_manual_name, ScanView};
use super::confidence::{is_high_confidence, thresholds};
use super::ocr::{OcrCollaborator, ScanImage};
use super::sanitize::normalize_scan_result;
use super::ScanError;
use crate::announce::{medicine_readout, Announcement, Announcer};
use crate::history::{HistoryStatus, HistoryStore, MedicineHistory};
use crate::models::{MedicineDetails, MedicineHistoryEntry, ScanResult, ScanSource};
use crate::reminder::{ReminderDraft, ReminderSink, ReminderValidation};

/// Spoken after any failed scan, whatever the collaborator said.
pub const SCAN_ERROR_ANNOUNCEMENT: &str = "Error processing image. Please try again.";

pub const HISTORY_RELOADED: &str = "Scan history reloaded successfully";
pub const HISTORY_RELOAD_FAILED: &str = "Error reloading medicine history";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowConfig {
    /// Confidence strictly above this counts as a reliable detection.
    pub high_confidence_threshold: f64,
    /// Also record the first medicine of low-confidence scans.
    pub record_low_confidence_detections: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            high_confidence_threshold: thresholds::HIGH,
            record_low_confidence_detections: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ScanPhase {
    Idle,
    Capturing {
        source: ScanSource,
    },
    Processing {
        scan_id: Uuid,
        source: ScanSource,
    },
    Succeeded {
        scan_id: Uuid,
        result: ScanResult,
        high_confidence: bool,
    },
    Failed {
        scan_id: Uuid,
        message: String,
    },
}

impl ScanPhase {
    pub fn name(&self) -> &'static str {
        match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Capturing { .. } => "capturing",
            ScanPhase::Processing { .. } => "processing",
            ScanPhase::Succeeded { .. } => "succeeded",
            ScanPhase::Failed { .. } => "failed",
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, ScanPhase::Processing { .. })
    }
}

/// What a call to [`ScanFlow::submit`] ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Success {
        scan_id: Uuid,
        view: ScanView,
        /// Whether the first medicine was written to history.
        recorded: bool,
        /// Reminder dialog to open straight away (high confidence only).
        reminder: Option<ReminderDraft>,
    },
    Failed {
        scan_id: Uuid,
        message: String,
    },
    /// The flow was reset or unmounted while the OCR call was running.
    Discarded { scan_id: Uuid },
}

pub struct ScanFlow<O, S, A> {
    ocr: O,
    announcer: A,
    config: FlowConfig,
    // Lock order: phase, then history.
    phase: Mutex<ScanPhase>,
    history: Mutex<MedicineHistory<S>>,
    auto_reminder: Mutex<Option<ReminderDraft>>,
    alive: AtomicBool,
    generation: AtomicU64,
}

impl<O, S, A> ScanFlow<O, S, A>
where
    O: OcrCollaborator,
    S: HistoryStore,
    A: Announcer,
{
    /// History is not read until [`ScanFlow::mount`].
    pub fn new(ocr: O, store: S, announcer: A, config: FlowConfig) -> Self {
        Self {
            ocr,
            announcer,
            config,
            phase: Mutex::new(ScanPhase::Idle),
            history: Mutex::new(MedicineHistory::new(store)),
            auto_reminder: Mutex::new(None),
            alive: AtomicBool::new(true),
            generation: AtomicU64::new(0),
        }
    }

    /// Load history and announce what was found.
    pub fn mount(&self) -> Result<HistoryStatus, ScanError> {
        self.alive.store(true, Ordering::SeqCst);
        let status = self.lock_history()?.reload().clone();
        if let Some(announcement) = status.announcement() {
            self.announcer.announce(announcement);
        }
        Ok(status)
    }

    /// Results of scans still running are dropped, also after a later
    /// [`ScanFlow::mount`]. The flow comes back Idle.
    pub fn unmount(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        match self.phase.lock() {
            Ok(mut phase) => {
                tracing::debug!(from = phase.name(), "Scan flow unmounted");
                *phase = ScanPhase::Idle;
            }
            Err(_) => tracing::warn!("Scan flow unmounted with a poisoned state lock"),
        }
        self.clear_auto_reminder();
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn phase(&self) -> Result<ScanPhase, ScanError> {
        Ok(self.lock_phase()?.clone())
    }

    /// Result view for the current phase.
    pub fn view(&self) -> Result<ScanView, ScanError> {
        let phase = self.lock_phase()?;
        let threshold = self.config.high_confidence_threshold;
        Ok(match &*phase {
            ScanPhase::Idle | ScanPhase::Capturing { .. } => ScanView::Empty,
            ScanPhase::Processing { .. } => classify(true, None, None, threshold),
            ScanPhase::Failed { message, .. } => {
                classify(false, Some(message.as_str()), None, threshold)
            }
            ScanPhase::Succeeded { result, .. } => classify(false, None, Some(result), threshold),
        })
    }

    /// Open the camera or upload tab.
    pub fn begin_capture(&self, source: ScanSource) -> Result<(), ScanError> {
        let mut phase = self.lock_phase()?;
        match &*phase {
            ScanPhase::Idle | ScanPhase::Capturing { .. } => {
                *phase = ScanPhase::Capturing { source };
                tracing::debug!(source = source.as_str(), "Capture started");
                Ok(())
            }
            ScanPhase::Processing { .. } => Err(ScanError::AlreadyProcessing),
            other => Err(ScanError::InvalidTransition {
                action: "begin capture",
                phase: other.name(),
            }),
        }
    }

    /// Run OCR on `image` and apply the result.
    pub async fn submit(&self, image: ScanImage) -> Result<ScanOutcome, ScanError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(ScanError::Unmounted);
        }

        let scan_id = Uuid::new_v4();
        let source = image.source;
        let generation = {
            let mut phase = self.lock_phase()?;
            match &*phase {
                ScanPhase::Idle | ScanPhase::Capturing { .. } => {}
                ScanPhase::Processing { .. } => {
                    tracing::debug!(%scan_id, "Submit rejected, scan already in flight");
                    return Err(ScanError::AlreadyProcessing);
                }
                other => {
                    return Err(ScanError::InvalidTransition {
                        action: "submit",
                        phase: other.name(),
                    })
                }
            }
            *phase = ScanPhase::Processing { scan_id, source };
            self.clear_auto_reminder();
            self.generation.load(Ordering::SeqCst)
        };

        tracing::info!(
            %scan_id,
            source = source.as_str(),
            bytes = image.bytes.len(),
            "Processing scan"
        );
        let response = self.ocr.recognize(&image).await;

        let (outcome, announcement) = {
            let mut phase = self.lock_phase()?;
            let current = matches!(
                &*phase,
                ScanPhase::Processing { scan_id: id, .. } if *id == scan_id
            );
            if !self.alive.load(Ordering::SeqCst)
                || self.generation.load(Ordering::SeqCst) != generation
                || !current
            {
                tracing::debug!(%scan_id, "Discarding stale scan result");
                return Ok(ScanOutcome::Discarded { scan_id });
            }

            match response {
                Ok(payload) => {
                    let result = normalize_scan_result(&payload);
                    self.apply_success(&mut phase, scan_id, source, result)
                }
                Err(e) => {
                    tracing::warn!(%scan_id, error = %e, "OCR failed");
                    let message = e.message().to_string();
                    *phase = ScanPhase::Failed {
                        scan_id,
                        message: message.clone(),
                    };
                    (
                        ScanOutcome::Failed { scan_id, message },
                        Announcement::assertive(SCAN_ERROR_ANNOUNCEMENT),
                    )
                }
            }
        };

        self.announcer.announce(announcement);
        Ok(outcome)
    }

    fn apply_success(
        &self,
        phase: &mut MutexGuard<'_, ScanPhase>,
        scan_id: Uuid,
        source: ScanSource,
        result: ScanResult,
    ) -> (ScanOutcome, Announcement) {
        let threshold = self.config.high_confidence_threshold;
        let named = result.named_medicine();
        let high_confidence =
            named.is_some() && is_high_confidence(result.confidence, threshold);

        let mut recorded = false;
        if let Some(medicine) = named {
            if high_confidence || self.config.record_low_confidence_detections {
                match self.record(&medicine.name, medicine.details()) {
                    Ok(changed) => recorded = changed,
                    Err(e) => {
                        tracing::warn!(%scan_id, error = %e, "Failed to record scan in history")
                    }
                }
            }
        }

        let reminder = if high_confidence {
            named.map(|m| ReminderDraft::open_for(&m.name, Local::now().time()))
        } else {
            None
        };
        if let Ok(mut slot) = self.auto_reminder.lock() {
            *slot = reminder.clone();
        }

        let announcement = Announcement::polite(success_announcement(source, &result, high_confidence));
        tracing::info!(
            %scan_id,
            confidence = result.confidence,
            medicines = result.medicines.len(),
            high_confidence,
            recorded,
            "Scan processed"
        );

        let view = classify(false, None, Some(&result), threshold);
        **phase = ScanPhase::Succeeded {
            scan_id,
            result,
            high_confidence,
        };
        (
            ScanOutcome::Success {
                scan_id,
                view,
                recorded,
                reminder,
            },
            announcement,
        )
    }

    /// `Ok(true)` when an entry was added or bumped.
    fn record(&self, name: &str, details: MedicineDetails) -> Result<bool, ScanError> {
        let mut history = self.lock_history()?;
        let before = history.find(name).map(|e| (e.scan_count, e.last_scanned));
        history.record_scan(Some(name), Some(details))?;
        let after = history.find(name).map(|e| (e.scan_count, e.last_scanned));
        Ok(after.is_some() && after != before)
    }

    /// Failed → Idle.
    pub fn retry(&self) -> Result<(), ScanError> {
        let mut phase = self.lock_phase()?;
        match &*phase {
            ScanPhase::Failed { .. } => {
                *phase = ScanPhase::Idle;
                Ok(())
            }
            other => Err(ScanError::InvalidTransition {
                action: "retry",
                phase: other.name(),
            }),
        }
    }

    /// Back to Idle from anywhere ("Scan Again"). A scan still running is discarded.
    pub fn reset(&self) -> Result<(), ScanError> {
        let mut phase = self.lock_phase()?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(from = phase.name(), "Scan flow reset");
        *phase = ScanPhase::Idle;
        self.clear_auto_reminder();
        Ok(())
    }

    /// "Listen": read out the medicine of the current high-confidence
    /// result. Returns `false` when there is nothing to read.
    pub fn listen(&self) -> Result<bool, ScanError> {
        let readout = {
            let phase = self.lock_phase()?;
            match &*phase {
                ScanPhase::Succeeded {
                    result,
                    high_confidence: true,
                    ..
                } => result.named_medicine().map(medicine_readout),
                _ => None,
            }
        };
        Ok(match readout {
            Some(text) => {
                self.announcer.announce(Announcement::polite(text));
                true
            }
            None => false,
        })
    }

    /// Reminder dialog opened by the last high-confidence scan. Taking it
    /// clears it so it only opens once.
    pub fn take_auto_reminder(&self) -> Option<ReminderDraft> {
        self.auto_reminder.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn auto_open_reminder(&self) -> bool {
        self.auto_reminder
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    fn clear_auto_reminder(&self) {
        if let Ok(mut slot) = self.auto_reminder.lock() {
            *slot = None;
        }
    }

    /// Low-confidence fallback: open a reminder for a typed name.
    /// Blank input yields `None` and prompts for the name.
    pub fn confirm_manual_name(&self, input: &str) -> Option<ReminderDraft> {
        match confirm_manual_name(input) {
            Some(name) => {
                tracing::debug!(medicine = %name, "Medicine name confirmed manually");
                Some(ReminderDraft::open_for(&name, Local::now().time()))
            }
            None => {
                self.announcer
                    .announce(Announcement::polite(super::classify::MANUAL_NAME_PROMPT));
                None
            }
        }
    }

    /// Validate the dialog and hand it to `sink`.
    pub fn set_reminder(
        &self,
        draft: &ReminderDraft,
        sink: &impl ReminderSink,
    ) -> ReminderValidation {
        let validation = draft.confirm(sink);
        match &validation {
            ReminderValidation::Valid(_) => {
                self.announcer.announce(Announcement::form_submission("Reminder"))
            }
            ReminderValidation::Invalid { reason } => {
                self.announcer.announce(Announcement::error(&reason.to_string()))
            }
        }
        validation
    }

    pub fn history_status(&self) -> Result<HistoryStatus, ScanError> {
        Ok(self.lock_history()?.status().clone())
    }

    pub fn history_entries(&self) -> Result<Vec<MedicineHistoryEntry>, ScanError> {
        Ok(self.lock_history()?.entries().to_vec())
    }

    /// Re-read history ("Try Again" on a load error).
    pub fn reload_history(&self) -> Result<HistoryStatus, ScanError> {
        let status = self.lock_history()?.reload().clone();
        let announcement = match &status {
            HistoryStatus::Error(_) => Announcement::assertive(HISTORY_RELOAD_FAILED),
            _ => Announcement::polite(HISTORY_RELOADED),
        };
        self.announcer.announce(announcement);
        Ok(status)
    }

    /// Announce a history entry. Returns `false` for an unknown name.
    pub fn select_history<Tz: TimeZone>(&self, name: &str, tz: &Tz) -> Result<bool, ScanError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let announcement = self.lock_history()?.select(name, tz);
        Ok(match announcement {
            Some(announcement) => {
                self.announcer.announce(announcement);
                true
            }
            None => false,
        })
    }

    fn lock_phase(&self) -> Result<MutexGuard<'_, ScanPhase>, ScanError> {
        self.phase.lock().map_err(|_| ScanError::LockPoisoned)
    }

    fn lock_history(&self) -> Result<MutexGuard<'_, MedicineHistory<S>>, ScanError> {
        self.history.lock().map_err(|_| ScanError::LockPoisoned)
    }
}

fn success_announcement(source: ScanSource, result: &ScanResult, high_confidence: bool) -> String {
    let lead = match source {
        ScanSource::Camera => "OCR scan completed",
        ScanSource::Upload => "Image uploaded and processed",
    };
    match result.named_medicine() {
        Some(medicine) if high_confidence => {
            format!("{lead}. Found {} medicine with dosage instructions.", medicine.name)
        }
        _ => format!("{lead}. Low confidence result, please review the extracted text."),
    }
}
