//! Reminder request gate.
//!
//! Validation is pure. Scheduling and notification belong to whichever
//! [`ReminderSink`] receives the validated request; nothing here retries
//! or persists reminders.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::{Frequency, ReminderInput, ReminderRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "value", rename_all = "snake_case")]
pub enum InvalidReason {
    MissingDosage,
    MissingTime,
    UnknownFrequency(String),
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::MissingDosage => f.write_str("Dosage is required"),
            InvalidReason::MissingTime => f.write_str("Time is required"),
            InvalidReason::UnknownFrequency(value) => write!(f, "Unknown frequency: {value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderValidation {
    Valid(ReminderRequest),
    Invalid { reason: InvalidReason },
}

impl ReminderValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, ReminderValidation::Valid(_))
    }

    pub fn request(&self) -> Option<&ReminderRequest> {
        match self {
            ReminderValidation::Valid(request) => Some(request),
            ReminderValidation::Invalid { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&InvalidReason> {
        match self {
            ReminderValidation::Valid(_) => None,
            ReminderValidation::Invalid { reason } => Some(reason),
        }
    }
}

/// Whether the submit control should be enabled.
pub fn can_submit(dosage: &str, time: &str) -> bool {
    !dosage.trim().is_empty() && !time.trim().is_empty()
}

/// Check a reminder form. Frequency defaults to daily when unspecified.
pub fn validate_reminder(input: &ReminderInput) -> ReminderValidation {
    if input.dosage.trim().is_empty() {
        return ReminderValidation::Invalid {
            reason: InvalidReason::MissingDosage,
        };
    }
    if input.time.trim().is_empty() {
        return ReminderValidation::Invalid {
            reason: InvalidReason::MissingTime,
        };
    }

    let frequency = match input.frequency.as_deref().map(str::trim) {
        None | Some("") => Frequency::default(),
        Some(raw) => match Frequency::from_str(raw) {
            Ok(freq) => freq,
            Err(_) => {
                return ReminderValidation::Invalid {
                    reason: InvalidReason::UnknownFrequency(raw.to_string()),
                }
            }
        },
    };

    ReminderValidation::Valid(ReminderRequest {
        medicine_name: input.medicine_name.clone(),
        dosage: input.dosage.clone(),
        time: input.time.clone(),
        frequency,
    })
}

/// Reminder sink collaborator. Receives validated requests only.
pub trait ReminderSink {
    fn submit(&self, request: ReminderRequest);
}

/// Collects handed-off requests in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    received: Mutex<Vec<ReminderRequest>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<ReminderRequest> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ReminderSink for RecordingSink {
    fn submit(&self, request: ReminderRequest) {
        if let Ok(mut received) = self.received.lock() {
            received.push(request);
        }
    }
}

impl<T: ReminderSink + ?Sized> ReminderSink for &T {
    fn submit(&self, request: ReminderRequest) {
        (**self).submit(request)
    }
}

/// Suggested reminder time: one hour from `now`, as HH:MM (wraps past midnight).
pub fn default_reminder_time(now: NaiveTime) -> String {
    let (later, _) = now.overflowing_add_signed(Duration::hours(1));
    later.format("%H:%M").to_string()
}

/// State of the reminder dialog, opened for one medicine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDraft {
    pub medicine_name: String,
    pub dosage: String,
    pub time: String,
    pub frequency: Frequency,
}

impl ReminderDraft {
    /// Pre-fill the medicine name and a time one hour after `now`.
    pub fn open_for(medicine_name: &str, now: NaiveTime) -> Self {
        Self {
            medicine_name: medicine_name.to_string(),
            dosage: String::new(),
            time: default_reminder_time(now),
            frequency: Frequency::default(),
        }
    }

    pub fn can_submit(&self) -> bool {
        can_submit(&self.dosage, &self.time)
    }

    /// Clear the form; the medicine name stays.
    pub fn cancel(&mut self) {
        self.dosage.clear();
        self.time.clear();
        self.frequency = Frequency::default();
    }

    pub fn to_input(&self) -> ReminderInput {
        ReminderInput {
            medicine_name: self.medicine_name.clone(),
            dosage: self.dosage.clone(),
            time: self.time.clone(),
            frequency: Some(self.frequency.as_str().to_string()),
        }
    }

    /// Validate and, when valid, hand the request to `sink` unchanged.
    pub fn confirm(&self, sink: &impl ReminderSink) -> ReminderValidation {
        let validation = validate_reminder(&self.to_input());
        match &validation {
            ReminderValidation::Valid(request) => {
                tracing::info!(
                    medicine = %request.medicine_name,
                    time = %request.time,
                    frequency = request.frequency.as_str(),
                    "Reminder handed off"
                );
                sink.submit(request.clone());
            }
            ReminderValidation::Invalid { reason } => {
                tracing::debug!(%reason, "Reminder submit blocked");
            }
        }
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(dosage: &str, time: &str, frequency: Option<&str>) -> ReminderInput {
        ReminderInput {
            medicine_name: "Paracetamol".into(),
            dosage: dosage.into(),
            time: time.into(),
            frequency: frequency.map(String::from),
        }
    }

    #[test]
    fn empty_dosage_is_invalid() {
        let v = validate_reminder(&input("", "08:00", None));
        assert!(!v.is_valid());
        assert_eq!(v.reason(), Some(&InvalidReason::MissingDosage));
    }

    #[test]
    fn empty_time_is_invalid() {
        let v = validate_reminder(&input("1 tablet", "", None));
        assert_eq!(v.reason(), Some(&InvalidReason::MissingTime));
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        assert!(!validate_reminder(&input("   ", "08:00", None)).is_valid());
        assert!(!validate_reminder(&input("1 tablet", " ", None)).is_valid());
    }

    #[test]
    fn valid_defaults_to_daily() {
        let v = validate_reminder(&input("1 tablet", "08:00", None));
        let request = v.request().unwrap();
        assert_eq!(request.frequency, Frequency::Daily);
        assert_eq!(request.dosage, "1 tablet");
        assert_eq!(request.time, "08:00");
        assert_eq!(request.medicine_name, "Paracetamol");
    }

    #[test]
    fn explicit_frequency_kept() {
        let v = validate_reminder(&input("1 tablet", "08:00", Some("three_times_daily")));
        assert_eq!(v.request().unwrap().frequency, Frequency::ThreeTimesDaily);
        let blank = validate_reminder(&input("1 tablet", "08:00", Some("")));
        assert_eq!(blank.request().unwrap().frequency, Frequency::Daily);
    }

    #[test]
    fn unknown_frequency_is_invalid() {
        let v = validate_reminder(&input("1 tablet", "08:00", Some("hourly")));
        assert_eq!(
            v.reason(),
            Some(&InvalidReason::UnknownFrequency("hourly".into()))
        );
    }

    #[test]
    fn default_time_is_one_hour_later() {
        let now = NaiveTime::from_hms_opt(9, 15, 42).unwrap();
        assert_eq!(default_reminder_time(now), "10:15");
        let late = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert_eq!(default_reminder_time(late), "00:30");
    }

    #[test]
    fn draft_blocks_until_dosage_entered() {
        let now = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        let mut draft = ReminderDraft::open_for("Amoxicillin", now);
        assert_eq!(draft.time, "08:00");
        assert!(!draft.can_submit());

        let sink = RecordingSink::new();
        assert!(!draft.confirm(&sink).is_valid());
        assert!(sink.received().is_empty());

        draft.dosage = "1 capsule".into();
        draft.frequency = Frequency::ThreeTimesDaily;
        assert!(draft.can_submit());
        assert!(draft.confirm(&sink).is_valid());

        let received = sink.received();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0],
            ReminderRequest {
                medicine_name: "Amoxicillin".into(),
                dosage: "1 capsule".into(),
                time: "08:00".into(),
                frequency: Frequency::ThreeTimesDaily,
            }
        );
    }

    #[test]
    fn cancel_resets_form() {
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let mut draft = ReminderDraft::open_for("Amoxicillin", midnight);
        draft.dosage = "2 capsules".into();
        draft.frequency = Frequency::Weekly;
        draft.cancel();
        assert_eq!(draft.medicine_name, "Amoxicillin");
        assert!(draft.dosage.is_empty());
        assert!(draft.time.is_empty());
        assert_eq!(draft.frequency, Frequency::Daily);
    }

    #[test]
    fn reason_messages() {
        assert_eq!(InvalidReason::MissingDosage.to_string(), "Dosage is required");
        assert_eq!(
            InvalidReason::UnknownFrequency("hourly".into()).to_string(),
            "Unknown frequency: hourly"
        );
    }
}
