//! Voice and screen-reader announcements.
//!
//! The announcer is fire-and-forget: nothing here waits for, or can fail on,
//! delivery. Message builders keep the wording used across the app in one
//! place.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::models::{DetectedMedicine, Politeness};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
    pub text: String,
    pub politeness: Politeness,
}

impl Announcement {
    pub fn polite(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            politeness: Politeness::Polite,
        }
    }

    /// Interrupts whatever is being read.
    pub fn assertive(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            politeness: Politeness::Assertive,
        }
    }

    pub fn error(text: &str) -> Self {
        Self::assertive(format!("Error: {text}"))
    }

    pub fn form_submission(form_name: &str) -> Self {
        Self::polite(format!("{form_name} form submitted successfully."))
    }
}

/// Voice/announcement collaborator.
pub trait Announcer {
    fn announce(&self, announcement: Announcement);
}

impl<A: Announcer + ?Sized> Announcer for Arc<A> {
    fn announce(&self, announcement: Announcement) {
        (**self).announce(announcement)
    }
}

impl<A: Announcer + ?Sized> Announcer for &A {
    fn announce(&self, announcement: Announcement) {
        (**self).announce(announcement)
    }
}

/// Writes announcements to the log. Default for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnnouncer;

impl Announcer for TracingAnnouncer {
    fn announce(&self, announcement: Announcement) {
        tracing::info!(
            politeness = announcement.politeness.as_str(),
            "{}",
            announcement.text
        );
    }
}

/// Keeps every announcement in memory.
#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    heard: Mutex<Vec<Announcement>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announcements(&self) -> Vec<Announcement> {
        self.heard.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.announcements().into_iter().map(|a| a.text).collect()
    }

    pub fn last(&self) -> Option<Announcement> {
        self.heard.lock().ok().and_then(|h| h.last().cloned())
    }
}

impl Announcer for RecordingAnnouncer {
    fn announce(&self, announcement: Announcement) {
        if let Ok(mut heard) = self.heard.lock() {
            heard.push(announcement);
        }
    }
}

/// Full spoken description of a detected medicine ("Listen" action).
pub fn medicine_readout(medicine: &DetectedMedicine) -> String {
    let side_effects = if medicine.side_effects.is_empty() {
        "None reported".to_string()
    } else {
        medicine.side_effects.join(", ")
    };
    let precautions = if medicine.precautions.is_empty() {
        "None".to_string()
    } else {
        medicine.precautions.join(", ")
    };
    format!(
        "Medicine: {}. Uses: {}. Dosage: {}. Side effects: {}. Precautions: {}",
        medicine.name,
        or_not_specified(&medicine.usage),
        or_not_specified(&medicine.dosage),
        side_effects,
        precautions
    )
}

fn or_not_specified(value: &str) -> &str {
    if value.is_empty() {
        "Not specified"
    } else {
        value
    }
}
