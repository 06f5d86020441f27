use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use super::{HistoryError, HistoryStore};
use crate::announce::Announcement;
use crate::models::{MedicineDetails, MedicineHistoryEntry};

/// Shown when the stored history could not be read.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load scan history. Please try again.";

static LAST_ENTRY_ID: AtomicI64 = AtomicI64::new(0);

/// Next entry id: the millisecond clock, bumped past every id already
/// handed out in this process and every id in `existing`.
fn next_entry_id(now_ms: i64, existing: &[MedicineHistoryEntry]) -> i64 {
    let floor = existing.iter().map(|e| e.id).max().unwrap_or(i64::MIN);
    let mut last = LAST_ENTRY_ID.load(Ordering::SeqCst);
    loop {
        let candidate = now_ms
            .max(last.saturating_add(1))
            .max(floor.saturating_add(1));
        match LAST_ENTRY_ID.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Outcome of the last (re)load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum HistoryStatus {
    NotLoaded,
    Empty,
    Loaded(usize),
    /// Recoverable; `reload` may clear it.
    Error(String),
}

impl HistoryStatus {
    pub fn announcement(&self) -> Option<Announcement> {
        match self {
            HistoryStatus::NotLoaded => None,
            HistoryStatus::Empty => Some(Announcement::polite("No medicines in your scan history")),
            HistoryStatus::Loaded(1) => {
                Some(Announcement::polite("1 medicine found in your scan history"))
            }
            HistoryStatus::Loaded(n) => Some(Announcement::polite(format!(
                "{n} medicines found in your scan history"
            ))),
            HistoryStatus::Error(_) => {
                Some(Announcement::assertive("Error loading medicine history"))
            }
        }
    }

    fn from_len(len: usize) -> Self {
        if len == 0 {
            HistoryStatus::Empty
        } else {
            HistoryStatus::Loaded(len)
        }
    }
}

/// Read-through cache over a [`HistoryStore`].
pub struct MedicineHistory<S> {
    store: S,
    entries: Vec<MedicineHistoryEntry>,
    status: HistoryStatus,
}

impl<S: HistoryStore> MedicineHistory<S> {
    /// Nothing is read until [`MedicineHistory::reload`].
    pub fn new(store: S) -> Self {
        Self {
            store,
            entries: Vec::new(),
            status: HistoryStatus::NotLoaded,
        }
    }

    /// Construct and load in one step.
    pub fn mount(store: S) -> Self {
        let mut history = Self::new(store);
        history.reload();
        history
    }

    /// Replace the cache with the stored list. Never fails: unusable data
    /// leaves an empty list and an `Error` status.
    pub fn reload(&mut self) -> &HistoryStatus {
        match self.store.load() {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "Scan history loaded");
                self.status = HistoryStatus::from_len(entries.len());
                self.entries = entries;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load scan history");
                self.entries.clear();
                self.status = HistoryStatus::Error(LOAD_FAILED_MESSAGE.to_string());
            }
        }
        &self.status
    }

    pub fn status(&self) -> &HistoryStatus {
        &self.status
    }

    pub fn entries(&self) -> &[MedicineHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&MedicineHistoryEntry> {
        self.entries.iter().find(|e| e.matches_name(name.trim()))
    }

    /// Record a scan of `name` at the current time.
    pub fn record_scan(
        &mut self,
        name: Option<&str>,
        details: Option<MedicineDetails>,
    ) -> Result<&[MedicineHistoryEntry], HistoryError> {
        self.record_scan_at(name, details, Utc::now())
    }

    /// Record a scan of `name` at `now`.
    ///
    /// A blank name is a no-op. A repeat scan bumps the count and replaces
    /// the date and, when given, the details. The full list is saved before
    /// the cache changes; on a failed save the cache is left as it was.
    pub fn record_scan_at(
        &mut self,
        name: Option<&str>,
        details: Option<MedicineDetails>,
        now: DateTime<Utc>,
    ) -> Result<&[MedicineHistoryEntry], HistoryError> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            tracing::debug!("Ignoring scan record without a medicine name");
            return Ok(&self.entries);
        };

        let mut updated = self.entries.clone();
        match updated.iter_mut().find(|e| e.matches_name(name)) {
            Some(existing) => {
                existing.scan_count = existing.scan_count.saturating_add(1);
                existing.last_scanned = Some(now);
                if details.is_some() {
                    existing.details = details;
                }
                tracing::info!(
                    medicine = %existing.name,
                    scan_count = existing.scan_count,
                    "Repeat scan recorded"
                );
            }
            None => {
                let id = next_entry_id(now.timestamp_millis(), &updated);
                updated.push(MedicineHistoryEntry {
                    id,
                    name: name.to_string(),
                    scan_count: 1,
                    last_scanned: Some(now),
                    details,
                });
                tracing::info!(medicine = %name, id, "New medicine added to scan history");
            }
        }

        self.store.save(&updated)?;
        self.status = HistoryStatus::from_len(updated.len());
        self.entries = updated;
        Ok(&self.entries)
    }

    /// Spoken summary for a selected entry, `None` for an unknown name.
    pub fn select<Tz: TimeZone>(&self, name: &str, tz: &Tz) -> Option<Announcement>
    where
        Tz::Offset: std::fmt::Display,
    {
        let entry = self.find(name)?;
        let last = entry
            .last_scanned
            .map(|ts| ts.with_timezone(tz).format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| "Unknown date".to_string());
        Some(Announcement::polite(format!(
            "Selected {}. Scanned {} times. Last scanned {}",
            entry.name, entry.scan_count, last
        )))
    }
}

/// "Oct 18, 2026, 09:30 AM" in `tz`; "Unknown date" when absent.
pub fn format_scan_date<Tz: TimeZone>(ts: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match ts {
        Some(ts) => ts.with_timezone(tz).format("%b %-d, %Y, %I:%M %p").to_string(),
        None => "Unknown date".to_string(),
    }
}
