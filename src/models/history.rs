use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the latest scan of a medicine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineDetails {
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub uses: String,
    #[serde(default)]
    pub side_effects: Vec<String>,
    #[serde(default)]
    pub precautions: Vec<String>,
}

/// Deduplicated per-medicine scan record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineHistoryEntry {
    /// Millisecond clock value, unique within the process.
    pub id: i64,
    /// Spelling from the first scan; matched case-insensitively.
    pub name: String,
    pub scan_count: u32,
    /// `None` only for tampered or legacy rows without a readable date.
    pub last_scanned: Option<DateTime<Utc>>,
    pub details: Option<MedicineDetails>,
}

impl MedicineHistoryEntry {
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
