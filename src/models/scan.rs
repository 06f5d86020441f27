use serde::{Deserialize, Serialize};

use super::history::MedicineDetails;

/// Sentinel shown when the OCR collaborator returned no usable text.
pub const NO_TEXT_EXTRACTED: &str = "No text extracted";

/// Normalized OCR response. Only built through
/// [`crate::scan::normalize_scan_result`], so every field is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub raw_text: String,
    /// Clamped to `[0.0, 1.0]`.
    pub confidence: f64,
    pub medicines: Vec<DetectedMedicine>,
}

impl Default for ScanResult {
    fn default() -> Self {
        Self {
            raw_text: NO_TEXT_EXTRACTED.to_string(),
            confidence: 0.0,
            medicines: Vec::new(),
        }
    }
}

impl ScanResult {
    pub fn first_medicine(&self) -> Option<&DetectedMedicine> {
        self.medicines.first()
    }

    /// First medicine, if the label gave it a name. An unnamed detection
    /// needs the user to type the name.
    pub fn named_medicine(&self) -> Option<&DetectedMedicine> {
        self.first_medicine().filter(|m| !m.name.trim().is_empty())
    }

    pub fn has_medicines(&self) -> bool {
        !self.medicines.is_empty()
    }
}

/// One medicine recognised on a label. Transient, never persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedMedicine {
    pub name: String,
    pub dosage: String,
    pub usage: String,
    pub side_effects: Vec<String>,
    pub precautions: Vec<String>,
    pub active_ingredients: Vec<String>,
}

impl DetectedMedicine {
    /// Snapshot kept on the history entry.
    pub fn details(&self) -> MedicineDetails {
        MedicineDetails {
            dosage: self.dosage.clone(),
            uses: self.usage.clone(),
            side_effects: self.side_effects.clone(),
            precautions: self.precautions.clone(),
        }
    }
}
