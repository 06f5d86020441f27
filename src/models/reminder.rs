use serde::{Deserialize, Serialize};

use super::enums::Frequency;

/// Raw reminder form input, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderInput {
    #[serde(default)]
    pub medicine_name: String,
    #[serde(default)]
    pub dosage: String,
    /// HH:MM
    #[serde(default)]
    pub time: String,
    /// snake_case frequency; `None` means daily.
    #[serde(default)]
    pub frequency: Option<String>,
}

/// Validated reminder, handed to the reminder sink verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub medicine_name: String,
    pub dosage: String,
    pub time: String,
    pub frequency: Frequency,
}
