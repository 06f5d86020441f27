//! Ingress boundary for stored history blobs.
//!
//! Stored data may be missing, hand-edited, or written by an older build.
//! Only unparseable JSON is reported; every other oddity is repaired or the
//! offending entry skipped.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::HistoryError;
use crate::models::{MedicineDetails, MedicineHistoryEntry};

/// Parse a stored blob. `Err` only when the text is not JSON at all.
pub fn parse_history_blob(raw: &str) -> Result<Vec<MedicineHistoryEntry>, HistoryError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| HistoryError::Corrupt(e.to_string()))?;
    Ok(normalize_history_value(&value))
}

/// Normalize a decoded blob. Non-arrays (including `null`) yield an empty list.
pub fn normalize_history_value(value: &Value) -> Vec<MedicineHistoryEntry> {
    let Some(items) = value.as_array() else {
        if !value.is_null() {
            tracing::warn!("Stored scan history is not a list, starting empty");
        }
        return Vec::new();
    };

    let entries: Vec<MedicineHistoryEntry> = items.iter().filter_map(normalize_entry).collect();
    let skipped = items.len() - entries.len();
    if skipped > 0 {
        tracing::debug!(skipped, kept = entries.len(), "Skipped invalid history entries");
    }
    entries
}

fn normalize_entry(value: &Value) -> Option<MedicineHistoryEntry> {
    let obj = value.as_object()?;
    let id = parse_id(obj.get("id")?)?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())?
        .to_string();

    let scan_count = obj
        .get("scanCount")
        .and_then(Value::as_u64)
        .map(|c| c.clamp(1, u32::MAX as u64) as u32)
        .unwrap_or(1);

    Some(MedicineHistoryEntry {
        id,
        name,
        scan_count,
        last_scanned: obj.get("lastScanned").and_then(parse_timestamp),
        details: obj
            .get("details")
            .and_then(Value::as_object)
            .map(normalize_details),
    })
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339 strings, `YYYY-MM-DD HH:MM:SS` strings (UTC) or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn normalize_details(obj: &Map<String, Value>) -> MedicineDetails {
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let list = |key: &str| {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    };
    MedicineDetails {
        dosage: text("dosage"),
        uses: text("uses"),
        side_effects: list("sideEffects"),
        precautions: list("precautions"),
    }
}
