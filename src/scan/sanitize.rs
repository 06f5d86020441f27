//! Ingress boundary for OCR payloads.
//!
//! Whatever the OCR collaborator hands back (well-formed, truncated, wrong
//! types, `null`), [`normalize_scan_result`] turns it into a fully populated
//! [`ScanResult`]. Business logic downstream never re-checks shapes.
//! Normalization is idempotent: feeding a normalized result back through
//! (as a value or via its JSON) is a no-op.

use serde_json::Value;

use super::confidence::clamp_confidence;
use crate::models::{DetectedMedicine, ScanResult, NO_TEXT_EXTRACTED};

/// Normalize a raw OCR payload. Never fails.
pub fn normalize_scan_result(raw: &Value) -> ScanResult {
    let Some(obj) = raw.as_object() else {
        if !raw.is_null() {
            tracing::warn!(kind = value_kind(raw), "OCR payload is not an object, using defaults");
        }
        return ScanResult::default();
    };

    let confidence = match obj.get("confidence").and_then(Value::as_f64) {
        Some(c) => clamp_confidence(c),
        None => {
            tracing::warn!("Invalid confidence value in OCR payload, defaulting to 0");
            0.0
        }
    };

    let medicines = match obj.get("medicines").and_then(Value::as_array) {
        Some(items) => items.iter().filter_map(normalize_medicine).collect(),
        None => {
            tracing::warn!("Medicines not an array in OCR payload, using empty list");
            Vec::new()
        }
    };

    let raw_text = obj
        .get("rawText")
        .and_then(Value::as_str)
        .map(sanitize_raw_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TEXT_EXTRACTED.to_string());

    ScanResult {
        raw_text,
        confidence,
        medicines,
    }
}

/// Re-apply the boundary to an already typed result.
pub fn renormalize(result: &ScanResult) -> ScanResult {
    match serde_json::to_value(result) {
        Ok(value) => normalize_scan_result(&value),
        Err(_) => ScanResult::default(),
    }
}

fn normalize_medicine(raw: &Value) -> Option<DetectedMedicine> {
    let obj = raw.as_object()?;
    Some(DetectedMedicine {
        name: string_field(obj.get("name")),
        dosage: string_field(obj.get("dosage")),
        usage: string_field(obj.get("usage")),
        side_effects: string_list(obj.get("sideEffects")),
        precautions: string_list(obj.get("precautions")),
        active_ingredients: string_list(obj.get("activeIngredients")),
    })
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(sanitize_line)
        .unwrap_or_default()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(sanitize_line)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Strip control characters and surrounding whitespace from a single-line field.
fn sanitize_line(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Like [`sanitize_line`] but keeps line structure, dropping blank lines.
fn sanitize_raw_text(raw: &str) -> String {
    raw.lines()
        .map(sanitize_line)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_payload_is_fully_defaulted() {
        let result = normalize_scan_result(&Value::Null);
        assert_eq!(result.raw_text, NO_TEXT_EXTRACTED);
        assert_eq!(result.confidence, 0.0);
        assert!(result.medicines.is_empty());
    }

    #[test]
    fn non_object_payloads_are_defaulted() {
        for raw in [json!(42), json!("text"), json!([1, 2]), json!(true)] {
            assert_eq!(normalize_scan_result(&raw), ScanResult::default());
        }
    }

    #[test]
    fn wrong_field_types_are_coerced() {
        let raw = json!({
            "rawText": 17,
            "confidence": "0.9",
            "medicines": {"name": "Paracetamol"}
        });
        let result = normalize_scan_result(&raw);
        assert_eq!(result.raw_text, NO_TEXT_EXTRACTED);
        assert_eq!(result.confidence, 0.0);
        assert!(result.medicines.is_empty());
    }

    #[test]
    fn empty_raw_text_uses_sentinel() {
        let result = normalize_scan_result(&json!({"rawText": "  \n\x00  "}));
        assert_eq!(result.raw_text, NO_TEXT_EXTRACTED);
    }

    #[test]
    fn confidence_out_of_range_is_clamped() {
        assert_eq!(normalize_scan_result(&json!({"confidence": 3.5})).confidence, 1.0);
        assert_eq!(normalize_scan_result(&json!({"confidence": -1})).confidence, 0.0);
    }

    #[test]
    fn medicine_fields_are_defaulted() {
        let raw = json!({
            "confidence": 0.92,
            "medicines": [
                {"name": "Paracetamol", "sideEffects": ["Nausea", 5, null, "Stomach pain"]},
                "garbage",
                null,
                {"dosage": "1 tablet", "precautions": "not a list"}
            ]
        });
        let result = normalize_scan_result(&raw);
        assert_eq!(result.medicines.len(), 2);
        assert_eq!(result.medicines[0].name, "Paracetamol");
        assert_eq!(result.medicines[0].dosage, "");
        assert_eq!(result.medicines[0].side_effects, vec!["Nausea", "Stomach pain"]);
        assert!(result.medicines[0].precautions.is_empty());
        assert_eq!(result.medicines[1].name, "");
        assert_eq!(result.medicines[1].dosage, "1 tablet");
    }

    #[test]
    fn control_characters_stripped() {
        let raw = json!({
            "rawText": "Paracetamol\x00 500mg\n\n\x07Take 1-2 tablets",
            "medicines": [{"name": " Para\x01cetamol "}]
        });
        let result = normalize_scan_result(&raw);
        assert_eq!(result.raw_text, "Paracetamol 500mg\nTake 1-2 tablets");
        assert_eq!(result.medicines[0].name, "Paracetamol");
    }

    #[test]
    fn valid_payload_passes_through() {
        let raw = json!({
            "rawText": "Amoxicillin 250mg capsules.",
            "confidence": 0.88,
            "medicines": [{
                "name": "Amoxicillin",
                "activeIngredients": ["Amoxicillin 250mg"],
                "dosage": "Take one capsule three times daily",
                "usage": "For bacterial infection.",
                "sideEffects": ["Diarrhea", "Nausea", "Skin rash"],
                "precautions": ["Complete full course"]
            }]
        });
        let result = normalize_scan_result(&raw);
        assert_eq!(result.raw_text, "Amoxicillin 250mg capsules.");
        assert_eq!(result.confidence, 0.88);
        assert_eq!(result.medicines[0].active_ingredients, vec!["Amoxicillin 250mg"]);
        assert_eq!(result.medicines[0].side_effects.len(), 3);
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            Value::Null,
            json!({"confidence": "high", "medicines": 3}),
            json!({"rawText": "  Lisinopril\x00 10mg ", "confidence": 1.4,
                   "medicines": [{"name": "Lisinopril", "sideEffects": ["Dizziness", 1]}]}),
        ];
        for raw in inputs {
            let once = normalize_scan_result(&raw);
            let twice = renormalize(&once);
            assert_eq!(once, twice);
        }
    }
}
