use std::future::Future;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use crate::models::ScanSource;

/// Fallback message when the OCR collaborator fails without one.
pub const DEFAULT_OCR_FAILURE: &str = "Failed to process image";

/// OCR collaborator rejection. The message is shown to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct OcrError(pub String);

impl OcrError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self(DEFAULT_OCR_FAILURE.to_string())
        } else {
            Self(message)
        }
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Image handed over by the capture collaborator (camera or upload).
#[derive(Debug, Clone)]
pub struct ScanImage {
    pub source: ScanSource,
    pub bytes: Vec<u8>,
}

impl ScanImage {
    pub fn new(source: ScanSource, bytes: Vec<u8>) -> Self {
        Self { source, bytes }
    }
}

/// OCR engine abstraction (allows mocking for tests).
///
/// Returns the untrusted payload; callers pass it through
/// [`crate::scan::normalize_scan_result`] before use.
pub trait OcrCollaborator {
    fn recognize(&self, image: &ScanImage) -> impl Future<Output = Result<Value, OcrError>> + Send;
}

/// Canned OCR collaborator used for demos and tests.
#[derive(Debug, Clone)]
pub struct MockOcr {
    behaviour: MockBehaviour,
    delay: Option<Duration>,
}

#[derive(Debug, Clone)]
enum MockBehaviour {
    /// Built-in label per capture source.
    Canned,
    Payload(Value),
    Fail(String),
}

impl Default for MockOcr {
    fn default() -> Self {
        Self::canned()
    }
}

impl MockOcr {
    /// Paracetamol for camera captures, Amoxicillin for uploads.
    pub fn canned() -> Self {
        Self {
            behaviour: MockBehaviour::Canned,
            delay: None,
        }
    }

    /// Always resolve with `payload`, however malformed.
    pub fn with_payload(payload: Value) -> Self {
        Self {
            behaviour: MockBehaviour::Payload(payload),
            delay: None,
        }
    }

    /// Always reject with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            behaviour: MockBehaviour::Fail(message.to_string()),
            delay: None,
        }
    }

    /// Simulated processing time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl OcrCollaborator for MockOcr {
    async fn recognize(&self, image: &ScanImage) -> Result<Value, OcrError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if image.bytes.is_empty() {
            return Err(OcrError::new("No image data received"));
        }
        match &self.behaviour {
            MockBehaviour::Canned => Ok(canned_payload(image.source)),
            MockBehaviour::Payload(value) => Ok(value.clone()),
            MockBehaviour::Fail(message) => Err(OcrError::new(message.clone())),
        }
    }
}

fn canned_payload(source: ScanSource) -> Value {
    match source {
        ScanSource::Camera => json!({
            "rawText": "Paracetamol 500mg tablets. Take 1-2 tablets every 4-6 hours as needed for pain or fever. Do not exceed 8 tablets in 24 hours.",
            "confidence": 0.92,
            "medicines": [{
                "name": "Paracetamol",
                "activeIngredients": ["Paracetamol 500mg"],
                "dosage": "Take 1-2 tablets every 4-6 hours",
                "usage": "As needed for pain or fever. Do not exceed 8 tablets in 24 hours.",
                "sideEffects": ["Nausea", "Stomach pain", "Liver damage if taken in excess"],
                "precautions": ["Do not exceed 4g per day", "Avoid alcohol"]
            }]
        }),
        ScanSource::Upload => json!({
            "rawText": "Amoxicillin 250mg capsules. Take one capsule three times daily for bacterial infection. Complete full course even if feeling better.",
            "confidence": 0.88,
            "medicines": [{
                "name": "Amoxicillin",
                "activeIngredients": ["Amoxicillin 250mg"],
                "dosage": "Take one capsule three times daily",
                "usage": "For bacterial infection. Complete full course even if feeling better.",
                "sideEffects": ["Diarrhea", "Nausea", "Skin rash"],
                "precautions": ["Complete full course", "Inform about penicillin allergy"]
            }]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::normalize_scan_result;

    fn image(source: ScanSource) -> ScanImage {
        ScanImage::new(source, vec![0xFF, 0xD8, 0xFF])
    }

    #[tokio::test]
    async fn canned_camera_scan_is_paracetamol() {
        let raw = MockOcr::canned().recognize(&image(ScanSource::Camera)).await.unwrap();
        let result = normalize_scan_result(&raw);
        assert_eq!(result.medicines[0].name, "Paracetamol");
        assert!(result.confidence > 0.9);
    }

    #[tokio::test]
    async fn canned_upload_scan_is_amoxicillin() {
        let raw = MockOcr::canned().recognize(&image(ScanSource::Upload)).await.unwrap();
        let result = normalize_scan_result(&raw);
        assert_eq!(result.medicines[0].name, "Amoxicillin");
        assert_eq!(result.medicines[0].side_effects.len(), 3);
    }

    #[tokio::test]
    async fn failing_mock_rejects_with_message() {
        let err = MockOcr::failing("Label unreadable")
            .recognize(&image(ScanSource::Camera))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Label unreadable");
    }

    #[tokio::test]
    async fn empty_image_is_rejected() {
        let err = MockOcr::canned()
            .recognize(&ScanImage::new(ScanSource::Upload, Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "No image data received");
    }

    #[test]
    fn blank_error_message_gets_fallback() {
        assert_eq!(OcrError::new("  ").message(), DEFAULT_OCR_FAILURE);
    }
}
