/// Confidence thresholds used by the scan result views
pub mod thresholds {
    /// Above this (strictly): detected medicines are shown as confirmed.
    pub const HIGH: f64 = 0.70;
}

/// Coerce an arbitrary number into `[0.0, 1.0]`. NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Whether a normalized confidence clears the given threshold.
pub fn is_high_confidence(confidence: f64, threshold: f64) -> bool {
    confidence > threshold
}

/// Whole-number percentage for read-outs ("Confidence: 92%").
pub fn confidence_percent(confidence: f64) -> u8 {
    (clamp_confidence(confidence) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        assert!(!is_high_confidence(0.70, thresholds::HIGH));
        assert!(is_high_confidence(0.7001, thresholds::HIGH));
        assert!(!is_high_confidence(0.35, thresholds::HIGH));
    }

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(clamp_confidence(-0.5), 0.0);
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(f64::INFINITY), 1.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(confidence_percent(0.92), 92);
        assert_eq!(confidence_percent(0.356), 36);
        assert_eq!(confidence_percent(0.0), 0);
        assert_eq!(confidence_percent(1.0), 100);
    }
}
