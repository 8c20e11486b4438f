//! Heterogeneous diagnostics payload decoding.
//!
//! Hardware gateways speak JSON; cheap ELM-style adapters emit free
//! text. Structured decoding is attempted first, then pattern
//! extraction; anything else is dropped without a snapshot or an
//! error.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

/// Numeric fields extracted from one payload.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PayloadFields {
    /// Vehicle speed in km/h.
    pub speed_kmh: Option<f64>,
    /// Engine speed in rev/min.
    pub rpm: Option<f64>,
}

impl PayloadFields {
    fn is_empty(&self) -> bool {
        self.speed_kmh.is_none() && self.rpm.is_none()
    }
}

/// Outcome of decoding one raw payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedPayload {
    /// Structured key/value decoding succeeded.
    Structured(PayloadFields),
    /// Fields recovered from free text (`speed:<num>` / `rpm:<num>`).
    PatternMatched(PayloadFields),
    /// Nothing usable. Silently dropped; malformed payloads are not
    /// errors.
    Unrecognized,
}

#[derive(Deserialize)]
struct StructuredPayload {
    speed: Option<f64>,
    rpm: Option<f64>,
}

fn speed_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)speed[:\s]+(-?\d+(?:\.\d+)?)").unwrap())
}

fn rpm_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)rpm[:\s]+(-?\d+(?:\.\d+)?)").unwrap())
}

/// Decode one raw payload. Negative numbers are treated as garbage
/// from the adapter and dropped field-wise.
pub fn parse_payload(raw: &str) -> ParsedPayload {
    if let Ok(parsed) = serde_json::from_str::<StructuredPayload>(raw) {
        let fields = PayloadFields {
            speed_kmh: parsed.speed.filter(|v| *v >= 0.0),
            rpm: parsed.rpm.filter(|v| *v >= 0.0),
        };
        if fields.is_empty() {
            return ParsedPayload::Unrecognized;
        }
        return ParsedPayload::Structured(fields);
    }

    let fields = PayloadFields {
        speed_kmh: capture_number(speed_pattern(), raw),
        rpm: capture_number(rpm_pattern(), raw),
    };
    if fields.is_empty() {
        ParsedPayload::Unrecognized
    } else {
        ParsedPayload::PatternMatched(fields)
    }
}

fn capture_number(pattern: &Regex, raw: &str) -> Option<f64> {
    pattern
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_structured_payload() {
        let parsed = parse_payload(r#"{"speed": 72.5, "rpm": 3100}"#);
        assert_eq!(
            parsed,
            ParsedPayload::Structured(PayloadFields {
                speed_kmh: Some(72.5),
                rpm: Some(3100.0),
            })
        );
    }

    #[test]
    fn test_structured_payload_partial_fields() {
        let parsed = parse_payload(r#"{"rpm": 900}"#);
        assert_eq!(
            parsed,
            ParsedPayload::Structured(PayloadFields {
                speed_kmh: None,
                rpm: Some(900.0),
            })
        );
    }

    #[test]
    fn test_pattern_extraction_from_free_text() {
        let parsed = parse_payload("speed:45.5 rpm:2200");
        assert_eq!(
            parsed,
            ParsedPayload::PatternMatched(PayloadFields {
                speed_kmh: Some(45.5),
                rpm: Some(2200.0),
            })
        );
    }

    #[test]
    fn test_pattern_extraction_is_case_insensitive() {
        let parsed = parse_payload("SPEED: 12 RPM: 850");
        assert_eq!(
            parsed,
            ParsedPayload::PatternMatched(PayloadFields {
                speed_kmh: Some(12.0),
                rpm: Some(850.0),
            })
        );
    }

    #[test]
    fn test_garbage_is_unrecognized() {
        assert_eq!(parse_payload("NO DATA"), ParsedPayload::Unrecognized);
        assert_eq!(parse_payload(""), ParsedPayload::Unrecognized);
    }

    #[test]
    fn test_json_without_telemetry_fields_is_unrecognized() {
        assert_eq!(
            parse_payload(r#"{"voltage": 13.8}"#),
            ParsedPayload::Unrecognized
        );
    }

    #[test]
    fn test_negative_values_dropped_fieldwise() {
        let parsed = parse_payload(r#"{"speed": -4.0, "rpm": 900}"#);
        assert_eq!(
            parsed,
            ParsedPayload::Structured(PayloadFields {
                speed_kmh: None,
                rpm: Some(900.0),
            })
        );
        assert_eq!(
            parse_payload("speed:-4.0"),
            ParsedPayload::Unrecognized
        );
    }
}
