//! Wire codec for fall notifications pushed by the peripheral.
//!
//! Pure functions operating on raw `&[u8]` payloads, with no BLE dependency.
//! The peripheral sends a short UTF-8 text message:
//!
//! ```text
//! FALL:<type>:<severity>
//! ```
//!
//! e.g. `FALL:hard:2.3g`. The type token becomes the label `"Hard Fall"`;
//! the severity token is kept verbatim (after trimming).

use crate::error::ParseError;
use crate::fall_event::FallEvent;
use crate::time::Timestamp;

/// Literal prefix of every fall message.
pub const PREFIX: &str = "FALL:";

/// Suffix appended to the capitalized type token.
const LABEL_SUFFIX: &str = " Fall";

/// A decoded fall message, before it is stamped with a detection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallReport {
    /// Classification label, e.g. `"Hard Fall"`.
    pub fall_type: String,
    /// Severity token as sent by the peripheral.
    pub impact_severity: String,
}

impl FallReport {
    /// Stamp the report with the local date and time of `detected_at`.
    #[must_use]
    pub fn into_event(self, detected_at: &Timestamp) -> FallEvent {
        FallEvent::detected(self.fall_type, self.impact_severity, detected_at)
    }
}

/// Decode a raw notification payload into a [`FallReport`].
///
/// # Errors
///
/// - [`ParseError::InvalidUtf8`] when the payload is not UTF-8
/// - [`ParseError::MissingPrefix`] when it does not start with `FALL:`
/// - [`ParseError::MalformedFields`] when it does not carry exactly two
///   colon-separated fields
/// - [`ParseError::EmptyField`] when a field is blank
pub fn decode(raw: &[u8]) -> Result<FallReport, ParseError> {
    let message = std::str::from_utf8(raw).map_err(|_| ParseError::InvalidUtf8)?;
    let body = message
        .strip_prefix(PREFIX)
        .ok_or(ParseError::MissingPrefix)?;

    let fields: Vec<&str> = body.split(':').collect();
    let [kind, severity] = fields.as_slice() else {
        return Err(ParseError::MalformedFields {
            count: fields.len(),
        });
    };

    let kind = kind.trim();
    if kind.is_empty() {
        return Err(ParseError::EmptyField { field: "type" });
    }
    let severity = severity.trim();
    if severity.is_empty() {
        return Err(ParseError::EmptyField { field: "severity" });
    }

    Ok(FallReport {
        fall_type: format!("{}{LABEL_SUFFIX}", capitalize(kind)),
        impact_severity: severity.to_string(),
    })
}

/// Decode a raw payload and stamp it with `detected_at`.
///
/// # Errors
///
/// See [`decode`].
pub fn parse(raw: &[u8], detected_at: &Timestamp) -> Result<FallEvent, ParseError> {
    decode(raw).map(|report| report.into_event(detected_at))
}

/// Upper-case the first character, leaving the rest untouched.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    #[test]
    fn should_decode_hard_fall() {
        let report = decode(b"FALL:hard:2.3g").unwrap();
        assert_eq!(report.fall_type, "Hard Fall");
        assert_eq!(report.impact_severity, "2.3g");
    }

    #[test]
    fn should_trim_fields() {
        let report = decode(b"FALL: soft : 0.8 ").unwrap();
        assert_eq!(report.fall_type, "Soft Fall");
        assert_eq!(report.impact_severity, "0.8");
    }

    #[test]
    fn should_keep_rest_of_type_token_as_is() {
        let report = decode(b"FALL:sIDEways:1").unwrap();
        assert_eq!(report.fall_type, "SIDEways Fall");
    }

    #[test]
    fn should_keep_non_numeric_severity_verbatim() {
        let report = decode(b"FALL:hard:very high").unwrap();
        assert_eq!(report.impact_severity, "very high");
    }

    #[test]
    fn should_capitalize_non_ascii_first_character() {
        let report = decode("FALL:ébranlé:3".as_bytes()).unwrap();
        assert_eq!(report.fall_type, "Ébranlé Fall");
    }

    #[test]
    fn should_reject_missing_prefix() {
        assert_eq!(decode(b"hard:2.3g"), Err(ParseError::MissingPrefix));
        assert_eq!(decode(b"fall:hard:2.3g"), Err(ParseError::MissingPrefix));
        assert_eq!(decode(b""), Err(ParseError::MissingPrefix));
    }

    #[test]
    fn should_reject_single_field() {
        assert_eq!(
            decode(b"FALL:soft"),
            Err(ParseError::MalformedFields { count: 1 })
        );
    }

    #[test]
    fn should_reject_three_fields() {
        assert_eq!(
            decode(b"FALL:hard:2.3g:extra"),
            Err(ParseError::MalformedFields { count: 3 })
        );
    }

    #[test]
    fn should_reject_empty_type_token() {
        assert_eq!(
            decode(b"FALL: :2.3g"),
            Err(ParseError::EmptyField { field: "type" })
        );
    }

    #[test]
    fn should_reject_empty_severity_token() {
        assert_eq!(
            decode(b"FALL:hard:"),
            Err(ParseError::EmptyField { field: "severity" })
        );
    }

    #[test]
    fn should_reject_invalid_utf8() {
        assert_eq!(decode(&[0x46, 0xff, 0xfe]), Err(ParseError::InvalidUtf8));
    }

    #[test]
    fn should_stamp_parsed_event_with_receiver_clock() {
        let at = Local.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap();
        let event = parse(b"FALL:hard:2.3g", &at).unwrap();
        assert_eq!(event.fall_type(), "Hard Fall");
        assert_eq!(event.impact_severity(), "2.3g");
        assert_eq!(event.date(), "2024-12-31");
        assert_eq!(event.time(), "11:59 PM");
    }
}
