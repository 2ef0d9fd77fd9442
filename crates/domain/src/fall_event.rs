//! Fall event — an immutable record of one detected fall.
//!
//! The peripheral only reports *what* happened (a type and an impact
//! severity); *when* it happened is stamped by the receiving side at the
//! moment the notification is decoded.

use serde::{Deserialize, Serialize};

use crate::time::{DATE_FORMAT, TIME_FORMAT, Timestamp};

/// A detected fall, as stored and relayed to caregivers.
///
/// Serialized with the camel-cased field names used by the backend
/// (`fallType`, `date`, `time`, `impactSeverity`). Missing fields
/// deserialize to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallEvent {
    fall_type: String,
    date: String,
    time: String,
    impact_severity: String,
}

impl FallEvent {
    /// Stamp a fall of the given type and severity with the local date and
    /// time of `detected_at`.
    #[must_use]
    pub fn detected(
        fall_type: impl Into<String>,
        impact_severity: impl Into<String>,
        detected_at: &Timestamp,
    ) -> Self {
        Self {
            fall_type: fall_type.into(),
            date: detected_at.format(DATE_FORMAT).to_string(),
            time: detected_at.format(TIME_FORMAT).to_string(),
            impact_severity: impact_severity.into(),
        }
    }

    /// Rebuild an event from its stored fields.
    #[must_use]
    pub fn from_parts(
        fall_type: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
        impact_severity: impl Into<String>,
    ) -> Self {
        Self {
            fall_type: fall_type.into(),
            date: date.into(),
            time: time.into(),
            impact_severity: impact_severity.into(),
        }
    }

    /// Classification label, e.g. `"Hard Fall"`.
    #[must_use]
    pub fn fall_type(&self) -> &str {
        &self.fall_type
    }

    /// Detection date, `YYYY-MM-DD`.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Detection time of day, 12-hour clock.
    #[must_use]
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Impact severity token exactly as the peripheral sent it.
    ///
    /// Opaque text: it is usually a g-force figure but is never validated
    /// as numeric.
    #[must_use]
    pub fn impact_severity(&self) -> &str {
        &self.impact_severity
    }

    /// Key used to recognise the same fall seen through two accounts.
    #[must_use]
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.date, &self.time, &self.impact_severity)
    }
}
