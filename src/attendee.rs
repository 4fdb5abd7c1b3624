//! The attendee record a badge is printed for.

use serde::{Deserialize, Serialize};

use crate::error::{BadgeError, BadgeResult};

fn default_ticket_type() -> String {
    "Delegate".to_string()
}

/// Immutable description of one attendee.
///
/// Missing text fields deserialise as empty strings; a missing ticket type
/// falls back to `"Delegate"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeRecord {
    pub ticket_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_ticket_type")]
    pub ticket_type: String,
}

impl AttendeeRecord {
    pub fn new(
        ticket_id: impl Into<String>,
        name: impl Into<String>,
        company: impl Into<String>,
        title: impl Into<String>,
        ticket_type: impl Into<String>,
    ) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            name: name.into(),
            company: company.into(),
            title: title.into(),
            ticket_type: ticket_type.into(),
        }
    }

    /// Parse the JSON request payload shape.
    pub fn from_json(json: &str) -> BadgeResult<Self> {
        serde_json::from_str(json).map_err(|e| BadgeError::InvalidPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_defaults() {
        let rec = AttendeeRecord::from_json(r#"{"ticket_id": "A1-0245", "name": "Fazli"}"#).unwrap();
        assert_eq!(rec.ticket_id, "A1-0245");
        assert_eq!(rec.name, "Fazli");
        assert_eq!(rec.company, "");
        assert_eq!(rec.title, "");
        assert_eq!(rec.ticket_type, "Delegate");
    }

    #[test]
    fn payload_requires_ticket_id() {
        let err = AttendeeRecord::from_json(r#"{"name": "Fazli"}"#).unwrap_err();
        assert!(matches!(err, BadgeError::InvalidPayload(_)), "{err}");
        assert!(err.to_string().contains("ticket_id"), "{err}");
    }
}
