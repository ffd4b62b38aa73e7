//! Flat backend rows and tolerant field accessors.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row returned by the backend for a domain table.
///
/// Accessors never fail: a missing, null or wrong-typed field reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style setter, mostly useful in tests and seeds.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Non-empty, trimmed string value.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.get(field)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    /// Categorical value rendered as text. Numbers and booleans count as categories too.
    pub fn get_category(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(_) => self.get_str(field).map(str::to_string),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric value from a JSON number or a numeric string. Non-finite values are absent.
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        let value = match self.get(field)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Numeric value with null/missing treated as zero.
    pub fn amount(&self, field: &str) -> f64 {
        self.get_f64(field).unwrap_or(0.0)
    }

    pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        parse_timestamp(self.get_str(field)?)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get_timestamp("created_at")
    }

    pub fn status(&self) -> Option<&str> {
        self.get_str("status")
    }

    pub fn id(&self) -> Option<String> {
        self.get_category("id")
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }
}

/// Parse the timestamp shapes the backend emits.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]` and
/// bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn missing_and_null_fields_read_as_absent() {
        let record = Record::from(json!({"status": null, "fee_amount": "n/a"}));
        assert_eq!(record.status(), None);
        assert_eq!(record.get_f64("fee_amount"), None);
        assert_eq!(record.amount("fee_amount"), 0.0);
        assert_eq!(record.amount("missing"), 0.0);
    }

    #[test]
    fn blank_strings_are_not_categories() {
        let record = Record::from(json!({"province": "   ", "district": 7}));
        assert_eq!(record.get_category("province"), None);
        assert_eq!(record.get_category("district").as_deref(), Some("7"));
    }

    #[test]
    fn numeric_strings_parse() {
        let record = Record::new().with("amount", "1250.50");
        assert_eq!(record.get_f64("amount"), Some(1250.5));
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-04T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04T20:30:00+10:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04T10:30:00.000"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-03-04"),
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn non_object_values_become_empty_records() {
        assert_eq!(Record::from(json!([1, 2])), Record::new());
    }
}
