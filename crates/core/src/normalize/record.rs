use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::errors::DomainError;

/// Sale-line shape as exported by the point-of-sale system.
#[derive(Debug, Clone, Deserialize)]
struct RawSaleRecord {
    check: i64,
    date: RawDate,
    empl: String,
    group: String,
    good: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawDate {
    Millis(i64),
    Text(String),
}

/// A validated sale line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRecord {
    pub check: i64,
    pub date: DateTime<Utc>,
    pub employee: String,
    pub group: String,
    pub good: String,
}

const NAIVE_DATETIME_FORMATS: &[&str] =
    &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

impl SaleRecord {
    pub fn new(
        check: i64,
        date: DateTime<Utc>,
        employee: impl Into<String>,
        group: impl Into<String>,
        good: impl Into<String>,
    ) -> Self {
        Self { check, date, employee: employee.into(), group: group.into(), good: good.into() }
    }

    /// Validates one element of the raw export. `index` is its position in the export.
    pub fn from_value(index: usize, value: serde_json::Value) -> Result<Self, DomainError> {
        let malformed = |reason: String| DomainError::MalformedRecord { index, reason };

        let raw: RawSaleRecord =
            serde_json::from_value(value).map_err(|error| malformed(error.to_string()))?;

        let date = match &raw.date {
            RawDate::Millis(millis) => DateTime::<Utc>::from_timestamp_millis(*millis),
            RawDate::Text(text) => parse_timestamp(text),
        }
        .ok_or_else(|| malformed(format!("unparseable timestamp `{}`", raw.date.describe())))?;

        for (field, value) in [("empl", &raw.empl), ("group", &raw.group), ("good", &raw.good)] {
            if value.trim().is_empty() {
                return Err(malformed(format!("field `{field}` is empty")));
            }
        }

        Ok(Self { check: raw.check, date, employee: raw.empl, group: raw.group, good: raw.good })
    }
}

impl RawDate {
    fn describe(&self) -> String {
        match self {
            Self::Millis(millis) => millis.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{parse_timestamp, SaleRecord};
    use crate::errors::DomainError;

    #[test]
    fn accepts_common_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 1, 10, 15, 0).single();

        assert_eq!(parse_timestamp("2021-03-01T10:15:00Z"), expected);
        assert_eq!(parse_timestamp("2021-03-01T13:15:00+03:00"), expected);
        assert_eq!(parse_timestamp("2021-03-01 10:15:00"), expected);
        assert_eq!(parse_timestamp("2021-03-01T10:15:00.000"), expected);
        assert_eq!(
            parse_timestamp("2021-03-01"),
            Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).single()
        );
        assert_eq!(parse_timestamp("01/03/2021"), None);
    }

    #[test]
    fn validates_a_well_formed_record() {
        let record = SaleRecord::from_value(
            0,
            json!({
                "check": 17,
                "date": "2021-03-01 10:15:00",
                "empl": "Ivanova",
                "group": "Dairy",
                "good": "Milk 1L",
                "price": 89.9
            }),
        )
        .expect("record should validate");

        assert_eq!(record.check, 17);
        assert_eq!(record.employee, "Ivanova");
        assert_eq!(record.good, "Milk 1L");
    }

    #[test]
    fn epoch_millis_dates_are_accepted() {
        let record = SaleRecord::from_value(
            0,
            json!({ "check": 1, "date": 1_614_593_700_000_i64, "empl": "A", "group": "G", "good": "X" }),
        )
        .expect("record should validate");

        assert_eq!(Some(record.date), Utc.with_ymd_and_hms(2021, 3, 1, 10, 15, 0).single());
    }

    #[test]
    fn malformed_timestamp_is_rejected_with_index() {
        let error = SaleRecord::from_value(
            4,
            json!({ "check": 1, "date": "yesterday", "empl": "A", "group": "G", "good": "X" }),
        )
        .expect_err("timestamp should be rejected");

        assert!(matches!(
            error,
            DomainError::MalformedRecord { index: 4, ref reason } if reason.contains("yesterday")
        ));
    }

    #[test]
    fn missing_and_empty_fields_are_rejected() {
        let missing =
            SaleRecord::from_value(0, json!({ "check": 1, "date": "2021-03-01", "empl": "A" }));
        let empty = SaleRecord::from_value(
            1,
            json!({ "check": 1, "date": "2021-03-01", "empl": " ", "group": "G", "good": "X" }),
        );
        let wrong_type = SaleRecord::from_value(
            2,
            json!({ "check": "17", "date": "2021-03-01", "empl": "A", "group": "G", "good": "X" }),
        );

        assert!(matches!(missing, Err(DomainError::MalformedRecord { index: 0, .. })));
        assert!(matches!(
            empty,
            Err(DomainError::MalformedRecord { index: 1, ref reason }) if reason.contains("empl")
        ));
        assert!(matches!(wrong_type, Err(DomainError::MalformedRecord { index: 2, .. })));
    }
}
