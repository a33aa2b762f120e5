use chrono::{Days, NaiveDate};

use crate::error::IngestError;

/// Optional calendar bounds, both inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, IngestError> {
        if let (Some(f), Some(t)) = (from, to)
            && f > t
        {
            return Err(IngestError::Configuration(format!(
                "from date {f} is after to date {t}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Parses optional ISO dates (`YYYY-MM-DD`).
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, IngestError> {
        Self::new(parse_iso(from)?, parse_iso(to)?)
    }

    /// First day after the range, for exclusive upper bounds.
    pub fn day_after_end(&self) -> Option<NaiveDate> {
        self.to.and_then(|t| t.checked_add_days(Days::new(1)))
    }
}

fn parse_iso(raw: Option<&str>) -> Result<Option<NaiveDate>, IngestError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| IngestError::Configuration(format!("invalid date '{s}': {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_iso_bounds() {
        let r = DateRange::parse(Some("2025-01-01"), Some(" 2025-01-31 ")).unwrap();
        assert_eq!(r.from, Some(d(2025, 1, 1)));
        assert_eq!(r.to, Some(d(2025, 1, 31)));
        assert_eq!(r.day_after_end(), Some(d(2025, 2, 1)));
        assert_eq!(DateRange::parse(None, Some("")).unwrap(), DateRange::default());
    }

    #[test]
    fn rejects_inverted_or_malformed_ranges() {
        assert!(matches!(
            DateRange::parse(Some("2025-02-01"), Some("2025-01-01")),
            Err(IngestError::Configuration(_))
        ));
        assert!(matches!(
            DateRange::parse(Some("01/02/2025"), None),
            Err(IngestError::Configuration(_))
        ));
    }
}
