pub mod fallback_id;
pub mod rules;

use chrono::{DateTime, FixedOffset, Utc};

use crate::domain::transaction::CandidateTransaction;
use rules::{Field, RULES};

/// Result of running the rule table over one body.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The printed transaction id is already stored; nothing else was read.
    Duplicate(String),
    Candidate(CandidateTransaction),
}

/// Applies the rule table to decoded notification text.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    provider_tz: FixedOffset,
}

impl FieldExtractor {
    pub fn new(provider_tz: FixedOffset) -> Self {
        Self { provider_tz }
    }

    /// Current time in the provider zone; the default for `occurred_at`.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.provider_tz)
    }

    /// Runs every rule in table order.
    ///
    /// `is_known` is consulted as soon as a transaction id has been read;
    /// when it answers `true` extraction stops with [`Extraction::Duplicate`].
    /// Errors from `is_known` are passed through untouched.
    pub fn extract<E, F>(&self, text: &str, mut is_known: F) -> Result<Extraction, E>
    where
        F: FnMut(&str) -> Result<bool, E>,
    {
        let mut candidate = CandidateTransaction::default();

        for (rule, re) in RULES.iter().zip(rules::compiled()) {
            let Some(caps) = re.captures(text) else {
                continue;
            };
            let Some(value) = caps.get(1) else {
                continue;
            };
            if !rule.apply(&mut candidate, value.as_str(), &self.provider_tz) {
                log::debug!("rule '{}' matched but value {:?} did not parse", rule.label, value.as_str());
                continue;
            }

            if rule.field == Field::TransactionId
                && let Some(id) = candidate.transaction_id.as_deref()
                && is_known(id)?
            {
                return Ok(Extraction::Duplicate(id.to_string()));
            }
        }

        Ok(Extraction::Candidate(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::convert::Infallible;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(FixedOffset::east_opt(5 * 3600).unwrap())
    }

    fn never_known(_: &str) -> Result<bool, Infallible> {
        Ok(false)
    }

    fn candidate(text: &str) -> CandidateTransaction {
        match extractor().extract(text, never_known).unwrap() {
            Extraction::Candidate(c) => c,
            other => panic!("unexpected {other:?}"),
        }
    }

    const FULL_BODY: &str = "\
Dear Customer,
Transaction ID 123456
Transaction Type Money Transfer
Date & Time 05-Jan-2025 14:03:11
Account Title ZAINAB BIBI
Sender Name ALI KHAN
Transfer amount Rs. 1,000.00
Fee Rs. 10.00
Total Rs. 1,010.00
";

    #[test]
    fn reads_every_field_of_a_full_notification() {
        let c = candidate(FULL_BODY);
        let tz = FixedOffset::east_opt(5 * 3600).unwrap();
        assert_eq!(
            c,
            CandidateTransaction {
                transaction_id: Some("123456".into()),
                transaction_type: Some("Money Transfer".into()),
                sender_name: Some("ALI KHAN".into()),
                receiver_name: Some("ZAINAB BIBI".into()),
                amount: Some(Decimal::new(100000, 2)),
                fee: Some(Decimal::new(1000, 2)),
                total: Some(Decimal::new(101000, 2)),
                occurred_at: Some(tz.with_ymd_and_hms(2025, 1, 5, 14, 3, 11).unwrap()),
            }
        );
    }

    #[test]
    fn id_and_amount_without_total() {
        let c = candidate("Transaction ID 123456\nTransfer amount Rs. 1,000.00\n");
        assert_eq!(c.transaction_id.as_deref(), Some("123456"));
        assert_eq!(c.amount, Some(Decimal::new(100000, 2)));
        assert_eq!(c.total, None);
        assert_eq!(c.fee, None);
    }

    #[test]
    fn labels_and_values_on_separate_lines_still_match() {
        let c = candidate("Transaction Type\nMoney Transfer\nTransfer amount Rs.\n2,500.00");
        assert_eq!(c.transaction_type.as_deref(), Some("Money Transfer"));
        assert_eq!(c.amount, Some(Decimal::new(250000, 2)));
    }

    #[test]
    fn unparsable_timestamp_leaves_field_unset() {
        let c = candidate("Date & Time 99-Foo-2025 25:61:00\nTransfer amount Rs 5");
        assert_eq!(c.occurred_at, None);
        assert_eq!(c.amount, Some(Decimal::new(5, 0)));
    }

    #[test]
    fn body_without_amount_has_no_amount() {
        let c = candidate("Transaction ID 555\nYour balance is low.");
        assert_eq!(c.amount, None);
    }

    #[test]
    fn known_id_stops_extraction_early() {
        let mut asked = Vec::new();
        let out = extractor()
            .extract(FULL_BODY, |id| {
                asked.push(id.to_string());
                Ok::<_, Infallible>(true)
            })
            .unwrap();
        assert_eq!(out, Extraction::Duplicate("123456".into()));
        assert_eq!(asked, vec!["123456".to_string()]);
    }

    #[test]
    fn dedupe_check_is_skipped_without_an_id() {
        let out = extractor()
            .extract("Transfer amount Rs. 10", |_| -> Result<bool, Infallible> {
                panic!("no id, no lookup")
            })
            .unwrap();
        assert!(matches!(out, Extraction::Candidate(_)));
    }

    #[test]
    fn lookup_errors_propagate() {
        let out = extractor().extract(FULL_BODY, |_| Err("db down"));
        assert_eq!(out, Err("db down"));
    }

    #[test]
    fn empty_body_yields_empty_candidate() {
        assert_eq!(candidate(""), CandidateTransaction::default());
    }
}
