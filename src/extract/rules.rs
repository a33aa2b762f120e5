//! The label-anchored rules applied to a decoded notification body.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use regex::Regex;
use rust_decimal::Decimal;

use crate::domain::transaction::CandidateTransaction;

/// Timestamp layout used by the notification sender, e.g. `05-Jan-2025 14:03:11`.
pub const PROVIDER_DATETIME_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TransactionId,
    TransactionType,
    OccurredAt,
    ReceiverName,
    SenderName,
    Amount,
    Fee,
    Total,
}

/// One row of the rule table: `<label> <whitespace> <value>`, plus the
/// parser that stores the captured value on the candidate.
pub struct FieldRule {
    pub field: Field,
    pub label: &'static str,
    pub value: &'static str,
    apply: fn(&mut CandidateTransaction, &str, &FixedOffset) -> bool,
}

impl FieldRule {
    /// Source of the rule's regex; the first capture group is the value.
    pub fn pattern(&self) -> String {
        format!(r"{}\s+{}", regex::escape(self.label), self.value)
    }

    /// Stores `captured` on the candidate. Returns false when the capture
    /// could not be parsed, in which case the field stays unset.
    pub fn apply(&self, candidate: &mut CandidateTransaction, captured: &str, tz: &FixedOffset) -> bool {
        (self.apply)(candidate, captured, tz)
    }
}

const MONEY: &str = r"Rs\.?\s*([0-9,.]+)";

/// Evaluation order matters: the transaction id comes first so the
/// duplicate check can run before any other field is looked at.
pub static RULES: [FieldRule; 8] = [
    FieldRule {
        field: Field::TransactionId,
        label: "Transaction ID",
        value: r"(\d+)",
        apply: |c, v, _| set_text(&mut c.transaction_id, v),
    },
    FieldRule {
        field: Field::TransactionType,
        label: "Transaction Type",
        value: r"([A-Za-z ]+)",
        apply: |c, v, _| set_text(&mut c.transaction_type, v),
    },
    FieldRule {
        field: Field::OccurredAt,
        label: "Date & Time",
        value: r"([0-9]{2}-[A-Za-z]{3}-[0-9]{4}\s+[0-9:]+)",
        apply: |c, v, tz| {
            c.occurred_at = parse_provider_datetime(v, tz);
            c.occurred_at.is_some()
        },
    },
    FieldRule {
        field: Field::ReceiverName,
        label: "Account Title",
        value: r"(.+)",
        apply: |c, v, _| set_text(&mut c.receiver_name, v),
    },
    FieldRule {
        field: Field::SenderName,
        label: "Sender Name",
        value: r"(.+)",
        apply: |c, v, _| set_text(&mut c.sender_name, v),
    },
    FieldRule {
        field: Field::Amount,
        label: "Transfer amount",
        value: MONEY,
        apply: |c, v, _| {
            c.amount = parse_amount(v);
            c.amount.is_some()
        },
    },
    FieldRule {
        field: Field::Fee,
        label: "Fee",
        value: MONEY,
        apply: |c, v, _| {
            c.fee = parse_amount(v);
            c.fee.is_some()
        },
    },
    FieldRule {
        field: Field::Total,
        label: "Total",
        value: MONEY,
        apply: |c, v, _| {
            c.total = parse_amount(v);
            c.total.is_some()
        },
    },
];

/// Rule regexes in table order, compiled once.
pub fn compiled() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        RULES
            .iter()
            .map(|rule| Regex::new(&rule.pattern()).expect("invalid extraction rule"))
            .collect()
    })
}

fn set_text(slot: &mut Option<String>, captured: &str) -> bool {
    let v = captured.trim();
    if v.is_empty() {
        return false;
    }
    *slot = Some(v.to_string());
    true
}

/// `1,000.00` → `1000.00`. Trailing sentence dots are dropped; the result
/// is rounded to two decimal places.
pub fn parse_amount(captured: &str) -> Option<Decimal> {
    let cleaned = captured.trim().replace(',', "");
    let cleaned = cleaned.trim_end_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok().map(|d| d.round_dp(2))
}

/// Reads a provider timestamp as wall-clock time in the provider zone.
pub fn parse_provider_datetime(captured: &str, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let squeezed = captured.split_whitespace().collect::<Vec<_>>().join(" ");
    let naive = NaiveDateTime::parse_from_str(&squeezed, PROVIDER_DATETIME_FORMAT).ok()?;
    tz.from_local_datetime(&naive).single()
}
