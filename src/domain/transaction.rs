use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::message::MessageId;

/// Store-assigned primary key of a persisted transaction.
pub type RecordId = i64;

/// Fields pulled out of one notification. Every field is optional until
/// [`CandidateTransaction::finalize`] decides whether it can be stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateTransaction {
    pub transaction_id: Option<String>,
    pub transaction_type: Option<String>,
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
    pub amount: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub total: Option<Decimal>,
    pub occurred_at: Option<DateTime<FixedOffset>>,
}

/// A validated candidate with every default applied, ready for insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    pub transaction_id: String,
    pub transaction_type: String,
    pub sender_name: String,
    pub receiver_name: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub total: Decimal,
    pub occurred_at: DateTime<FixedOffset>,
}

/// A transaction as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub id: RecordId,
    pub owner: String,
    pub source_message: Option<MessageId>,
    #[serde(flatten)]
    pub transaction: NewTransaction,
}

const UNKNOWN: &str = "Unknown";

impl CandidateTransaction {
    /// Applies defaults and validates.
    ///
    /// Returns `None` when no non-zero amount was extracted. A zero total is
    /// treated like a missing one and replaced by the amount. `fallback_id`
    /// is only used when the body carried no transaction id, `now` only when
    /// it carried no usable timestamp.
    pub fn finalize(
        self,
        fallback_id: impl FnOnce() -> String,
        now: DateTime<FixedOffset>,
    ) -> Option<NewTransaction> {
        let amount = self.amount.filter(|a| !a.is_zero())?;
        let transaction_type = self.transaction_type.unwrap_or_else(|| UNKNOWN.to_string());
        let receiver_name = self
            .receiver_name
            .unwrap_or_else(|| transaction_type.clone());

        Some(NewTransaction {
            transaction_id: self.transaction_id.unwrap_or_else(fallback_id),
            sender_name: self.sender_name.unwrap_or_else(|| UNKNOWN.to_string()),
            receiver_name,
            transaction_type,
            amount,
            fee: self.fee.unwrap_or(Decimal::ZERO),
            total: self.total.filter(|t| !t.is_zero()).unwrap_or(amount),
            occurred_at: self.occurred_at.unwrap_or(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn karachi_noon() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
            .unwrap()
    }

    #[test]
    fn missing_amount_is_rejected() {
        let c = CandidateTransaction {
            transaction_id: Some("1".into()),
            total: Some(Decimal::new(500, 0)),
            ..Default::default()
        };
        assert!(c.finalize(|| "mail-1".into(), karachi_noon()).is_none());
    }

    #[test]
    fn zero_amount_is_rejected() {
        let c = CandidateTransaction {
            amount: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert!(c.finalize(|| "mail-1".into(), karachi_noon()).is_none());
    }

    #[test]
    fn zero_total_falls_back_to_amount() {
        let c = CandidateTransaction {
            amount: Some(Decimal::new(500, 0)),
            total: Some(Decimal::new(0, 2)),
            ..Default::default()
        };
        let tx = c.finalize(|| "mail-3".into(), karachi_noon()).unwrap();
        assert_eq!(tx.total, Decimal::new(500, 0));
    }

    #[test]
    fn defaults_are_applied() {
        let c = CandidateTransaction {
            amount: Some(Decimal::new(100000, 2)),
            ..Default::default()
        };
        let tx = c.finalize(|| "mail-42".into(), karachi_noon()).unwrap();
        assert_eq!(tx.transaction_id, "mail-42");
        assert_eq!(tx.total, Decimal::new(100000, 2));
        assert_eq!(tx.fee, Decimal::ZERO);
        assert_eq!(tx.transaction_type, "Unknown");
        assert_eq!(tx.sender_name, "Unknown");
        assert_eq!(tx.receiver_name, "Unknown");
        assert_eq!(tx.occurred_at, karachi_noon());
    }

    #[test]
    fn receiver_falls_back_to_transaction_type() {
        let c = CandidateTransaction {
            transaction_type: Some("Mobile Account".into()),
            amount: Some(Decimal::ONE),
            ..Default::default()
        };
        let tx = c.finalize(|| "mail-9".into(), karachi_noon()).unwrap();
        assert_eq!(tx.receiver_name, "Mobile Account");
        assert_eq!(tx.transaction_type, "Mobile Account");
    }

    #[test]
    fn printed_id_wins_over_fallback() {
        let c = CandidateTransaction {
            transaction_id: Some("998877".into()),
            transaction_type: Some("Mobile Account".into()),
            amount: Some(Decimal::ONE),
            fee: Some(Decimal::new(1000, 2)),
            total: Some(Decimal::new(1100, 2)),
            ..Default::default()
        };
        let tx = c
            .finalize(|| panic!("fallback id should not be needed"), karachi_noon())
            .unwrap();
        assert_eq!(tx.transaction_id, "998877");
        assert_eq!(tx.receiver_name, "Mobile Account");
        assert_eq!(tx.fee, Decimal::new(1000, 2));
        assert_eq!(tx.total, Decimal::new(1100, 2));
    }
}
