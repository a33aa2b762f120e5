use serde::Serialize;

use crate::domain::message::MessageId;
use crate::domain::transaction::RecordId;
use crate::error::IngestError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The transaction id (printed or synthetic) is already stored.
    Duplicate(String),
    /// No non-zero transfer amount could be extracted.
    NoAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    Fetch(String),
    Dedupe(String),
    Persistence(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Imported {
        record_id: RecordId,
        transaction_id: String,
    },
    Skipped { reason: SkipReason },
    Failed { reason: FailureReason },
}

/// What happened to one message of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageOutcome {
    pub message_id: MessageId,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    NoMessages,
    NothingNew,
    Imported(usize),
}

/// Aggregate result of one ingestion run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Messages returned by the mailbox search.
    pub matched: usize,
    pub outcomes: Vec<MessageOutcome>,
}

impl RunReport {
    pub fn imported_ids(&self) -> Vec<RecordId> {
        self.outcomes
            .iter()
            .filter_map(|o| match o.status {
                OutcomeStatus::Imported { record_id, .. } => Some(record_id),
                _ => None,
            })
            .collect()
    }

    pub fn imported_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Imported { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn outcome_kind(&self) -> OutcomeKind {
        match (self.matched, self.imported_count()) {
            (0, _) => OutcomeKind::NoMessages,
            (_, 0) => OutcomeKind::NothingNew,
            (_, n) => OutcomeKind::Imported(n),
        }
    }
}

/// Payload handed back to whoever triggered the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Imported { message: String, ids: Vec<RecordId> },
    NothingNew { message: String, count: usize },
    NoMessages { message: String },
    Error { error: String },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

impl From<&RunReport> for Response {
    fn from(report: &RunReport) -> Self {
        match report.outcome_kind() {
            OutcomeKind::NoMessages => Response::NoMessages {
                message: "no messages found".into(),
            },
            OutcomeKind::NothingNew => Response::NothingNew {
                message: "no new valid transactions".into(),
                count: 0,
            },
            OutcomeKind::Imported(n) => Response::Imported {
                message: format!("{n} imported"),
                ids: report.imported_ids(),
            },
        }
    }
}

impl From<Result<RunReport, IngestError>> for Response {
    fn from(res: Result<RunReport, IngestError>) -> Self {
        match res {
            Ok(report) => Response::from(&report),
            Err(e) => Response::Error {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn imported(uid: MessageId, record_id: RecordId) -> MessageOutcome {
        MessageOutcome {
            message_id: uid,
            status: OutcomeStatus::Imported {
                record_id,
                transaction_id: format!("tx{uid}"),
            },
        }
    }

    fn skipped(uid: MessageId, reason: SkipReason) -> MessageOutcome {
        MessageOutcome {
            message_id: uid,
            status: OutcomeStatus::Skipped { reason },
        }
    }

    #[test]
    fn no_matches_is_distinct_from_nothing_new() {
        let empty = RunReport::default();
        assert_eq!(empty.outcome_kind(), OutcomeKind::NoMessages);
        assert_eq!(
            serde_json::to_value(Response::from(&empty)).unwrap(),
            json!({"message": "no messages found"})
        );

        let dupes = RunReport {
            matched: 1,
            outcomes: vec![skipped(1, SkipReason::Duplicate("55".into()))],
        };
        assert_eq!(dupes.outcome_kind(), OutcomeKind::NothingNew);
        assert_eq!(
            serde_json::to_value(Response::from(&dupes)).unwrap(),
            json!({"message": "no new valid transactions", "count": 0})
        );
    }

    #[test]
    fn imported_response_lists_record_ids() {
        let r = RunReport {
            matched: 3,
            outcomes: vec![
                imported(1, 10),
                skipped(2, SkipReason::NoAmount),
                imported(3, 11),
            ],
        };
        assert_eq!(r.imported_count(), 2);
        assert_eq!(r.skipped_count(), 1);
        assert_eq!(r.failed_count(), 0);
        assert_eq!(
            serde_json::to_value(Response::from(&r)).unwrap(),
            json!({"message": "2 imported", "ids": [10, 11]})
        );
    }

    #[test]
    fn errors_become_error_payloads() {
        let resp = Response::from(Err(IngestError::Authentication("bad creds".into())));
        assert!(resp.is_error());
        assert_eq!(
            serde_json::to_value(resp).unwrap(),
            json!({"error": "authentication failed: bad creds"})
        );
    }

    #[test]
    fn outcomes_serialize_flat() {
        let o = skipped(4, SkipReason::Duplicate("123".into()));
        assert_eq!(
            serde_json::to_value(&o).unwrap(),
            json!({"message_id": 4, "status": "skipped", "reason": {"kind": "duplicate", "detail": "123"}})
        );
        let f = MessageOutcome {
            message_id: 5,
            status: OutcomeStatus::Failed {
                reason: FailureReason::Persistence("conflict".into()),
            },
        };
        assert_eq!(
            serde_json::to_value(&f).unwrap(),
            json!({"message_id": 5, "status": "failed", "reason": {"stage": "persistence", "detail": "conflict"}})
        );
    }
}
