//! One ingestion run: search the mailbox, then for every match, oldest
//! first, decode → extract (with the duplicate check) → validate → persist.
//!
//! Errors that abort the run (login, connection, search, cancellation) are
//! returned as a single [`IngestError`]. Everything that goes wrong with one
//! message only becomes a [`MessageOutcome`] in the [`RunReport`]. The mail
//! session is closed exactly once on every path out of [`Ingestor::run`].

pub mod cancel;
pub mod dedupe;
pub mod report;
pub mod sink;

use std::time::{Duration, Instant};

use crate::auth::credentials::Credentials;
use crate::domain::date_range::DateRange;
use crate::domain::message::{MessageId, RawMessage};
use crate::error::IngestError;
use crate::extract::fallback_id::{FallbackIdStrategy, MailboxUid};
use crate::extract::{Extraction, FieldExtractor};
use crate::mail::decoders::{decode_message, normalize_snippet};
use crate::mail::source::{MailSession, MailSource, SearchCriteria, SessionGuard};
use crate::store::repo::TransactionStore;

use cancel::CancelToken;
use dedupe::Deduplicator;
use report::{FailureReason, MessageOutcome, OutcomeStatus, RunReport, SkipReason};
use sink::TransactionSink;

pub struct Ingestor<'a, M: MailSource, S: TransactionStore + ?Sized> {
    source: &'a M,
    store: &'a S,
    extractor: FieldExtractor,
    sender: String,
    fallback: Box<dyn FallbackIdStrategy>,
    cancel: CancelToken,
    run_timeout: Option<Duration>,
}

impl<'a, M: MailSource, S: TransactionStore + ?Sized> Ingestor<'a, M, S> {
    /// `sender` is the notification address the mailbox search filters on.
    pub fn new(
        source: &'a M,
        store: &'a S,
        extractor: FieldExtractor,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            extractor,
            sender: sender.into(),
            fallback: Box::new(MailboxUid),
            cancel: CancelToken::new(),
            run_timeout: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn FallbackIdStrategy>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Overall deadline for a run, checked between messages.
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Runs one ingestion for the mailbox in `credentials`. Records are
    /// owned by the mailbox address.
    pub fn run(&self, credentials: &Credentials, range: &DateRange) -> Result<RunReport, IngestError> {
        let (owner, _) = credentials.require()?;
        let started = Instant::now();

        let session = self.source.connect(credentials)?;
        let mut guard = SessionGuard::new(session);
        let res = self.iterate(guard.session(), owner, range, started);
        guard.close();

        match &res {
            Ok(report) => log::info!(
                "Ingestion for {owner}: {} matched, {} imported, {} skipped, {} failed",
                report.matched,
                report.imported_count(),
                report.skipped_count(),
                report.failed_count()
            ),
            Err(e) => log::error!("Ingestion for {owner} aborted: {e}"),
        }
        res
    }

    fn iterate(
        &self,
        session: &mut M::Session,
        owner: &str,
        range: &DateRange,
        started: Instant,
    ) -> Result<RunReport, IngestError> {
        let criteria = SearchCriteria::new(self.sender.as_str(), *range);
        let mut ids = session.search(&criteria)?;

        let mut report = RunReport {
            matched: ids.len(),
            outcomes: Vec::with_capacity(ids.len()),
        };
        if ids.is_empty() {
            log::info!("No messages from {} matched", self.sender);
            return Ok(report);
        }

        // search answers newest first
        ids.reverse();

        let dedupe = Deduplicator::new(self.store);
        let sink = TransactionSink::new(self.store, owner);

        for id in ids {
            self.check_cancelled(started)?;

            let status = match session.fetch(id) {
                Ok(raw) => self.process(&raw, &dedupe, &sink),
                Err(e) if !e.is_fatal() => {
                    log::warn!("{e}");
                    OutcomeStatus::Failed {
                        reason: FailureReason::Fetch(e.to_string()),
                    }
                }
                Err(e) => return Err(e),
            };
            report.outcomes.push(MessageOutcome {
                message_id: id,
                status,
            });
        }

        Ok(report)
    }

    fn check_cancelled(&self, started: Instant) -> Result<(), IngestError> {
        if self.cancel.is_cancelled() {
            return Err(IngestError::Cancelled("cancelled by caller".into()));
        }
        if let Some(limit) = self.run_timeout
            && started.elapsed() > limit
        {
            return Err(IngestError::Cancelled(format!(
                "run exceeded {}s deadline",
                limit.as_secs()
            )));
        }
        Ok(())
    }

    fn process(
        &self,
        raw: &RawMessage,
        dedupe: &Deduplicator<'_, S>,
        sink: &TransactionSink<'_, S>,
    ) -> OutcomeStatus {
        let body = decode_message(raw);
        if body.is_empty() {
            log::debug!("UID {}: decoded body is empty", raw.id);
        }

        let candidate = match self.extractor.extract(&body.text, |id| dedupe.exists(id)) {
            Ok(Extraction::Candidate(c)) => c,
            Ok(Extraction::Duplicate(tx_id)) => {
                log::debug!("UID {}: transaction {tx_id} already stored", raw.id);
                return skipped(SkipReason::Duplicate(tx_id));
            }
            Err(e) => return failed(raw.id, FailureReason::Dedupe(e.to_string())),
        };

        let printed_id = candidate.transaction_id.is_some();
        let Some(tx) = candidate.finalize(|| self.fallback.fallback_id(raw), self.extractor.now()) else {
            log::debug!(
                "UID {}: no transfer amount in \"{}\"",
                raw.id,
                normalize_snippet(&body.text, 80)
            );
            return skipped(SkipReason::NoAmount);
        };

        // synthetic ids get the same duplicate check a printed id got above
        if !printed_id {
            match dedupe.exists(&tx.transaction_id) {
                Ok(true) => return skipped(SkipReason::Duplicate(tx.transaction_id)),
                Ok(false) => {}
                Err(e) => return failed(raw.id, FailureReason::Dedupe(e.to_string())),
            }
        }

        match sink.persist(&tx, raw.id) {
            Ok(rec) => OutcomeStatus::Imported {
                record_id: rec.id,
                transaction_id: tx.transaction_id,
            },
            Err(e) => failed(raw.id, FailureReason::Persistence(e.to_string())),
        }
    }
}

fn skipped(reason: SkipReason) -> OutcomeStatus {
    OutcomeStatus::Skipped { reason }
}

fn failed(id: MessageId, reason: FailureReason) -> OutcomeStatus {
    log::warn!("UID {id}: {reason:?}");
    OutcomeStatus::Failed { reason }
}
