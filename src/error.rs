//! Error types for the ingestion pipeline and the record store.

use thiserror::Error;

use crate::domain::message::MessageId;

/// Errors surfaced by a mail session or an ingestion run.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Missing credentials, bad date range or an unusable config value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The mail server rejected the login.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network, TLS or protocol failure (timeouts included).
    #[error("connection error: {0}")]
    Connection(String),

    /// The mailbox search command failed.
    #[error("mailbox search failed: {0}")]
    Search(String),

    /// A single message could not be retrieved.
    #[error("failed to fetch message {id}: {reason}")]
    Fetch { id: MessageId, reason: String },

    /// The caller cancelled the run or its deadline passed.
    #[error("ingestion cancelled: {0}")]
    Cancelled(String),
}

impl IngestError {
    /// Fatal errors abort the whole run; the rest only skip one message.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IngestError::Fetch { .. })
    }
}

/// Errors from the transaction record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Insert rejected by the unique index on `transaction_id`.
    #[error("transaction {0} already stored")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored column could not be read back into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}
