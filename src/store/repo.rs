use crate::domain::date_range::DateRange;
use crate::domain::message::MessageId;
use crate::domain::transaction::{NewTransaction, TransactionRecord};
use crate::error::StoreError;

/// Where imported transactions live. `transaction_id` must be unique and
/// the implementation must enforce that atomically on insert.
pub trait TransactionStore {
    fn exists(&self, transaction_id: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the id is already stored.
    fn insert(
        &self,
        owner: &str,
        source_message: Option<MessageId>,
        tx: &NewTransaction,
    ) -> Result<TransactionRecord, StoreError>;

    /// Records of one owner whose local transaction date falls in `range`,
    /// newest first.
    fn list(&self, owner: &str, range: &DateRange) -> Result<Vec<TransactionRecord>, StoreError>;
}
