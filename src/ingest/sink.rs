use crate::domain::message::MessageId;
use crate::domain::transaction::{NewTransaction, TransactionRecord};
use crate::error::StoreError;
use crate::store::repo::TransactionStore;

/// Writes validated transactions for one owner.
pub struct TransactionSink<'a, S: TransactionStore + ?Sized> {
    store: &'a S,
    owner: &'a str,
}

impl<'a, S: TransactionStore + ?Sized> TransactionSink<'a, S> {
    pub fn new(store: &'a S, owner: &'a str) -> Self {
        Self { store, owner }
    }

    /// Inserts one record. Errors are returned to the caller, which treats
    /// them as a failure of this message only.
    pub fn persist(
        &self,
        tx: &NewTransaction,
        source: MessageId,
    ) -> Result<TransactionRecord, StoreError> {
        let res = self.store.insert(self.owner, Some(source), tx);
        match &res {
            Ok(rec) => log::debug!(
                "UID {source}: stored transaction {} as record {}",
                tx.transaction_id,
                rec.id
            ),
            Err(e) => log::warn!("UID {source}: insert of {} rejected: {e}", tx.transaction_id),
        }
        res
    }
}
