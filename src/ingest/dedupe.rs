use crate::error::StoreError;
use crate::store::repo::TransactionStore;

/// Read-only "have we stored this id already" check.
///
/// This is an optimistic pre-check; two overlapping runs can both pass it.
/// The store's unique index is what actually prevents duplicates.
pub struct Deduplicator<'a, S: TransactionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TransactionStore + ?Sized> Deduplicator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn exists(&self, transaction_id: &str) -> Result<bool, StoreError> {
        self.store.exists(transaction_id)
    }
}
