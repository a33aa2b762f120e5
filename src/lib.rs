//! Imports bank transfer notifications from a mailbox into a local
//! transaction store.
//!
//! The pipeline lives in [`ingest`]; [`mail`] talks IMAP and decodes MIME,
//! [`extract`] turns notification text into transactions and [`store`]
//! keeps them.

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod mail;
pub mod store;

pub use error::{IngestError, StoreError};
