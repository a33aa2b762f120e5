use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

use crate::error::IngestError;

const SERVICE: &str = "expense_mail_ingest";

/// Env var consulted when the keyring has no app password.
pub const APP_PASSWORD_ENV: &str = "MAIL_APP_PASSWORD";

/// Mailbox login for one user: address plus an application password.
#[derive(Clone, Default)]
pub struct Credentials {
    pub address: Option<String>,
    pub app_password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("app_password", &self.app_password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    pub fn new(address: impl Into<String>, app_password: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            app_password: Some(app_password.into()),
        }
    }

    /// Address and password, or a configuration error naming what is missing.
    pub fn require(&self) -> Result<(&str, &str), IngestError> {
        let address = self
            .address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let password = self.app_password.as_deref().filter(|s| !s.is_empty());
        match (address, password) {
            (Some(a), Some(p)) => Ok((a, p)),
            (None, _) => Err(IngestError::Configuration(
                "mailbox address is not set (user_email in config)".into(),
            )),
            (Some(a), None) => Err(IngestError::Configuration(format!(
                "no app password stored for {a}; run set-app-password or set {APP_PASSWORD_ENV}"
            ))),
        }
    }

    /// Loads the app password for `address` from the OS keyring, falling
    /// back to the environment. A missing password is not an error here;
    /// [`Credentials::require`] reports it before any connection is made.
    pub fn load(address: Option<String>) -> Self {
        let from_keyring = address.as_deref().and_then(|a| match load_app_password(a) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("keyring unavailable ({e}); trying {APP_PASSWORD_ENV}");
                None
            }
        });
        let app_password = from_keyring.or_else(|| std::env::var(APP_PASSWORD_ENV).ok());
        Self {
            address,
            app_password,
        }
    }
}

/// Save an app password into the OS keyring for the given mailbox address
pub fn save_app_password(address: &str, app_password: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, address);
    entry?
        .set_password(app_password)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load the app password from the keyring for the given mailbox address
pub fn load_app_password(address: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, address);
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}
