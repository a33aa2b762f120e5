use crate::domain::date_range::DateRange;
use crate::domain::message::{MessageId, RawMessage};
use crate::auth::credentials::Credentials;
use crate::error::IngestError;

/// IMAP date token layout, e.g. `05-Jan-2025`.
const IMAP_DATE: &str = "%d-%b-%Y";

/// Sender filter plus optional date bounds.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub sender: String,
    pub range: DateRange,
}

impl SearchCriteria {
    pub fn new(sender: impl Into<String>, range: DateRange) -> Self {
        Self {
            sender: sender.into(),
            range,
        }
    }

    /// IMAP SEARCH string. The upper bound is sent as `BEFORE <to + 1 day>`
    /// so the whole "to" day is included.
    pub fn to_imap_query(&self) -> String {
        let sender = self.sender.replace('\\', "\\\\").replace('"', "\\\"");
        let mut q = format!("FROM \"{sender}\"");
        if let Some(from) = self.range.from {
            q.push_str(&format!(" SINCE {}", from.format(IMAP_DATE)));
        }
        if let Some(before) = self.range.day_after_end() {
            q.push_str(&format!(" BEFORE {}", before.format(IMAP_DATE)));
        }
        format!("({q})")
    }
}

/// Something that can open an authenticated, mailbox-selected session.
pub trait MailSource {
    type Session: MailSession;

    /// Fails with [`IngestError::Authentication`] on rejected credentials,
    /// [`IngestError::Connection`] on anything network related.
    fn connect(&self, credentials: &Credentials) -> Result<Self::Session, IngestError>;
}

/// One open mailbox session. Callers must call [`MailSession::close`]
/// exactly once; [`SessionGuard`] does that for them.
pub trait MailSession {
    /// Matching message ids, newest first.
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, IngestError>;

    /// A missing message is [`IngestError::Fetch`]; transport failures are
    /// [`IngestError::Connection`].
    fn fetch(&mut self, id: MessageId) -> Result<RawMessage, IngestError>;

    fn close(&mut self) -> Result<(), IngestError>;
}

/// Owns a session and closes it once, either through [`SessionGuard::close`]
/// or on drop.
pub struct SessionGuard<S: MailSession> {
    session: S,
    closed: bool,
}

impl<S: MailSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn close(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.session.close() {
            log::warn!("closing mail session failed: {e}");
        }
    }
}

impl<S: MailSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.close_once();
    }
}
