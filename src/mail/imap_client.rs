use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::TlsConnector;

use crate::auth::credentials::Credentials;
use crate::domain::message::{MessageId, RawMessage};
use crate::error::IngestError;
use crate::mail::source::{MailSession, MailSource, SearchCriteria};

type TlsSession = imap::Session<native_tls::TlsStream<TcpStream>>;

/// IMAP over implicit TLS with app-password `LOGIN`.
///
/// `connect_timeout` bounds each TCP connect attempt only. Name resolution
/// goes through the system resolver and is not covered by it.
#[derive(Debug, Clone)]
pub struct ImapSource {
    pub server: String,
    pub port: u16,
    pub mailbox: String,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl ImapSource {
    pub fn new(server: impl Into<String>, port: u16, mailbox: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port,
            mailbox: mailbox.into(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, io: Duration) -> Self {
        self.connect_timeout = connect;
        self.io_timeout = io;
        self
    }

    fn open_tcp(&self) -> Result<TcpStream, IngestError> {
        let addrs = (self.server.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| IngestError::Connection(format!("resolving {}: {e}", self.server)))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(tcp) => {
                    tcp.set_read_timeout(Some(self.io_timeout))
                        .and_then(|_| tcp.set_write_timeout(Some(self.io_timeout)))
                        .map_err(|e| IngestError::Connection(e.to_string()))?;
                    return Ok(tcp);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(IngestError::Connection(match last_err {
            Some(e) => format!("connecting to {}:{}: {e}", self.server, self.port),
            None => format!("{} resolved to no addresses", self.server),
        }))
    }
}

impl MailSource for ImapSource {
    type Session = ImapSession;

    fn connect(&self, credentials: &Credentials) -> Result<ImapSession, IngestError> {
        let (user, password) = credentials.require()?;
        log::info!("Connecting to {}:{}", self.server, self.port);

        let tcp = self.open_tcp()?;
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| IngestError::Connection(format!("TLS setup: {e}")))?;
        let stream = tls
            .connect(self.server.as_str(), tcp)
            .map_err(|e| IngestError::Connection(format!("TLS handshake with {}: {e}", self.server)))?;

        let mut client = imap::Client::new(stream);
        client.read_greeting().map_err(transport_error)?;

        let mut session = client.login(user, password).map_err(|(e, _client)| match e {
            imap::Error::No(m) | imap::Error::Bad(m) => IngestError::Authentication(m),
            other => transport_error(other),
        })?;

        if let Err(e) = session.select(&self.mailbox) {
            // not handed to a guard yet
            let _ = session.logout();
            return Err(IngestError::Connection(format!(
                "selecting mailbox {}: {e}",
                self.mailbox
            )));
        }

        log::debug!("Logged in as {user}, mailbox {} selected", self.mailbox);
        Ok(ImapSession { session })
    }
}

pub struct ImapSession {
    session: TlsSession,
}

impl MailSession for ImapSession {
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, IngestError> {
        let query = criteria.to_imap_query();
        log::debug!("UID SEARCH {query}");
        let mut uids: Vec<MessageId> = self
            .session
            .uid_search(&query)
            .map_err(|e| IngestError::Search(e.to_string()))?
            .into_iter()
            .collect();
        uids.sort_unstable_by(|a, b| b.cmp(a)); // newest first
        Ok(uids)
    }

    fn fetch(&mut self, id: MessageId) -> Result<RawMessage, IngestError> {
        if let Some(bytes) = self.fetch_body_once(id)? {
            return Ok(RawMessage::new(id, bytes));
        }

        // Some servers answer the first fetch without the body section.
        log::warn!("UID {id} missing body on first fetch; retrying once");
        match self.fetch_body_once(id)? {
            Some(bytes) => Ok(RawMessage::new(id, bytes)),
            None => Err(IngestError::Fetch {
                id,
                reason: "missing body even after retry".into(),
            }),
        }
    }

    fn close(&mut self) -> Result<(), IngestError> {
        let closed = self.session.close().map_err(transport_error);
        let logged_out = self.session.logout().map_err(transport_error);
        closed.and(logged_out)
    }
}

impl ImapSession {
    fn fetch_body_once(&mut self, id: MessageId) -> Result<Option<Vec<u8>>, IngestError> {
        let fetches = self
            .session
            .uid_fetch(id.to_string(), "(UID BODY.PEEK[])")
            .map_err(|e| match e {
                imap::Error::No(m) | imap::Error::Bad(m) => IngestError::Fetch { id, reason: m },
                other => transport_error(other),
            })?;
        let f = fetches.iter().next().ok_or_else(|| IngestError::Fetch {
            id,
            reason: "message not found".into(),
        })?;
        Ok(f.body().map(|b| b.to_vec()))
    }
}

fn transport_error(e: imap::Error) -> IngestError {
    IngestError::Connection(e.to_string())
}
