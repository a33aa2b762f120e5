use mailparse::MailHeaderMap;

/// IMAP UID of a message in the selected mailbox.
pub type MessageId = u32;

/// A message exactly as fetched from the server. Lives for one run only.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: MessageId,
    pub bytes: Vec<u8>,
}

impl RawMessage {
    pub fn new(id: MessageId, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            bytes: bytes.into(),
        }
    }

    /// First value of a header, RFC 2047 decoded. Best effort: a header
    /// block that does not parse yields `None`.
    pub fn header(&self, name: &str) -> Option<String> {
        let (headers, _) = mailparse::parse_headers(&self.bytes).ok()?;
        headers
            .get_first_value(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Plain-text rendering of a message body. Line breaks are kept because
/// the extraction rules rely on them to separate label/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
}

impl DecodedBody {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_without_touching_the_body() {
        let raw = RawMessage::new(
            3,
            "Message-ID: <abc@bank.example>\r\nSubject: Funds Transfer\r\n\r\nbody",
        );
        assert_eq!(raw.header("Message-ID").as_deref(), Some("<abc@bank.example>"));
        assert_eq!(raw.header("subject").as_deref(), Some("Funds Transfer"));
        assert_eq!(raw.header("X-Missing"), None);
    }
}
