//! Synthetic transaction ids for notifications that print none.
//!
//! These keys are only as stable as what they are derived from. A mailbox
//! UID stays fixed for one mailbox unless the server resets UIDVALIDITY; a
//! `Message-ID` header survives moves between mailboxes but is chosen by the
//! sending provider.

use serde::{Deserialize, Serialize};

use crate::domain::message::RawMessage;

pub trait FallbackIdStrategy {
    fn fallback_id(&self, raw: &RawMessage) -> String;
}

/// `mail-<uid>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailboxUid;

impl FallbackIdStrategy for MailboxUid {
    fn fallback_id(&self, raw: &RawMessage) -> String {
        format!("mail-{}", raw.id)
    }
}

/// `msgid-<Message-ID without angle brackets>`, or the UID form when the
/// header is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageIdHeader;

impl FallbackIdStrategy for MessageIdHeader {
    fn fallback_id(&self, raw: &RawMessage) -> String {
        raw.header("Message-ID")
            .map(|v| v.trim_matches(|c| c == '<' || c == '>').trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| format!("msgid-{v}"))
            .unwrap_or_else(|| MailboxUid.fallback_id(raw))
    }
}

/// Config-selectable strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackIdKind {
    #[default]
    Uid,
    MessageId,
}

impl FallbackIdKind {
    pub fn strategy(self) -> Box<dyn FallbackIdStrategy> {
        match self {
            FallbackIdKind::Uid => Box::new(MailboxUid),
            FallbackIdKind::MessageId => Box::new(MessageIdHeader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_strategy_uses_the_mailbox_uid() {
        let raw = RawMessage::new(812, b"Subject: x\r\n\r\n".to_vec());
        assert_eq!(MailboxUid.fallback_id(&raw), "mail-812");
    }

    #[test]
    fn message_id_strategy_strips_brackets() {
        let raw = RawMessage::new(1, b"Message-ID: <77.abc@bank.example>\r\n\r\nhi".to_vec());
        assert_eq!(MessageIdHeader.fallback_id(&raw), "msgid-77.abc@bank.example");
    }

    #[test]
    fn message_id_strategy_falls_back_to_uid() {
        let raw = RawMessage::new(5, b"Subject: none\r\n\r\nhi".to_vec());
        assert_eq!(MessageIdHeader.fallback_id(&raw), "mail-5");
    }

    #[test]
    fn kind_is_read_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrap {
            fallback_id: FallbackIdKind,
        }
        let w: Wrap = toml::from_str("fallback_id = \"message-id\"").unwrap();
        assert_eq!(w.fallback_id, FallbackIdKind::MessageId);
        assert_eq!(FallbackIdKind::default(), FallbackIdKind::Uid);
    }
}
