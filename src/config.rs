use anyhow::{Result, anyhow};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::extract::fallback_id::FallbackIdKind;

const APP_DIR: &str = "expense_mail_ingest";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub imap_server: String,
    pub imap_port: u16,
    pub mailbox: String,
    /// Address the bank sends its transaction notifications from.
    pub sender_address: String,
    pub user_email: Option<String>,
    pub db_path: Option<String>,
    /// Zone the notification timestamps are written in, as `+HH:MM`.
    #[serde(with = "utc_offset")]
    pub provider_utc_offset: FixedOffset,
    pub connect_timeout_secs: u64,
    pub io_timeout_secs: u64,
    pub run_timeout_secs: Option<u64>,
    pub fallback_id: FallbackIdKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            imap_server: "imap.gmail.com".to_string(),
            imap_port: 993,
            mailbox: "INBOX".to_string(),
            sender_address: "e.statement@telenorbank.pk".to_string(),
            user_email: None,
            db_path: None,
            provider_utc_offset: FixedOffset::east_opt(5 * 3600).unwrap_or(Utc.fix()),
            connect_timeout_secs: 30,
            io_timeout_secs: 60,
            run_timeout_secs: None,
            fallback_id: FallbackIdKind::Uid,
        }
    }
}

impl Config {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_db_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("transactions.db");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            user_email: Some("you@example.com".to_string()),
            ..Config::default()
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(&path, tom)?;
        return Err(anyhow!(
            "Created template config at {}; edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

/// Parses and validates a config document.
pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s)?;
    if cfg.sender_address.trim().is_empty() {
        return Err(anyhow!("sender_address must not be empty"));
    }
    if cfg.connect_timeout_secs == 0 || cfg.io_timeout_secs == 0 {
        return Err(anyhow!("connect_timeout_secs and io_timeout_secs must be at least 1"));
    }
    if cfg.run_timeout_secs == Some(0) {
        return Err(anyhow!("run_timeout_secs must be at least 1 when set"));
    }
    Ok(cfg)
}

pub fn resolve_db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        Ok(PathBuf::from(p))
    } else {
        default_db_path()
    }
}

/// `+05:00`, `-03:30`, `+0530` or `Z`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") {
        return Ok(Utc.fix());
    }
    s.parse::<FixedOffset>()
        .map_err(|e| anyhow!("invalid UTC offset '{s}', expected +HH:MM: {e}"))
}

mod utc_offset {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(offset)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<FixedOffset, D::Error> {
        let raw = String::deserialize(de)?;
        super::parse_utc_offset(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn offsets() {
        assert_eq!(parse_utc_offset("+05:00").unwrap().local_minus_utc(), 5 * 3600);
        assert_eq!(parse_utc_offset("-0330").unwrap().local_minus_utc(), -(3 * 3600 + 1800));
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("05:00").is_err());
        assert!(parse_utc_offset("+5").is_err());
        assert!(parse_utc_offset("+05:75").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse_config("user_email = \"me@example.com\"\n").unwrap();
        assert_eq!(cfg.imap_server, "imap.gmail.com");
        assert_eq!(cfg.imap_port, 993);
        assert_eq!(cfg.mailbox, "INBOX");
        assert_eq!(cfg.user_email.as_deref(), Some("me@example.com"));
        assert_eq!(cfg.provider_utc_offset.local_minus_utc(), 5 * 3600);
        assert_eq!(cfg.fallback_id, FallbackIdKind::Uid);
        assert_eq!(cfg.run_timeout(), None);
        assert_eq!(cfg.io_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_bad_offset_and_empty_sender() {
        assert!(parse_config("provider_utc_offset = \"PKT\"").is_err());
        assert!(parse_config("sender_address = \" \"").is_err());
    }

    #[test]
    fn offset_field_is_parsed_on_load() {
        let cfg = parse_config("provider_utc_offset = \"-03:30\"").unwrap();
        assert_eq!(cfg.provider_utc_offset.local_minus_utc(), -(3 * 3600 + 1800));
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("provider_utc_offset = \"-03:30\""));
    }

    #[test]
    fn rejects_zero_timeouts() {
        assert!(parse_config("connect_timeout_secs = 0").is_err());
        assert!(parse_config("io_timeout_secs = 0").is_err());
        assert!(parse_config("run_timeout_secs = 0").is_err());
        assert!(parse_config("run_timeout_secs = 5").is_ok());
    }

    #[test]
    fn template_round_trips() {
        let sample = Config {
            user_email: Some("you@example.com".into()),
            run_timeout_secs: Some(120),
            fallback_id: FallbackIdKind::MessageId,
            ..Config::default()
        };
        let text = toml::to_string_pretty(&sample).unwrap();
        let back = parse_config(&text).unwrap();
        assert_eq!(back.run_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(back.fallback_id, FallbackIdKind::MessageId);
        assert_eq!(back.user_email, sample.user_email);
    }
}
