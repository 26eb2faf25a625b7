//! Relay protocol type definitions.

use serde::{Deserialize, Serialize};

/// One email record. Travels whole in EMAIL_SEND / INBOX_READ_OK frames and
/// is what the mailbox store persists, one JSON document per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub sender: String,
    pub destination: String,
    pub subject: String,
    pub date: String,
    pub body: String,
}

/// One INBOX_LIST_OK entry. `index` is 1-based and is what INBOX_READ takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSummary {
    pub index: u32,
    pub sender: String,
    pub subject: String,
    pub date: String,
}

/// Closed set of client requests, one variant per tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    InboxList,
    InboxRead { index: u32 },
    Send(Email),
    Stats,
    Bye { username: String },
}

/// Field caps enforced while decoding EMAIL_SEND and credential payloads.
#[derive(Debug, Clone, Copy)]
pub struct FieldCaps {
    pub max_name_bytes: usize,
    pub max_subject_bytes: usize,
    pub max_body_bytes: usize,
}

impl From<&crate::config::Limits> for FieldCaps {
    fn from(l: &crate::config::Limits) -> Self {
        Self {
            max_name_bytes: l.max_name_bytes,
            max_subject_bytes: l.max_subject_bytes,
            max_body_bytes: l.max_body_bytes,
        }
    }
}
