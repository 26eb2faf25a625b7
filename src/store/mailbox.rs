//! Mailbox store: delivery, listing, reads, stats, dead-lettering.
//!
//! One JSON file per email. Filenames are `{unix_nanos:020}-{seq:06}.json`,
//! zero-padded so a descending filename sort is newest-first without opening
//! any file; `seq` is a per-process counter breaking ties inside one
//! nanosecond tick.

use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::*;

use crate::common::addr::MailAddr;
use crate::common::error::MailboxError;
use crate::common::time::now_ts_nanos;
use crate::protocol::relay::{Email, MailSummary};

use super::accounts::{is_valid_username, CREDENTIAL_FILE};

/// Shared dead-letter directory under the data root. The `+` keeps it
/// disjoint from every valid account name.
pub const DEAD_LETTER_DIR: &str = "lost+found";

const EMAIL_EXT: &str = "json";

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Appended to the recipient's mailbox
    Delivered,
    /// Local domain but unknown recipient; stored in the dead-letter area
    DeadLettered,
    /// Foreign domain; nothing written anywhere
    Rejected,
}

pub struct MailboxStore {
    root: PathBuf,
    seq: Cell<u64>,
}

impl MailboxStore {
    pub fn open(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root.join(DEAD_LETTER_DIR))?;
        Ok(Self {
            root: root.to_path_buf(),
            seq: Cell::new(0),
        })
    }

    /// Route one email by its destination address.
    ///
    /// Foreign domains are strictly rejected with no record written. A local
    /// domain with no matching account dead-letters the message. The write is
    /// complete before this returns.
    pub fn deliver(&self, email: &Email, local_domain: &str) -> Result<Delivery, MailboxError> {
        let addr = MailAddr::parse(&email.destination)
            .ok_or_else(|| MailboxError::BadAddress(email.destination.clone()))?;

        if !addr.is_domain(local_domain) {
            debug!("refusing relay to foreign domain {}", addr.domain);
            return Ok(Delivery::Rejected);
        }

        let mailbox = self.root.join(&addr.local);
        if is_valid_username(&addr.local) && mailbox.is_dir() {
            let name = self.write_email(&mailbox, email)?;
            debug!("delivered {} to {}", name, addr.local);
            Ok(Delivery::Delivered)
        } else {
            let name = self.write_email(&self.root.join(DEAD_LETTER_DIR), email)?;
            info!("dead-lettered {} for unknown recipient {}", name, addr.local);
            Ok(Delivery::DeadLettered)
        }
    }

    /// List an account's emails, newest first, with 1-based indexes.
    ///
    /// An empty mailbox is an empty list, not an error.
    pub fn list(&self, username: &str) -> Result<Vec<MailSummary>, MailboxError> {
        let files = self.email_files(username)?;
        let mut out = Vec::with_capacity(files.len());

        for (i, path) in files.iter().enumerate() {
            let email = load_email(path)?;
            out.push(MailSummary {
                index: (i + 1) as u32,
                sender: email.sender,
                subject: email.subject,
                date: email.date,
            });
        }

        Ok(out)
    }

    /// Fetch one email by the 1-based index shown by `list`.
    pub fn read(&self, username: &str, index: u32) -> Result<Email, MailboxError> {
        let files = self.email_files(username)?;

        if index == 0 || index as usize > files.len() {
            return Err(MailboxError::NotFound(index));
        }

        load_email(&files[index as usize - 1])
    }

    /// Email count and total stored bytes for one account.
    pub fn stats(&self, username: &str) -> Result<(u32, u64), MailboxError> {
        let files = self.email_files(username)?;
        let mut total_bytes = 0u64;

        for path in &files {
            total_bytes += fs::metadata(path)?.len();
        }

        Ok((files.len() as u32, total_bytes))
    }

    /// Email file paths for one account, sorted newest-first by filename.
    fn email_files(&self, username: &str) -> Result<Vec<PathBuf>, MailboxError> {
        let dir = self.root.join(username);
        let mut names: Vec<String> = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if name == CREDENTIAL_FILE || !name.ends_with(EMAIL_EXT) {
                continue;
            }
            if entry.file_type()?.is_file() {
                names.push(name);
            }
        }

        // Descending filename order == newest first, by construction.
        names.sort_unstable_by(|a, b| b.cmp(a));

        Ok(names.into_iter().map(|n| dir.join(n)).collect())
    }

    fn write_email(&self, dir: &Path, email: &Email) -> Result<String, MailboxError> {
        let name = self.next_filename();
        let data = serde_json::to_vec_pretty(email)
            .map_err(|e| MailboxError::Store(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        fs::write(dir.join(&name), data)?;
        Ok(name)
    }

    fn next_filename(&self) -> String {
        let seq = self.seq.get().wrapping_add(1);
        self.seq.set(seq);
        format!("{:020}-{:06}.{}", now_ts_nanos(), seq % 1_000_000, EMAIL_EXT)
    }
}

fn load_email(path: &Path) -> Result<Email, MailboxError> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data).map_err(|e| {
        warn!("unreadable email record {}: {}", path.display(), e);
        MailboxError::Store(io::Error::new(io::ErrorKind::InvalidData, e))
    })
}
