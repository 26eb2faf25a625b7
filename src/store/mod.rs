//! File-backed stores: account credentials and per-account mailboxes.
//!
//! Layout under one data root:
//! - `<root>/<username>/passwd` — credential digest
//! - `<root>/<username>/<ts>-<seq>.json` — one file per stored email
//! - `<root>/lost+found/` — shared dead-letter area

pub mod accounts;
pub mod mailbox;

use std::io;
use std::path::PathBuf;

use crate::config::Config;

pub use accounts::AccountStore;
pub use mailbox::{Delivery, MailboxStore};

/// Root handle over both stores. Opening creates the data root and the
/// dead-letter area if they are missing.
pub struct Storage {
    pub accounts: AccountStore,
    pub mailbox: MailboxStore,
}

impl Storage {
    pub fn open(cfg: &Config) -> io::Result<Self> {
        let root = PathBuf::from(&cfg.storage.data_dir);
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            accounts: AccountStore::open(&root)?,
            mailbox: MailboxStore::open(&root)?,
        })
    }
}
