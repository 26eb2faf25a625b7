//! Mail address parsing.
//!
//! Addresses take the form `local@domain` with exactly one `@` separating two
//! non-empty parts. The local part doubles as the recipient's mailbox
//! directory name; the domain decides whether delivery is ours to attempt.

/// A parsed `local@domain` mail address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAddr {
    pub local: String,
    pub domain: String,
}

impl MailAddr {
    /// Parse an address, returning `None` unless it is exactly
    /// `local@domain` with both parts non-empty.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('@');
        let local = parts.next()?;
        let domain = parts.next()?;
        if parts.next().is_some() || local.is_empty() || domain.is_empty() {
            return None;
        }
        Some(Self {
            local: local.to_string(),
            domain: domain.to_string(),
        })
    }

    /// Case-insensitive domain match against the serving domain.
    pub fn is_domain(&self, domain: &str) -> bool {
        self.domain.eq_ignore_ascii_case(domain)
    }
}
