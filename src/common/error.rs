//! Unified error types for the postbox codebase.

use std::fmt;
use std::io;

/// Error type for codec/protocol operations.
#[derive(Debug)]
pub enum CodecError {
    /// Not enough data available
    Short,
    /// Data format is invalid
    Malformed(&'static str),
    /// Request tag outside the supported set
    UnknownTag(u8),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Short => write!(f, "unexpected end of data"),
            CodecError::Malformed(msg) => write!(f, "malformed data: {}", msg),
            CodecError::UnknownTag(t) => write!(f, "unknown request tag 0x{:02x}", t),
        }
    }
}

impl std::error::Error for CodecError {}

/// Error type for account store operations.
#[derive(Debug)]
pub enum AuthError {
    /// An account with that name is already registered
    AccountExists,
    /// Unknown username or wrong password; the two are indistinguishable
    InvalidCredentials,
    /// Username unusable as a mailbox directory name
    InvalidName,
    /// Underlying filesystem failure
    Store(io::Error),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::AccountExists => write!(f, "account already exists"),
            AuthError::InvalidCredentials => write!(f, "invalid username or password"),
            AuthError::InvalidName => write!(f, "invalid account name"),
            AuthError::Store(e) => write!(f, "credential storage error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AuthError {
    fn from(e: io::Error) -> Self {
        AuthError::Store(e)
    }
}

/// Error type for mailbox store operations.
#[derive(Debug)]
pub enum MailboxError {
    /// Destination does not parse as `local@domain`
    BadAddress(String),
    /// 1-based index outside the current mailbox listing
    NotFound(u32),
    /// Underlying filesystem failure
    Store(io::Error),
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailboxError::BadAddress(a) => write!(f, "invalid destination address: {}", a),
            MailboxError::NotFound(i) => write!(f, "no email at index {}", i),
            MailboxError::Store(e) => write!(f, "mailbox storage error: {}", e),
        }
    }
}

impl std::error::Error for MailboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MailboxError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MailboxError {
    fn from(e: io::Error) -> Self {
        MailboxError::Store(e)
    }
}

/// Request-handler fault, converted to a FAIL frame at the dispatch boundary.
///
/// The numeric codes travel on the wire; storage faults deliberately carry no
/// filesystem detail to the peer.
#[derive(Debug)]
pub enum RelayError {
    /// Authentication / registration failure
    Auth(AuthError),
    /// Request needs an authenticated session and the connection has none
    SessionRequired,
    /// Delivery refused (bad address, unknown recipient, foreign domain)
    Delivery(String),
    /// Filesystem failure while serving the request
    Storage(io::Error),
}

impl RelayError {
    /// Wire-level FAIL code for this error class.
    pub fn code(&self) -> u32 {
        match self {
            RelayError::Auth(_) => 1,
            RelayError::SessionRequired => 2,
            RelayError::Delivery(_) => 3,
            RelayError::Storage(_) => 4,
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Auth(e) => write!(f, "{}", e),
            RelayError::SessionRequired => write!(f, "not logged in"),
            RelayError::Delivery(msg) => write!(f, "{}", msg),
            RelayError::Storage(_) => write!(f, "storage error; please try again later"),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Auth(e) => Some(e),
            RelayError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AuthError> for RelayError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Store(io) => RelayError::Storage(io),
            other => RelayError::Auth(other),
        }
    }
}

impl From<MailboxError> for RelayError {
    fn from(e: MailboxError) -> Self {
        match e {
            MailboxError::Store(io) => RelayError::Storage(io),
            other => RelayError::Delivery(other.to_string()),
        }
    }
}

impl From<io::Error> for RelayError {
    fn from(e: io::Error) -> Self {
        RelayError::Storage(e)
    }
}
