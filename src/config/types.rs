//! Configuration type definitions.

/// Relay listener and domain configuration.
#[derive(Clone, Debug)]
pub struct Server {
    pub bind_addr: String,
    /// The single mail domain this relay serves.
    pub domain: String,
    /// Identifier prefixed to operator-facing error messages.
    pub server_name: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:2525".into(),
            domain: "example.org".into(),
            server_name: "postbox".into(),
        }
    }
}

/// Storage layout configuration.
#[derive(Clone, Debug)]
pub struct Storage {
    pub data_dir: String,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            data_dir: "data".into(),
        }
    }
}

/// Connection and request-size limits.
#[derive(Clone, Debug)]
pub struct Limits {
    pub max_active_conns: usize,
    /// Maximum value of the wire length field (tag byte included).
    pub max_frame_bytes: usize,
    pub max_name_bytes: usize,
    pub max_subject_bytes: usize,
    pub max_body_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_active_conns: 64,
            max_frame_bytes: 1024 * 1024,
            max_name_bytes: 64,
            max_subject_bytes: 512,
            max_body_bytes: 256 * 1024,
        }
    }
}

/// Root configuration container.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub server: Server,
    pub storage: Storage,
    pub limits: Limits,
}
