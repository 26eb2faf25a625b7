//! Configuration file parser.
//!
//! Parses TOML-style configuration files with a custom lightweight parser.
//! `[section]` headers scope the bare keys that follow; `section.key = value`
//! lines work anywhere. `#` starts a comment.

use super::types::*;
use std::{fs, io};

/// Load configuration from a file path.
pub fn load_config(path: &str) -> io::Result<Config> {
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

/// Parse configuration from a string.
fn parse_config(s: &str) -> io::Result<Config> {
    let mut cfg = Config::default();
    let mut current_section = String::new();

    for (lineno, line) in s.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current_section = name.trim().to_string();
            continue;
        }

        let Some((lhs, rhs)) = line.split_once('=') else {
            continue;
        };
        let lhs = lhs.trim();
        let val = rhs.trim();

        let (section, key) = if let Some((a, b)) = lhs.split_once('.') {
            (a.trim(), b.trim())
        } else {
            (current_section.as_str(), lhs)
        };

        if section.is_empty() {
            continue;
        }

        set_config_value(section, key, val, &mut cfg).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", lineno + 1, e),
            )
        })?;
    }

    Ok(cfg)
}

/// Set a configuration value based on section, key, and value strings.
fn set_config_value(section: &str, key: &str, val: &str, cfg: &mut Config) -> Result<(), String> {
    macro_rules! parse {
        (s) => {
            val.trim_matches('"').to_string()
        };
        (usize_) => {
            val.parse::<usize>().map_err(|e| e.to_string())?
        };
    }

    match (section, key) {
        // Server section
        ("server", "bind_addr") => cfg.server.bind_addr = parse!(s),
        ("server", "domain") => cfg.server.domain = parse!(s),
        ("server", "server_name") => cfg.server.server_name = parse!(s),

        // Storage section
        ("storage", "data_dir") => cfg.storage.data_dir = parse!(s),

        // Limits section
        ("limits", "max_active_conns") => cfg.limits.max_active_conns = parse!(usize_),
        ("limits", "max_frame_bytes") => cfg.limits.max_frame_bytes = parse!(usize_),
        ("limits", "max_name_bytes") => cfg.limits.max_name_bytes = parse!(usize_),
        ("limits", "max_subject_bytes") => cfg.limits.max_subject_bytes = parse!(usize_),
        ("limits", "max_body_bytes") => cfg.limits.max_body_bytes = parse!(usize_),

        _ => return Err(format!("unknown key {section}.{key}")),
    }

    Ok(())
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &str) -> io::Result<Self> {
        load_config(path)
    }
}
