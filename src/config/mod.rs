//! Server configuration: types and file parser.

mod parser;
mod types;

pub use types::{Config, Limits, Server, Storage};
