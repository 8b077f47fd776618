//! Configuration management
//!
//! Node settings come from defaults, an optional TOML file, and command-line
//! flags, in increasing order of precedence.

pub mod settings;

pub use settings::{Settings, DEFAULT_HOST, DEFAULT_IDLE_TIMEOUT_SECS, MAX_DIFFICULTY};
