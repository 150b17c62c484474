//! Server configuration parsed from environment variables.

use hpmdl::CompilerOptions;
use hpmdl::pipeline::lookup_parse;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Requests whose `source` exceeds this many bytes are rejected with 413.
    pub max_source_bytes: usize,
    pub compiler: CompilerOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, max_source_bytes: DEFAULT_MAX_SOURCE_BYTES, compiler: CompilerOptions::default() }
    }
}

impl ServerConfig {
    /// Build server config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `HPMDL_MAX_SOURCE_BYTES`: default 262144
    /// - `HPMDL_TIME_STEP`, `HPMDL_MAX_STEPS`, `HPMDL_TOLERANCE`: see `CompilerOptions::from_env`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config through `lookup`, which maps a variable name to its raw value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup_parse(&lookup, "PORT", DEFAULT_PORT),
            max_source_bytes: lookup_parse(&lookup, "HPMDL_MAX_SOURCE_BYTES", DEFAULT_MAX_SOURCE_BYTES),
            compiler: CompilerOptions::from_lookup(&lookup),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
