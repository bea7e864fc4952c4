//! Server configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Default request body limit.
const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Shop server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:8000`
    pub bind_addr: String,
    /// Directory holding the prompt template files
    pub prompts_dir: PathBuf,
    /// Maximum accepted request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            prompts_dir: PathBuf::from("prompts"),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.prompts_dir, PathBuf::from("prompts"));
        assert!(config.max_body_size >= 1024 * 1024);
    }
}
