use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_AGENT_SUFFIX: &str = "_agent";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub agents_dir: PathBuf,
    pub agent_suffix: String,
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            agents_dir: PathBuf::from("."),
            agent_suffix: DEFAULT_AGENT_SUFFIX.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: std::env::var("SWARM_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            agents_dir: std::env::var("SWARM_AGENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.agents_dir),
            agent_suffix: std::env::var("SWARM_AGENT_SUFFIX").unwrap_or(defaults.agent_suffix),
            timeout_secs: std::env::var("SWARM_AGENT_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            max_output_bytes: std::env::var("SWARM_MAX_OUTPUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_output_bytes),
        }
    }
}
