//! Runtime configuration from the environment.
//!
//! `dotenvy` loads a `.env` file in `main` before this is read, matching
//! the deployment style of the webhook server this replaces (`PORT`).

use std::path::PathBuf;

/// HTTP port used when `PORT` is unset or unparseable.
const DEFAULT_PORT: u16 = 3000;

/// Container file name inside the data directory.
pub const EVENTS_FILE_NAME: &str = "github-events.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the webhook HTTP server.
    pub port: u16,
    /// Directory holding the event container file.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parse_port(std::env::var("PORT").ok()),
            data_dir: std::env::var_os("GITHUB_EVENTS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Full path of the event container file.
    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join(EVENTS_FILE_NAME)
    }
}

fn parse_port(raw: Option<String>) -> u16 {
    raw.and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}
