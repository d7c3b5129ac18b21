//! Command line and environment configuration

use clap::Parser;
use std::path::PathBuf;

/// Read-only SQLite MCP server over stdio.
#[derive(Debug, Clone, Parser)]
#[command(name = "sqlite-mcp", version, about)]
pub struct Config {
    /// Path to the SQLite database file
    #[arg(long, env = "SQLITE_MCP_DB_PATH", default_value = "startups.db")]
    pub db_path: String,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "SQLITE_MCP_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// How long SQLite waits on a locked database before failing
    #[arg(long, env = "SQLITE_MCP_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Create the sample `startups` database at the database path and exit
    #[arg(long)]
    pub create_sample: bool,
}

impl Config {
    /// Database path with a leading `~/` expanded to the home directory.
    pub fn database_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match home::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
