//! Sample `startups` dataset for local testing

use rusqlite::{Connection, params};
use std::path::Path;

use crate::error::SqliteMcpError;

const CREATE_STARTUPS: &str = "CREATE TABLE IF NOT EXISTS startups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    startup_name TEXT NOT NULL,
    description TEXT,
    website TEXT,
    funding_amount REAL,
    funding_date TEXT,
    investors TEXT
)";

const STARTUPS: [(&str, &str, &str, f64, &str, &str); 5] = [
    (
        "AlphaTech",
        "Innovative AI startup",
        "https://alphatech.io",
        5_000_000.0,
        "2023-05-15",
        "Investor A, Investor B",
    ),
    (
        "BetaSoft",
        "Enterprise SaaS solution",
        "https://betasoft.com",
        12_000_000.0,
        "2023-06-20",
        "Investor C",
    ),
    (
        "Gamma Innovations",
        "Cutting-edge biotech research",
        "https://gammainnovations.org",
        7_500_000.0,
        "2023-07-10",
        "Investor D, Investor E, Investor F",
    ),
    (
        "Delta Ventures",
        "Fintech disrupting traditional banking",
        "https://deltaventures.net",
        20_000_000.0,
        "2023-08-25",
        "Investor G",
    ),
    (
        "Epsilon Dynamics",
        "Sustainability through green energy",
        "https://epsilondynamics.com",
        10_000_000.0,
        "2023-09-05",
        "Investor H, Investor I",
    ),
];

/// Create (or extend) the database at `path` with the sample startups.
/// Returns the number of rows inserted.
pub fn create_sample_database(path: &Path) -> Result<usize, SqliteMcpError> {
    let mut conn = Connection::open(path)
        .map_err(|e| SqliteMcpError::Connection(format!("{}: {e}", path.display())))?;

    let tx = conn.transaction()?;
    tx.execute(CREATE_STARTUPS, [])?;

    let mut rows_inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO startups (startup_name, description, website, funding_amount, funding_date, investors)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (name, description, website, funding, date, investors) in STARTUPS {
            rows_inserted += stmt.execute(params![name, description, website, funding, date, investors])?;
        }
    }
    tx.commit()?;

    tracing::info!(path = %path.display(), rows_inserted, "Created sample startups database");
    Ok(rows_inserted)
}
