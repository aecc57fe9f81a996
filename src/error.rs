//! Pipeline error taxonomy.
//!
//! Recovery happens at the narrowest scope that preserves forward progress:
//! row-level problems are counted and skipped, a failed batch skips that
//! batch only, a failed year is caught by the driver loop, and nothing short
//! of a missing database aborts the whole run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Remote retrieval failed after every retry; fatal for the year.
    #[error("download failed after {attempts} attempts: {source}")]
    FetchExhausted {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Structurally invalid payload (bad quoting, ragged columns); fatal for the year.
    #[error("csv decode failed: {0}")]
    Decode(#[from] csv::Error),

    /// A batch transaction kept deadlocking past the retry budget.
    /// Recoverable at the year level: the batch is skipped, the year continues.
    #[error("transaction still deadlocked after {attempts} attempts")]
    DeadlockRetryExhausted { attempts: u32 },

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl ImportError {
    /// Deadlock classification for the retry loop.
    ///
    /// Prefer the structured SQLSTATE from the driver (40P01 =
    /// deadlock_detected). The message-substring fallback is kept on purpose:
    /// it matches how the previous importer recognized deadlocks, and covers
    /// errors that reach us without a code (e.g. through a pooler).
    pub fn is_deadlock(&self) -> bool {
        match self {
            ImportError::Db(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("40P01")
                    || db_err.message().to_ascii_lowercase().contains("deadlock")
            }
            ImportError::Db(other) => other.to_string().to_ascii_lowercase().contains("deadlock"),
            _ => false,
        }
    }
}
