use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{AccountProfile, Trade};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Failed to read journal {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse journal {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A journal export: trades plus, optionally, the account profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub account: Option<AccountProfile>,
}

/// Exports come either as a bare trade array or wrapped with the account.
#[derive(Deserialize)]
#[serde(untagged)]
enum JournalFile {
    Trades(Vec<Trade>),
    Full(Journal),
}

impl Journal {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| JournalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let journal = Self::from_json(&content).map_err(|source| JournalError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let closed = journal.closed_count();
        if closed == 0 {
            warn!("Journal {} has no closed trades", path.display());
        }
        debug!(
            "Loaded {} trades ({} closed) from {}",
            journal.trades.len(),
            closed,
            path.display()
        );
        Ok(journal)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str::<JournalFile>(content)? {
            JournalFile::Trades(trades) => Journal {
                trades,
                account: None,
            },
            JournalFile::Full(journal) => journal,
        })
    }

    pub fn closed_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_closed()).count()
    }
}
