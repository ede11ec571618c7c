//! Offline provider backed by chain snapshot files.
//!
//! A snapshot is the JSON document `{ "quote": {...}, "results": [...] }`
//! stored as `{TICKER}_{YYYY-MM-DD}.json`. Useful for reproducible runs and
//! for working without API keys.

use super::traits::{MarketDataError, MarketDataProvider};
use super::types::{Contract, OptionChain, Quote};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Quote plus chain captured at one moment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    #[serde(default)]
    pub quote: Option<Quote>,
    #[serde(default)]
    pub results: Vec<Contract>,
}

impl ChainSnapshot {
    /// Read a snapshot file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    pub fn chain(&self) -> OptionChain {
        OptionChain::new(self.results.clone())
    }
}

/// Reads snapshots from a directory.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    dir: PathBuf,
}

impl SnapshotProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name for a ticker and expiration.
    pub fn path_for(&self, ticker: &str, expiration: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", ticker.to_uppercase(), expiration.format("%Y-%m-%d")))
    }

    async fn read(&self, path: &Path) -> Result<Option<ChainSnapshot>, MarketDataError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(MarketDataError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| MarketDataError::Parse {
                what: path.display().to_string(),
                source,
            })
    }

    /// Snapshot files for a ticker, newest expiration first.
    async fn files_for(&self, ticker: &str) -> Result<Vec<PathBuf>, MarketDataError> {
        let prefix = format!("{}_", ticker.to_uppercase());
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(MarketDataError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(MarketDataError::Io {
                        path: self.dir.clone(),
                        source,
                    })
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) && name.ends_with(".json") {
                files.push(entry.path());
            }
        }
        files.sort();
        files.reverse();
        Ok(files)
    }
}

#[async_trait]
impl MarketDataProvider for SnapshotProvider {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    /// Quote from the newest snapshot of the ticker that carries one.
    #[instrument(skip(self), name = "snapshot_quote")]
    async fn fetch_quote(&self, ticker: &str) -> Result<Quote, MarketDataError> {
        for path in self.files_for(ticker).await? {
            if let Some(quote) = self.read(&path).await?.and_then(|s| s.quote) {
                debug!(ticker, path = %path.display(), price = quote.price, "Loaded quote");
                return Ok(quote);
            }
        }
        Err(MarketDataError::NoQuote(ticker.to_string()))
    }

    #[instrument(skip(self), name = "snapshot_chain")]
    async fn fetch_option_chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChain, MarketDataError> {
        let path = self.path_for(ticker, expiration);
        match self.read(&path).await? {
            Some(snapshot) if !snapshot.results.is_empty() => {
                debug!(ticker, count = snapshot.results.len(), "Loaded option chain");
                Ok(OptionChain::new(snapshot.results))
            }
            _ => Err(MarketDataError::NoChain {
                ticker: ticker.to_string(),
                expiration,
            }),
        }
    }
}
