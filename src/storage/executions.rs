//! Trade ledger implementations

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use crate::{adapters::TradeLedger, types::TradeRecord};

/// Appends each trade as one JSON line to `<dir>/trades_<date>.jsonl`.
pub struct JsonlTradeLedger {
    directory: PathBuf,
    // Serializes appends so concurrent lanes never interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlTradeLedger {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create ledger directory {}", directory.display()))?;
        Ok(Self {
            directory,
            write_lock: Mutex::new(()),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn current_file(&self) -> PathBuf {
        self.directory
            .join(format!("trades_{}.jsonl", Utc::now().format("%Y-%m-%d")))
    }

    fn write_line(&self, record: &TradeRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_file())?;

        writeln!(file, "{}", line)?;
        Ok(())
    }
}

#[async_trait]
impl TradeLedger for JsonlTradeLedger {
    async fn append(&self, record: &TradeRecord) -> Result<()> {
        self.write_line(record)?;

        info!(
            trade_id = %record.id,
            status = ?record.status,
            profit_loss = %record.profit_loss,
            "Saved trade record"
        );

        Ok(())
    }
}

/// Keeps records in memory; useful for embedding and tests.
#[derive(Clone, Default)]
pub struct InMemoryTradeLedger {
    records: Arc<Mutex<Vec<TradeRecord>>>,
}

impl InMemoryTradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TradeRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl TradeLedger for InMemoryTradeLedger {
    async fn append(&self, record: &TradeRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
