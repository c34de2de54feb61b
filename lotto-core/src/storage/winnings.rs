use crate::error::Result;
use crate::types::WinningsRecord;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-user append-only winnings history, stored as text records.
///
/// Record layout: draw timestamp, count of winning wheels, then per winning
/// wheel its code, the matched numbers (count-prefixed), and the computed
/// payouts (count-prefixed, two decimals), each wheel closed by `'|'`.
pub struct WinningsStore {
    path: PathBuf,
}

impl WinningsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn create(path: &Path) -> Result<()> {
        std::fs::File::create(path)?;
        Ok(())
    }

    pub fn append(&self, record: &WinningsRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(encode_record(record).as_bytes())?;
        Ok(())
    }

    /// The full winnings history as stored. Empty string means no winnings.
    pub fn read_all(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn encode_record(record: &WinningsRecord) -> String {
    let mut out = String::new();
    let _ = write!(out, "{} {} ", record.timestamp, record.wheels.len());
    for outcome in &record.wheels {
        let _ = write!(out, "{} {} ", outcome.wheel.code(), outcome.hits.len());
        for hit in &outcome.hits {
            let _ = write!(out, "{} ", hit);
        }
        let _ = write!(out, "{} ", outcome.payouts.len());
        for payout in &outcome.payouts {
            let _ = write!(out, "{:.2} ", payout);
        }
        out.push('|');
    }
    out
}
