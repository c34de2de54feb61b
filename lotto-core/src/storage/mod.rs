//! Flat-file persistence.
//!
//! All state lives under one data directory:
//!
//! - `users.txt`: `"{username} {password} "` text records.
//! - `blocked_clients.bin`: 12-byte lockout records (4-byte IPv4 octets +
//!   8-byte LE unix timestamp), append-only, scanned newest-first.
//! - `draws.bin`: fixed 239-byte draw blocks (8-byte LE timestamp + 11 x
//!   (wheel byte + 5 x 4-byte LE numbers)), append-only.
//! - `{user}_bets.bin`: 8-byte header of two 4-byte LE cursor offsets,
//!   then `"{timestamp} {encoded bet}|"` text records, append-only.
//! - `{user}_winnings.txt`: text winnings records, append-only.
//!
//! On-disk integers are little-endian; big-endian is used only on the wire.

pub mod draws;
pub mod ledger;
pub mod lockouts;
pub mod users;
pub mod winnings;

pub use draws::DrawLog;
pub use ledger::{BetLedger, LedgerWindow};
pub use lockouts::LockoutStore;
pub use users::UserStore;
pub use winnings::WinningsStore;

use crate::error::Result;
use std::path::{Path, PathBuf};

const LEDGER_SUFFIX: &str = "_bets.bin";
const WINNINGS_SUFFIX: &str = "_winnings.txt";

/// Root of the data directory; hands out per-file stores.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.txt")
    }

    pub fn lockouts_path(&self) -> PathBuf {
        self.data_dir.join("blocked_clients.bin")
    }

    pub fn draws_path(&self) -> PathBuf {
        self.data_dir.join("draws.bin")
    }

    pub fn ledger_path(&self, username: &str) -> PathBuf {
        self.data_dir.join(format!("{}{}", username, LEDGER_SUFFIX))
    }

    pub fn winnings_path(&self, username: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}{}", username, WINNINGS_SUFFIX))
    }

    /// Usernames that own a bet ledger, discovered from the directory
    /// listing. Used by the extraction pass over every ledger.
    pub fn ledger_usernames(&self) -> Result<Vec<String>> {
        let mut users = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(user) = name.strip_suffix(LEDGER_SUFFIX) {
                users.push(user.to_string());
            }
        }
        Ok(users)
    }
}
