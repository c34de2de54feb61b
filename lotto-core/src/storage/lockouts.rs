use crate::error::{LottoError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// How long a third-strike IP stays blocked.
pub const LOCKOUT_WINDOW_SECS: i64 = 30 * 60;

const RECORD_LEN: usize = 4 + 8;

/// Append-only list of (client IP, timestamp) lockout records. Records are
/// time-ordered by construction, so a newest-first scan can stop at the
/// first record that falls outside the lockout window.
pub struct LockoutStore {
    path: PathBuf,
}

impl LockoutStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, ip: Ipv4Addr, timestamp: i64) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&ip.octets())?;
        file.write_all(&timestamp.to_le_bytes())?;
        Ok(())
    }

    /// Whether `ip` has a lockout record within the window ending at `now`.
    pub fn is_blocked(&self, ip: Ipv4Addr, now: i64) -> Result<bool> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if bytes.len() % RECORD_LEN != 0 {
            return Err(LottoError::malformed(format!(
                "lockout file length {} is not a multiple of {}",
                bytes.len(),
                RECORD_LEN
            )));
        }

        for record in bytes.chunks_exact(RECORD_LEN).rev() {
            let addr = Ipv4Addr::new(record[0], record[1], record[2], record[3]);
            let timestamp = i64::from_le_bytes(record[4..12].try_into().unwrap());

            // Older records are older still; stop scanning.
            if now - timestamp > LOCKOUT_WINDOW_SECS {
                break;
            }
            if addr == ip {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
