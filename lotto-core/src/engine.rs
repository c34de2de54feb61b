//! The engine facade: every per-session operation and the extraction cycle.

use crate::auth::{AuthOutcome, LoginGate, Session};
use crate::error::{LottoError, Result};
use crate::storage::draws::DrawSlice;
use crate::storage::{BetLedger, DrawLog, LedgerWindow, LockoutStore, Storage, UserStore, WinningsStore};
use crate::types::{Bet, Draw, LedgerEntry, Wheel, WinningsRecord, MAX_NUMBER, NUMBERS_PER_DRAW, WHEEL_COUNT};
use crate::winnings;
use chrono::Utc;
use parking_lot::RwLock as SyncRwLock;
use rand::Rng;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Which bets a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetKind {
    /// Bets already covered by a draw, with their outcome attached.
    Settled,
    /// Bets awaiting the next extraction.
    Pending,
}

/// One entry of a bet listing. `outcome` is populated for settled bets that
/// won something on their associated draw.
#[derive(Debug, Clone, PartialEq)]
pub struct BetListing {
    pub entry: LedgerEntry,
    pub outcome: Option<WinningsRecord>,
}

/// Process-wide game engine.
///
/// Concurrency discipline: request handlers take a shared hold on
/// `draw_gate` for every ledger/draw operation; the extraction cycle takes
/// the exclusive hold. Tokio's FIFO-fair `RwLock` queues new readers behind
/// a waiting writer, which bounds extraction latency the way the original's
/// process-group pause signals did. Within a user, ledger and winnings
/// writes are serialized by a per-username mutex.
pub struct LottoEngine {
    storage: Storage,
    login_gate: LoginGate,
    draw_log: DrawLog,
    draw_gate: RwLock<()>,
    user_locks: SyncRwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl LottoEngine {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let storage = Storage::new(data_dir)?;
        let login_gate = LoginGate::new(
            UserStore::new(storage.users_path()),
            LockoutStore::new(storage.lockouts_path()),
        );
        let draw_log = DrawLog::new(storage.draws_path());

        Ok(Self {
            storage,
            login_gate,
            draw_log,
            draw_gate: RwLock::new(()),
            user_locks: SyncRwLock::new(HashMap::new()),
        })
    }

    fn user_lock(&self, username: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.user_locks.read().get(username) {
            return lock.clone();
        }
        let mut locks = self.user_locks.write();
        locks
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn ledger(&self, username: &str) -> BetLedger {
        BetLedger::new(self.storage.ledger_path(username))
    }

    fn winnings_store(&self, username: &str) -> WinningsStore {
        WinningsStore::new(self.storage.winnings_path(username))
    }

    /// Registers a new user: a credentials record, a fresh dual-cursor
    /// ledger, and an empty winnings file. Does not log the user in.
    pub async fn signup(&self, username: &str, password: &str) -> Result<()> {
        validate_credential(username, "username")?;
        validate_credential(password, "password")?;

        let lock = self.user_lock(username);
        let _guard = lock.lock().await;

        let users = UserStore::new(self.storage.users_path());
        if users.exists(username)? {
            return Err(LottoError::UsernameTaken(username.to_string()));
        }
        users.append(username, password)?;
        BetLedger::create(&self.storage.ledger_path(username))?;
        WinningsStore::create(&self.storage.winnings_path(username))?;

        tracing::info!("registered user '{}'", username);
        Ok(())
    }

    /// One login attempt for a connection. The caller owns the
    /// per-connection failure counter and must end the session after a
    /// third-strike rejection.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip: Ipv4Addr,
        failed_attempts: &mut u8,
    ) -> Result<AuthOutcome> {
        self.login_gate
            .authenticate(username, password, ip, Utc::now(), failed_attempts)
    }

    pub async fn submit_bet(&self, session: &Session, bet: &Bet) -> Result<()> {
        bet.validate()?;

        let _read = self.draw_gate.read().await;
        let lock = self.user_lock(&session.username);
        let _guard = lock.lock().await;

        let now = Utc::now().timestamp();
        self.ledger(&session.username).append(bet, now)?;
        tracing::info!("user '{}' submitted a bet", session.username);
        Ok(())
    }

    pub async fn list_bets(&self, session: &Session, kind: BetKind) -> Result<Vec<BetListing>> {
        let _read = self.draw_gate.read().await;
        let lock = self.user_lock(&session.username);
        let _guard = lock.lock().await;

        let ledger = self.ledger(&session.username);
        match kind {
            BetKind::Pending => {
                let entries = ledger.read_window(LedgerWindow::Unextracted)?;
                Ok(entries
                    .into_iter()
                    .map(|entry| BetListing {
                        entry,
                        outcome: None,
                    })
                    .collect())
            }
            BetKind::Settled => {
                let entries = ledger.read_window(LedgerWindow::Extracted)?;
                let outcomes = winnings::associate(&entries, self.draw_log.iter()?)?;
                Ok(entries
                    .into_iter()
                    .zip(outcomes)
                    .map(|(entry, outcome)| BetListing { entry, outcome })
                    .collect())
            }
        }
    }

    /// The most recent `n` draws, newest first, optionally one wheel only.
    pub async fn list_draws(&self, n: u32, wheel: Option<Wheel>) -> Result<Vec<DrawSlice>> {
        if n == 0 {
            return Err(LottoError::malformed_request("draw count must be positive"));
        }
        let _read = self.draw_gate.read().await;
        self.draw_log.latest(n, wheel)
    }

    /// Sweeps the user's unchecked ledger window for new winnings, then
    /// returns the full winnings history text. An empty string means the
    /// user has never won.
    pub async fn list_winnings(&self, session: &Session) -> Result<String> {
        let _read = self.draw_gate.read().await;
        let lock = self.user_lock(&session.username);
        let _guard = lock.lock().await;

        let ledger = self.ledger(&session.username);
        let entries = ledger.read_window(LedgerWindow::SinceLastCheck)?;
        if !entries.is_empty() {
            let store = self.winnings_store(&session.username);
            let written = winnings::sweep(&entries, &self.draw_log, &store)?;
            // Everything in the window is now checked, winner or not.
            let (unextracted, _) = ledger.cursors()?;
            ledger.advance_unchecked(unextracted)?;
            if written > 0 {
                tracing::info!(
                    "user '{}' collected {} new winnings record(s)",
                    session.username,
                    written
                );
            }
        }

        self.winnings_store(&session.username).read_all()
    }

    /// One extraction cycle: under the exclusive hold, draw all wheels,
    /// append the result to the log, and mark every bet present in every
    /// ledger as extracted. Any failure aborts the cycle; cursors move only
    /// after the draw is durably appended.
    pub async fn run_extraction(&self) -> Result<Draw> {
        let _write = self.draw_gate.write().await;

        let draw = generate_draw(Utc::now().timestamp());
        self.draw_log.append(&draw)?;

        for username in self.storage.ledger_usernames()? {
            let ledger = self.ledger(&username);
            let len = ledger.len()?;
            ledger.advance_unextracted(len)?;
        }

        tracing::info!("extraction completed at {}", draw.timestamp);
        Ok(draw)
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }
}

fn validate_credential(value: &str, what: &str) -> Result<()> {
    let ok = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(LottoError::malformed_request(format!(
            "{} must be 1-64 characters of [A-Za-z0-9_-]",
            what
        )))
    }
}

/// Draws 5 distinct numbers from [1, 90] for each wheel, by rejection
/// sampling within the wheel. Numbers are stored ascending.
fn generate_draw(timestamp: i64) -> Draw {
    let mut rng = rand::rng();
    let mut numbers = [[0u32; NUMBERS_PER_DRAW]; WHEEL_COUNT];

    for wheel_numbers in numbers.iter_mut() {
        let mut picked = 0;
        while picked < NUMBERS_PER_DRAW {
            let candidate = rng.random_range(1..=MAX_NUMBER);
            if !wheel_numbers[..picked].contains(&candidate) {
                wheel_numbers[picked] = candidate;
                picked += 1;
            }
        }
        wheel_numbers.sort_unstable();
    }

    Draw { timestamp, numbers }
}
