//! Credential checking and brute-force lockout.

use crate::error::Result;
use crate::storage::{LockoutStore, UserStore};
use crate::types::SESSION_ID_LEN;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::net::Ipv4Addr;

const ALPHANUMERIC: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Failed attempts on one connection before its IP is locked out.
pub const MAX_FAILED_LOGINS: u8 = 3;

/// A logged-in connection: the issued session id is the sole credential for
/// every subsequent request on that connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted { session_id: String },
    /// Bad username or password. `third_strike` marks the failure that
    /// triggered a lockout; the caller should end the connection after it.
    Rejected { third_strike: bool },
    /// The client IP is currently locked out; credentials were not checked.
    Blocked,
}

/// Validates credentials, counts consecutive failures per connection, and
/// enforces the 30-minute IP lockout.
pub struct LoginGate {
    users: UserStore,
    lockouts: LockoutStore,
}

impl LoginGate {
    pub fn new(users: UserStore, lockouts: LockoutStore) -> Self {
        Self { users, lockouts }
    }

    /// One login attempt. `failed_attempts` is the per-connection counter;
    /// the third consecutive failure appends a lockout record for `ip`.
    /// Only that append and the session-id generation mutate state.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        ip: Ipv4Addr,
        now: DateTime<Utc>,
        failed_attempts: &mut u8,
    ) -> Result<AuthOutcome> {
        if self.lockouts.is_blocked(ip, now.timestamp())? {
            return Ok(AuthOutcome::Blocked);
        }

        let stored = self.users.lookup(username)?;
        if stored.as_deref() != Some(password) {
            *failed_attempts += 1;
            if *failed_attempts >= MAX_FAILED_LOGINS {
                self.lockouts.append(ip, now.timestamp())?;
                tracing::warn!("locked out {} after {} failed logins", ip, failed_attempts);
                return Ok(AuthOutcome::Rejected { third_strike: true });
            }
            return Ok(AuthOutcome::Rejected { third_strike: false });
        }

        let session_id = generate_session_id();
        tracing::info!("user '{}' logged in from {}", username, ip);
        Ok(AuthOutcome::Granted { session_id })
    }
}

/// A fixed-length identifier drawn uniformly from the 62-character
/// alphanumeric alphabet.
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LEN)
        .map(|_| ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::lockouts::LOCKOUT_WINDOW_SECS;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn gate(dir: &std::path::Path) -> LoginGate {
        let users = UserStore::new(dir.join("users.txt"));
        users.append("alice", "secret").unwrap();
        let lockouts = LockoutStore::new(dir.join("blocked_clients.bin"));
        LoginGate::new(users, lockouts)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn grants_session_on_valid_credentials() {
        let dir = tempdir().unwrap();
        let gate = gate(dir.path());
        let mut failures = 0;

        let outcome = gate
            .authenticate("alice", "secret", Ipv4Addr::LOCALHOST, at(0), &mut failures)
            .unwrap();
        match outcome {
            AuthOutcome::Granted { session_id } => {
                assert_eq!(session_id.len(), SESSION_ID_LEN);
                assert!(session_id.chars().all(|c| c.is_ascii_alphanumeric()));
            }
            other => panic!("expected grant, got {:?}", other),
        }
        assert_eq!(failures, 0);
    }

    #[test]
    fn third_strike_locks_out_the_ip() {
        let dir = tempdir().unwrap();
        let gate = gate(dir.path());
        let ip = Ipv4Addr::new(192, 168, 1, 9);
        let mut failures = 0;

        for expected_strike in [false, false, true] {
            let outcome = gate
                .authenticate("alice", "wrong", ip, at(100), &mut failures)
                .unwrap();
            assert_eq!(
                outcome,
                AuthOutcome::Rejected {
                    third_strike: expected_strike
                }
            );
        }
        assert_eq!(failures, 3);

        // A fourth attempt is blocked without a credential check: even the
        // correct password does not get through.
        let mut fresh_counter = 0;
        let outcome = gate
            .authenticate("alice", "secret", ip, at(200), &mut fresh_counter)
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Blocked);

        // After the window elapses the IP may log in again.
        let outcome = gate
            .authenticate(
                "alice",
                "secret",
                ip,
                at(100 + LOCKOUT_WINDOW_SECS + 1),
                &mut fresh_counter,
            )
            .unwrap();
        assert!(matches!(outcome, AuthOutcome::Granted { .. }));
    }

    #[test]
    fn unknown_user_counts_as_failure() {
        let dir = tempdir().unwrap();
        let gate = gate(dir.path());
        let mut failures = 0;

        let outcome = gate
            .authenticate("mallory", "x", Ipv4Addr::LOCALHOST, at(0), &mut failures)
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Rejected { third_strike: false });
        assert_eq!(failures, 1);
    }

    #[test]
    fn session_ids_differ() {
        assert_ne!(generate_session_id(), generate_session_id());
    }
}
