//! Lotto game engine.
//!
//! Server-side core of a multiplayer lottery: per-user append-only bet
//! ledgers with dual-cursor bookkeeping, a global append-only draw log, a
//! periodic extraction scheduler with an exclusive/shared access discipline
//! against in-flight requests, winnings computation, and a brute-force login
//! lockout.

pub mod auth;
pub mod codec;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod storage;
pub mod types;
pub mod winnings;

pub use auth::{AuthOutcome, LoginGate, Session};
pub use engine::{BetKind, BetListing, LottoEngine};
pub use error::{ErrorCode, LottoError, Result};
pub use scheduler::{ExtractionScheduler, SchedulerState, DEFAULT_EXTRACTION_PERIOD};
pub use storage::draws::DrawSlice;
pub use types::{Bet, Draw, LedgerEntry, Wheel, WinningsRecord};
