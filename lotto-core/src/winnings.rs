//! Winnings computation: set matching plus combinatorial payout distribution.

use crate::error::Result;
use crate::storage::draws::{DrawIter, DrawLog};
use crate::storage::WinningsStore;
use crate::types::{tier_multiplier, Bet, Draw, LedgerEntry, WheelOutcome, WinningsRecord};

/// Binomial coefficient C(n, k), 0 when k > n. Computed with the telescoped
/// product rather than factorials, as the reference does.
pub fn binomial(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let mut num = 1.0f64;
    let mut den = 1.0f64;
    for i in 0..k {
        num *= (n - i) as f64;
        den *= (i + 1) as f64;
    }
    num / den
}

/// Evaluates one bet against one draw. Returns a record only when at least
/// one played wheel has a non-empty intersection with its drawn numbers.
///
/// Per winning wheel, with `k` hits out of `m` played numbers and `t`
/// declared stakes, tiers `0..min(t, k)` pay
/// `C(k, j+1) * multiplier(j) / (C(m, j+1) * wheels_played)`: the fixed
/// per-tier prize is divided by the number of ways tier `j` could have been
/// hit within the played set, then split evenly across the wheels played.
/// The staked amounts select how many tiers are evaluated but do not scale
/// the payout; the reference system behaves this way and compatibility
/// requires keeping it.
pub fn evaluate(bet: &Bet, draw: &Draw) -> Option<WinningsRecord> {
    let mut played = bet.numbers.clone();
    played.sort_unstable();

    let m = played.len() as u32;
    let wheels_played = bet.wheels.len() as f64;
    let mut outcomes = Vec::new();

    for &wheel in &bet.wheels {
        // Draws are stored sorted; sort again defensively.
        let mut drawn = *draw.numbers_for(wheel);
        drawn.sort_unstable();

        let hits = intersect_sorted(&played, &drawn);
        if hits.is_empty() {
            continue;
        }

        let k = hits.len() as u32;
        let evaluated_tiers = bet.stakes.len().min(hits.len());
        let payouts = (0..evaluated_tiers)
            .map(|j| {
                let tier = (j + 1) as u32;
                binomial(k, tier) * tier_multiplier(j) / (binomial(m, tier) * wheels_played)
            })
            .collect();

        outcomes.push(WheelOutcome {
            wheel,
            hits,
            payouts,
        });
    }

    if outcomes.is_empty() {
        return None;
    }
    Some(WinningsRecord {
        timestamp: draw.timestamp,
        wheels: outcomes,
    })
}

/// Classic two-pointer intersection of two ascending sequences.
fn intersect_sorted(played: &[u32], drawn: &[u32]) -> Vec<u32> {
    let mut hits = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < played.len() && j < drawn.len() {
        if played[i] < drawn[j] {
            i += 1;
        } else if drawn[j] < played[i] {
            j += 1;
        } else {
            hits.push(played[i]);
            i += 1;
            j += 1;
        }
    }
    hits
}

/// Associates each ledger entry with the unique draw whose interval it falls
/// into and evaluates it there. `entries` must be chronological (ledgers are
/// append-only, so a window already is); the draw log is walked forward
/// once. A bet maps to the first draw at or after its submission, or to
/// nothing if no such draw exists yet, and is never evaluated twice.
pub fn associate(
    entries: &[LedgerEntry],
    draws: DrawIter,
) -> Result<Vec<Option<WinningsRecord>>> {
    let mut results = vec![None; entries.len()];
    let mut idx = 0;
    let mut prev_ts: Option<i64> = None;

    for draw in draws {
        if idx == entries.len() {
            break;
        }
        let draw = draw?;

        while idx < entries.len() {
            let ts = entries[idx].timestamp;
            let in_interval = ts <= draw.timestamp && prev_ts.map_or(true, |prev| ts > prev);
            if !in_interval {
                break;
            }
            results[idx] = evaluate(&entries[idx].bet, &draw);
            idx += 1;
        }

        prev_ts = Some(draw.timestamp);
    }

    Ok(results)
}

/// Evaluates a chronological ledger window against the draw log and appends
/// every produced record to the user's winnings store. Returns how many
/// records were written. Idempotence across calls comes from the caller
/// advancing the ledger's winnings cursor afterwards.
pub fn sweep(
    entries: &[LedgerEntry],
    log: &DrawLog,
    store: &WinningsStore,
) -> Result<usize> {
    let mut written = 0;
    for record in associate(entries, log.iter()?)?.into_iter().flatten() {
        store.append(&record)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Wheel, NUMBERS_PER_DRAW, WHEEL_COUNT};
    use tempfile::tempdir;

    fn draw_with(timestamp: i64, wheel: Wheel, numbers: [u32; NUMBERS_PER_DRAW]) -> Draw {
        // Every other wheel draws numbers a 1..=10 bet cannot hit.
        let mut all = [[81, 82, 83, 84, 85]; WHEEL_COUNT];
        all[wheel.code() as usize] = numbers;
        Draw {
            timestamp,
            numbers: all,
        }
    }

    #[test]
    fn binomial_table() {
        assert_eq!(binomial(3, 1), 3.0);
        assert_eq!(binomial(5, 2), 10.0);
        assert_eq!(binomial(4, 4), 1.0);
        assert_eq!(binomial(2, 3), 0.0);
        assert_eq!(binomial(0, 0), 1.0);
    }

    #[test]
    fn single_stake_two_hits_pays_tier_zero_only() {
        // Numbers {1,2,3} against a wheel drawing {1,2,9,40,77}: hits are
        // {1,2}, one declared stake evaluates exactly tier 0, paying
        // C(2,1) * 11.23 / (C(3,1) * 1).
        let bet = Bet {
            wheels: vec![Wheel::Bari],
            numbers: vec![1, 2, 3],
            stakes: vec![5.0],
        };
        let draw = draw_with(100, Wheel::Bari, [1, 2, 9, 40, 77]);

        let record = evaluate(&bet, &draw).unwrap();
        assert_eq!(record.timestamp, 100);
        assert_eq!(record.wheels.len(), 1);
        let outcome = &record.wheels[0];
        assert_eq!(outcome.wheel, Wheel::Bari);
        assert_eq!(outcome.hits, vec![1, 2]);
        assert_eq!(outcome.payouts.len(), 1);
        let expected = 2.0 * 11.23 / 3.0;
        assert!((outcome.payouts[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn losing_wheel_is_absent() {
        let bet = Bet {
            wheels: vec![Wheel::Bari, Wheel::Roma],
            numbers: vec![1, 2],
            stakes: vec![1.0],
        };
        // Only Roma draws anything the bet played.
        let draw = draw_with(100, Wheel::Roma, [2, 30, 40, 50, 60]);

        let record = evaluate(&bet, &draw).unwrap();
        assert_eq!(record.wheels.len(), 1);
        assert_eq!(record.wheels[0].wheel, Wheel::Roma);
        // Prize split across both wheels played.
        let expected = 1.0 * 11.23 / (2.0 * 2.0);
        assert!((record.wheels[0].payouts[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_intersection_produces_no_record() {
        let bet = Bet {
            wheels: vec![Wheel::Bari],
            numbers: vec![1, 2, 3],
            stakes: vec![1.0],
        };
        let draw = draw_with(100, Wheel::Bari, [10, 20, 30, 40, 50]);
        assert!(evaluate(&bet, &draw).is_none());
    }

    #[test]
    fn tiers_cap_at_hit_count() {
        // Five stakes declared but only two hits: tiers 0 and 1 evaluated.
        let bet = Bet {
            wheels: vec![Wheel::Bari],
            numbers: vec![1, 2, 3, 4],
            stakes: vec![1.0; 5],
        };
        let draw = draw_with(100, Wheel::Bari, [1, 2, 70, 80, 90]);

        let record = evaluate(&bet, &draw).unwrap();
        let outcome = &record.wheels[0];
        assert_eq!(outcome.payouts.len(), 2);
        assert!((outcome.payouts[0] - 2.0 * 11.23 / 4.0).abs() < 1e-9);
        assert!((outcome.payouts[1] - 1.0 * 250.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn bets_map_to_exactly_one_draw() {
        let dir = tempdir().unwrap();
        let log = DrawLog::new(dir.path().join("draws.bin"));
        log.append(&draw_with(100, Wheel::Bari, [1, 2, 3, 4, 5]))
            .unwrap();
        log.append(&draw_with(200, Wheel::Bari, [6, 7, 8, 9, 10]))
            .unwrap();

        let bet = |n: u32, ts: i64| LedgerEntry {
            timestamp: ts,
            bet: Bet {
                wheels: vec![Wheel::Bari],
                numbers: vec![n],
                stakes: vec![1.0],
            },
        };

        // First bet falls in (-inf, 100]; second in (100, 200]; third has no
        // qualifying draw yet.
        let entries = vec![bet(1, 50), bet(6, 150), bet(6, 250)];
        let results = associate(&entries, log.iter().unwrap()).unwrap();

        // Bet on 1 wins only against the first draw.
        assert_eq!(results[0].as_ref().unwrap().timestamp, 100);
        // Bet on 6 would win the second draw but not the first; it was
        // associated with the second.
        assert_eq!(results[1].as_ref().unwrap().timestamp, 200);
        // No draw after the third bet: not evaluated at all.
        assert!(results[2].is_none());
    }

    #[test]
    fn sweep_writes_only_winning_records() {
        let dir = tempdir().unwrap();
        let log = DrawLog::new(dir.path().join("draws.bin"));
        log.append(&draw_with(100, Wheel::Bari, [1, 2, 3, 4, 5]))
            .unwrap();

        let winnings_path = dir.path().join("alice_winnings.txt");
        WinningsStore::create(&winnings_path).unwrap();
        let store = WinningsStore::new(winnings_path);

        let win = LedgerEntry {
            timestamp: 50,
            bet: Bet {
                wheels: vec![Wheel::Bari],
                numbers: vec![1],
                stakes: vec![1.0],
            },
        };
        let lose = LedgerEntry {
            timestamp: 60,
            bet: Bet {
                wheels: vec![Wheel::Bari],
                numbers: vec![90],
                stakes: vec![1.0],
            },
        };

        let written = sweep(&[win, lose], &log, &store).unwrap();
        assert_eq!(written, 1);
        assert!(store.read_all().unwrap().starts_with("100 1 0 1 1 "));
    }
}
