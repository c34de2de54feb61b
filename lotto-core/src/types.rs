use crate::error::{LottoError, Result};
use serde::{Deserialize, Serialize};

/// How many independent drawing pools exist (ten cities plus the national one).
pub const WHEEL_COUNT: usize = 11;
/// Numbers drawn per wheel per extraction.
pub const NUMBERS_PER_DRAW: usize = 5;
/// Numbers are drawn from [1, MAX_NUMBER].
pub const MAX_NUMBER: u32 = 90;
/// A bet may play at most this many numbers.
pub const MAX_BET_NUMBERS: usize = 10;
/// Prize tiers: single, double, triple, quadruple, quintuple match.
pub const TIER_COUNT: usize = 5;
/// Length of a server-issued session identifier.
pub const SESSION_ID_LEN: usize = 10;

/// Wire value meaning "no wheel filter" in a draw listing request.
pub const WHEEL_UNSPECIFIED: u8 = 0xFF;

/// One of the 11 drawing wheels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Wheel {
    Bari = 0,
    Cagliari = 1,
    Firenze = 2,
    Genova = 3,
    Milano = 4,
    Napoli = 5,
    Palermo = 6,
    Roma = 7,
    Torino = 8,
    Venezia = 9,
    Nazionale = 10,
}

impl Wheel {
    pub const ALL: [Wheel; WHEEL_COUNT] = [
        Wheel::Bari,
        Wheel::Cagliari,
        Wheel::Firenze,
        Wheel::Genova,
        Wheel::Milano,
        Wheel::Napoli,
        Wheel::Palermo,
        Wheel::Roma,
        Wheel::Torino,
        Wheel::Venezia,
        Wheel::Nazionale,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Wheel> {
        Wheel::ALL.get(code as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Wheel> {
        match name {
            "bari" => Some(Wheel::Bari),
            "cagliari" => Some(Wheel::Cagliari),
            "firenze" => Some(Wheel::Firenze),
            "genova" => Some(Wheel::Genova),
            "milano" => Some(Wheel::Milano),
            "napoli" => Some(Wheel::Napoli),
            "palermo" => Some(Wheel::Palermo),
            "roma" => Some(Wheel::Roma),
            "torino" => Some(Wheel::Torino),
            "venezia" => Some(Wheel::Venezia),
            "nazionale" => Some(Wheel::Nazionale),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Wheel::Bari => "bari",
            Wheel::Cagliari => "cagliari",
            Wheel::Firenze => "firenze",
            Wheel::Genova => "genova",
            Wheel::Milano => "milano",
            Wheel::Napoli => "napoli",
            Wheel::Palermo => "palermo",
            Wheel::Roma => "roma",
            Wheel::Torino => "torino",
            Wheel::Venezia => "venezia",
            Wheel::Nazionale => "nazionale",
        }
    }
}

/// Fixed payout per euro staked for prize tier `tier` (0 = single match).
pub fn tier_multiplier(tier: usize) -> f64 {
    match tier {
        0 => 11.23,
        1 => 250.0,
        2 => 4500.0,
        3 => 120_000.0,
        4 => 6_000_000.0,
        _ => 1.0,
    }
}

/// A player's wager: chosen wheels, chosen numbers, and one stake per prize
/// tier the bettor opted into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub wheels: Vec<Wheel>,
    pub numbers: Vec<u32>,
    pub stakes: Vec<f64>,
}

impl Bet {
    /// Checks the bounds a submitted bet must satisfy. Stored records may
    /// violate the stake-count bound and are still decoded; this gate applies
    /// to new submissions only.
    pub fn validate(&self) -> Result<()> {
        if self.wheels.is_empty() || self.wheels.len() > WHEEL_COUNT {
            return Err(LottoError::invalid_bet("between 1 and 11 wheels required"));
        }
        let mut seen_wheels = [false; WHEEL_COUNT];
        for wheel in &self.wheels {
            let idx = wheel.code() as usize;
            if seen_wheels[idx] {
                return Err(LottoError::invalid_bet(format!(
                    "wheel '{}' played twice",
                    wheel.name()
                )));
            }
            seen_wheels[idx] = true;
        }

        if self.numbers.is_empty() || self.numbers.len() > MAX_BET_NUMBERS {
            return Err(LottoError::invalid_bet("between 1 and 10 numbers required"));
        }
        for (i, &n) in self.numbers.iter().enumerate() {
            if n < 1 || n > MAX_NUMBER {
                return Err(LottoError::invalid_bet(format!("number {} out of [1,90]", n)));
            }
            if self.numbers[..i].contains(&n) {
                return Err(LottoError::invalid_bet(format!("number {} played twice", n)));
            }
        }

        if self.stakes.is_empty() || self.stakes.len() > TIER_COUNT {
            return Err(LottoError::invalid_bet("between 1 and 5 stakes required"));
        }
        if self.stakes.len() > self.numbers.len() {
            return Err(LottoError::invalid_bet(
                "more stakes than played numbers",
            ));
        }
        // NaN compares false against everything; test finiteness explicitly.
        if self.stakes.iter().any(|&s| !s.is_finite() || s < 1.0) {
            return Err(LottoError::invalid_bet("stakes must be finite and at least 1"));
        }

        Ok(())
    }
}

/// One extraction: at `timestamp`, every wheel drew 5 distinct numbers.
/// `numbers[w]` holds the numbers of the wheel with code `w`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub timestamp: i64,
    pub numbers: [[u32; NUMBERS_PER_DRAW]; WHEEL_COUNT],
}

impl Draw {
    pub fn numbers_for(&self, wheel: Wheel) -> &[u32; NUMBERS_PER_DRAW] {
        &self.numbers[wheel.code() as usize]
    }
}

/// The outcome of one bet on one winning wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelOutcome {
    pub wheel: Wheel,
    /// Played numbers that also came up on this wheel, ascending.
    pub hits: Vec<u32>,
    /// Payout per evaluated tier, tier 0 first.
    pub payouts: Vec<f64>,
}

/// The winnings a single bet produced from its associated draw. Only wheels
/// with at least one hit appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinningsRecord {
    pub timestamp: i64,
    pub wheels: Vec<WheelOutcome>,
}

/// A bet as stored in a user ledger: the bet plus its submission timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: i64,
    pub bet: Bet,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_bet() -> Bet {
        Bet {
            wheels: vec![Wheel::Bari, Wheel::Nazionale],
            numbers: vec![4, 90, 17],
            stakes: vec![2.0, 1.5],
        }
    }

    #[test]
    fn valid_bet_passes() {
        base_bet().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_number() {
        let mut bet = base_bet();
        bet.numbers[1] = 91;
        assert!(bet.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_wheel_and_number() {
        let mut bet = base_bet();
        bet.wheels.push(Wheel::Bari);
        assert!(bet.validate().is_err());

        let mut bet = base_bet();
        bet.numbers.push(4);
        assert!(bet.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_and_undersized_stakes() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.5, -1.0] {
            let mut bet = base_bet();
            bet.stakes[1] = bad;
            assert!(bet.validate().is_err(), "stake {} should be rejected", bad);
        }
    }

    #[test]
    fn rejects_more_stakes_than_numbers() {
        let bet = Bet {
            wheels: vec![Wheel::Roma],
            numbers: vec![1, 2],
            stakes: vec![1.0, 1.0, 1.0],
        };
        assert!(bet.validate().is_err());
    }

    #[test]
    fn wheel_codes_round_trip() {
        for wheel in Wheel::ALL {
            assert_eq!(Wheel::from_code(wheel.code()), Some(wheel));
            assert_eq!(Wheel::from_name(wheel.name()), Some(wheel));
        }
        assert_eq!(Wheel::from_code(11), None);
        assert_eq!(Wheel::from_name("londra"), None);
    }
}
