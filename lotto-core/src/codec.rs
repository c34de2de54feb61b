//! Textual bet codec.
//!
//! A bet record is self-describing: three count-prefixed groups (wheels,
//! numbers, stakes), every value followed by a single space. The embedded
//! counts let the decoder consume exactly the right number of tokens without
//! an external length, so records can be concatenated in a ledger file.
//!
//! Example: a bet on wheels 0 and 10, numbers 4 90 17, stakes 2.00 and 1.50
//! encodes as `"2 0 10 3 4 90 17 2 2.00 1.50 "`.

use crate::error::{LottoError, Result};
use crate::types::{Bet, Wheel};
use std::fmt::Write as _;

/// Upper bound on any embedded count. Stored records may exceed the bet
/// validation bounds and must still decode, but a count beyond this is
/// corruption, not tolerance.
const MAX_GROUP_LEN: usize = 4096;

pub fn encode(bet: &Bet) -> String {
    let mut out = String::new();

    let _ = write!(out, "{} ", bet.wheels.len());
    for wheel in &bet.wheels {
        let _ = write!(out, "{} ", wheel.code());
    }

    let _ = write!(out, "{} ", bet.numbers.len());
    for n in &bet.numbers {
        let _ = write!(out, "{} ", n);
    }

    let _ = write!(out, "{} ", bet.stakes.len());
    for s in &bet.stakes {
        let _ = write!(out, "{:.2} ", s);
    }

    out
}

/// Decodes one bet record from the front of `input`, returning the bet and
/// how many bytes were consumed. Truncated or corrupted input yields
/// `MalformedRecord`; the decoder never reads past the declared counts.
pub fn decode(input: &str) -> Result<(Bet, usize)> {
    let mut cursor = TokenCursor::new(input);

    let wheel_count = cursor.next_count("wheel count")?;
    let mut wheels = Vec::with_capacity(wheel_count);
    for _ in 0..wheel_count {
        let code: u8 = cursor.next_parsed("wheel code")?;
        let wheel = Wheel::from_code(code)
            .ok_or_else(|| LottoError::malformed(format!("unknown wheel code {}", code)))?;
        wheels.push(wheel);
    }

    let number_count = cursor.next_count("number count")?;
    let mut numbers = Vec::with_capacity(number_count);
    for _ in 0..number_count {
        numbers.push(cursor.next_parsed("played number")?);
    }

    let stake_count = cursor.next_count("stake count")?;
    let mut stakes = Vec::with_capacity(stake_count);
    for _ in 0..stake_count {
        stakes.push(cursor.next_parsed("stake")?);
    }

    let bet = Bet {
        wheels,
        numbers,
        stakes,
    };
    Ok((bet, cursor.consumed()))
}

/// Walks whitespace-separated tokens while tracking the byte offset.
struct TokenCursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn consumed(&self) -> usize {
        self.pos
    }

    fn next_token(&mut self, what: &str) -> Result<&'a str> {
        let rest = &self.input[self.pos..];
        let skipped = rest.len() - rest.trim_start_matches(' ').len();
        let rest = &rest[skipped..];

        if rest.is_empty() {
            return Err(LottoError::malformed(format!(
                "record truncated before {}",
                what
            )));
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        let token = &rest[..end];
        // The trailing separator belongs to the token.
        self.pos += skipped + end + if end < rest.len() { 1 } else { 0 };
        Ok(token)
    }

    fn next_parsed<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|_| LottoError::malformed(format!("invalid {}: '{}'", what, token)))
    }

    fn next_count(&mut self, what: &str) -> Result<usize> {
        let count: usize = self.next_parsed(what)?;
        if count > MAX_GROUP_LEN {
            return Err(LottoError::malformed(format!(
                "{} {} exceeds limit",
                what, count
            )));
        }
        Ok(count)
    }
}
