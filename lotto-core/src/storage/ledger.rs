use crate::codec;
use crate::error::{LottoError, Result};
use crate::types::{Bet, LedgerEntry};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Size of the cursor header at the front of every ledger file.
pub const HEADER_LEN: u32 = 8;

/// Which slice of a ledger to read.
///
/// A ledger is divided by its two cursors into three chronological regions:
/// extracted records (covered by some draw), then records awaiting the next
/// draw. The winnings cursor lags the extraction cursor, marking how far
/// winnings evaluation has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWindow {
    /// Records already covered by a draw: `[HEADER_LEN, unextracted_from)`.
    Extracted,
    /// Records not yet covered by any draw: `[unextracted_from, end)`.
    Unextracted,
    /// Extracted records not yet evaluated for winnings:
    /// `[unchecked_from, unextracted_from)`.
    SinceLastCheck,
}

/// One user's append-only bet ledger.
///
/// File layout: two 4-byte LE cursor offsets (`unextracted_from`,
/// `unchecked_from`), then text records `"{timestamp} {encoded bet}|"`.
/// Invariant maintained by every mutator:
/// `HEADER_LEN <= unchecked_from <= unextracted_from <= file length`,
/// both cursors non-decreasing.
pub struct BetLedger {
    path: PathBuf,
}

impl BetLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates a fresh ledger whose cursors point at the (empty) end of file.
    pub fn create(path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&HEADER_LEN.to_le_bytes())?;
        file.write_all(&HEADER_LEN.to_le_bytes())?;
        Ok(())
    }

    pub fn len(&self) -> Result<u32> {
        Ok(std::fs::metadata(&self.path)?.len() as u32)
    }

    /// Returns `(unextracted_from, unchecked_from)`.
    pub fn cursors(&self) -> Result<(u32, u32)> {
        let mut file = std::fs::File::open(&self.path)?;
        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)?;
        let unextracted = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let unchecked = u32::from_le_bytes(header[4..8].try_into().unwrap());
        Ok((unextracted, unchecked))
    }

    pub fn append(&self, bet: &Bet, timestamp: i64) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        write!(file, "{} {}|", timestamp, codec::encode(bet))?;
        Ok(())
    }

    pub fn read_window(&self, window: LedgerWindow) -> Result<Vec<LedgerEntry>> {
        let (unextracted, unchecked) = self.cursors()?;
        let len = self.len()?;

        let (start, end) = match window {
            LedgerWindow::Extracted => (HEADER_LEN, unextracted),
            LedgerWindow::Unextracted => (unextracted, len),
            LedgerWindow::SinceLastCheck => (unchecked, unextracted),
        };
        if end <= start {
            return Ok(Vec::new());
        }

        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(start as u64))?;
        let mut raw = vec![0u8; (end - start) as usize];
        file.read_exact(&mut raw)?;
        let text = std::str::from_utf8(&raw)
            .map_err(|_| LottoError::malformed("ledger window is not valid UTF-8"))?;

        parse_records(text)
    }

    /// Moves the extraction cursor forward. Called only by the extraction
    /// pass, with the process-wide writer hold taken.
    pub fn advance_unextracted(&self, new_offset: u32) -> Result<()> {
        let (unextracted, _) = self.cursors()?;
        let len = self.len()?;
        if new_offset < unextracted || new_offset > len {
            return Err(LottoError::internal(format!(
                "extraction cursor {} outside [{}, {}]",
                new_offset, unextracted, len
            )));
        }
        self.write_cursor(0, new_offset)
    }

    /// Moves the winnings cursor forward. Called only after a winnings
    /// sweep, never past the extraction cursor.
    pub fn advance_unchecked(&self, new_offset: u32) -> Result<()> {
        let (unextracted, unchecked) = self.cursors()?;
        if new_offset < unchecked || new_offset > unextracted {
            return Err(LottoError::internal(format!(
                "winnings cursor {} outside [{}, {}]",
                new_offset, unchecked, unextracted
            )));
        }
        self.write_cursor(4, new_offset)
    }

    fn write_cursor(&self, field_offset: u64, value: u32) -> Result<()> {
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(field_offset))?;
        file.write_all(&value.to_le_bytes())?;
        Ok(())
    }
}

fn parse_records(mut text: &str) -> Result<Vec<LedgerEntry>> {
    let mut entries = Vec::new();
    while !text.is_empty() {
        let space = text
            .find(' ')
            .ok_or_else(|| LottoError::malformed("ledger record missing timestamp"))?;
        let timestamp: i64 = text[..space]
            .parse()
            .map_err(|_| LottoError::malformed("invalid ledger timestamp"))?;
        text = &text[space + 1..];

        let (bet, consumed) = codec::decode(text)?;
        if text.as_bytes().get(consumed) != Some(&b'|') {
            return Err(LottoError::malformed("ledger record missing terminator"));
        }
        text = &text[consumed + 1..];

        entries.push(LedgerEntry { timestamp, bet });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Wheel;
    use tempfile::tempdir;

    fn sample_bet(n: u32) -> Bet {
        Bet {
            wheels: vec![Wheel::Milano],
            numbers: vec![n],
            stakes: vec![1.0],
        }
    }

    fn fresh_ledger(dir: &Path) -> BetLedger {
        let path = dir.join("alice_bets.bin");
        BetLedger::create(&path).unwrap();
        BetLedger::new(path)
    }

    #[test]
    fn fresh_ledger_cursors_point_at_end() {
        let dir = tempdir().unwrap();
        let ledger = fresh_ledger(dir.path());
        assert_eq!(ledger.cursors().unwrap(), (HEADER_LEN, HEADER_LEN));
        assert_eq!(ledger.len().unwrap(), HEADER_LEN);
        assert!(ledger.read_window(LedgerWindow::Unextracted).unwrap().is_empty());
    }

    #[test]
    fn append_lands_in_unextracted_window() {
        let dir = tempdir().unwrap();
        let ledger = fresh_ledger(dir.path());

        ledger.append(&sample_bet(7), 100).unwrap();
        ledger.append(&sample_bet(8), 101).unwrap();

        let pending = ledger.read_window(LedgerWindow::Unextracted).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].timestamp, 100);
        assert_eq!(pending[0].bet, sample_bet(7));
        assert_eq!(pending[1].bet, sample_bet(8));

        assert!(ledger.read_window(LedgerWindow::Extracted).unwrap().is_empty());
    }

    #[test]
    fn cursor_invariant_holds_across_advances() {
        let dir = tempdir().unwrap();
        let ledger = fresh_ledger(dir.path());

        ledger.append(&sample_bet(1), 10).unwrap();
        let len = ledger.len().unwrap();

        // Extraction covers everything present.
        ledger.advance_unextracted(len).unwrap();
        let (unextracted, unchecked) = ledger.cursors().unwrap();
        assert_eq!(unextracted, len);
        assert_eq!(unchecked, HEADER_LEN);
        assert!(unchecked <= unextracted && unextracted <= ledger.len().unwrap());

        let checked_window = ledger.read_window(LedgerWindow::SinceLastCheck).unwrap();
        assert_eq!(checked_window.len(), 1);

        // Winnings check catches up to the extraction cursor.
        ledger.advance_unchecked(unextracted).unwrap();
        assert_eq!(ledger.cursors().unwrap(), (len, len));
        assert!(ledger.read_window(LedgerWindow::SinceLastCheck).unwrap().is_empty());
    }

    #[test]
    fn cursors_never_move_backward() {
        let dir = tempdir().unwrap();
        let ledger = fresh_ledger(dir.path());

        ledger.append(&sample_bet(1), 10).unwrap();
        let len = ledger.len().unwrap();
        ledger.advance_unextracted(len).unwrap();

        assert!(ledger.advance_unextracted(HEADER_LEN).is_err());
        assert!(ledger.advance_unchecked(len + 1).is_err());
        // Past the extraction cursor is also refused.
        ledger.append(&sample_bet(2), 11).unwrap();
        assert!(ledger.advance_unchecked(ledger.len().unwrap()).is_err());
    }

    #[test]
    fn corrupt_record_is_reported_not_panicked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice_bets.bin");
        BetLedger::create(&path).unwrap();
        let ledger = BetLedger::new(path.clone());

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "100 1 0 garbage|").unwrap();
        drop(file);

        assert!(matches!(
            ledger.read_window(LedgerWindow::Unextracted),
            Err(LottoError::MalformedRecord(_))
        ));
    }
}
