use crate::error::{LottoError, Result};
use crate::types::{Draw, Wheel, NUMBERS_PER_DRAW, WHEEL_COUNT};
use std::fs::OpenOptions;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// Bytes of one per-wheel record inside a draw block.
const WHEEL_RECORD_LEN: usize = 1 + NUMBERS_PER_DRAW * 4;
/// Bytes of one complete draw block: timestamp + all 11 wheel records.
pub const DRAW_BLOCK_LEN: usize = 8 + WHEEL_RECORD_LEN * WHEEL_COUNT;

/// The slice of a draw a listing returns: its timestamp plus the 5-number
/// record of each requested wheel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawSlice {
    pub timestamp: i64,
    pub wheels: Vec<(Wheel, [u32; NUMBERS_PER_DRAW])>,
}

/// Global append-only draw log: a flat sequence of fixed-size draw blocks,
/// totally ordered by append order and timestamp.
pub struct DrawLog {
    path: PathBuf,
}

impl DrawLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, draw: &Draw) -> Result<()> {
        let mut block = Vec::with_capacity(DRAW_BLOCK_LEN);
        block.extend_from_slice(&draw.timestamp.to_le_bytes());
        for wheel in Wheel::ALL {
            block.push(wheel.code());
            for &n in draw.numbers_for(wheel) {
                block.extend_from_slice(&n.to_le_bytes());
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&block)?;
        Ok(())
    }

    /// Number of draws stored so far.
    pub fn count(&self) -> Result<u64> {
        let len = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        if len % DRAW_BLOCK_LEN as u64 != 0 {
            return Err(LottoError::malformed(format!(
                "draw log length {} is not a multiple of {}",
                len, DRAW_BLOCK_LEN
            )));
        }
        Ok(len / DRAW_BLOCK_LEN as u64)
    }

    /// The most recent `n` draws, newest first, optionally filtered to one
    /// wheel. Returns what exists when `n` exceeds the stored count; an
    /// empty log is `EmptyLog`, which is distinct from an empty window.
    pub fn latest(&self, n: u32, wheel: Option<Wheel>) -> Result<Vec<DrawSlice>> {
        let stored = self.count()?;
        if stored == 0 {
            return Err(LottoError::EmptyLog);
        }
        let take = (n as u64).min(stored);

        let mut file = std::fs::File::open(&self.path)?;
        let mut block = [0u8; DRAW_BLOCK_LEN];
        let mut slices = Vec::with_capacity(take as usize);

        for back in 0..take {
            let index = stored - 1 - back;
            file.seek(SeekFrom::Start(index * DRAW_BLOCK_LEN as u64))?;
            file.read_exact(&mut block)?;
            let draw = parse_block(&block)?;

            let wheels = match wheel {
                Some(w) => vec![(w, *draw.numbers_for(w))],
                None => Wheel::ALL
                    .iter()
                    .map(|&w| (w, *draw.numbers_for(w)))
                    .collect(),
            };
            slices.push(DrawSlice {
                timestamp: draw.timestamp,
                wheels,
            });
        }
        Ok(slices)
    }

    /// Iterates the whole log forward, oldest draw first.
    pub fn iter(&self) -> Result<DrawIter> {
        // Validate the block alignment up front.
        self.count()?;
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => Some(f),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(DrawIter {
            reader: file.map(BufReader::new),
        })
    }
}

pub struct DrawIter {
    reader: Option<BufReader<std::fs::File>>,
}

impl Iterator for DrawIter {
    type Item = Result<Draw>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut block = [0u8; DRAW_BLOCK_LEN];
        match reader.read_exact(&mut block) {
            Ok(()) => Some(parse_block(&block)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

fn parse_block(block: &[u8; DRAW_BLOCK_LEN]) -> Result<Draw> {
    let timestamp = i64::from_le_bytes(block[0..8].try_into().unwrap());
    let mut numbers = [[0u32; NUMBERS_PER_DRAW]; WHEEL_COUNT];

    for (w, record) in block[8..].chunks_exact(WHEEL_RECORD_LEN).enumerate() {
        if record[0] as usize != w {
            return Err(LottoError::malformed(format!(
                "draw block carries wheel code {} at position {}",
                record[0], w
            )));
        }
        for (i, chunk) in record[1..].chunks_exact(4).enumerate() {
            numbers[w][i] = u32::from_le_bytes(chunk.try_into().unwrap());
        }
    }

    Ok(Draw { timestamp, numbers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn draw_at(timestamp: i64, first: u32) -> Draw {
        let mut numbers = [[0u32; NUMBERS_PER_DRAW]; WHEEL_COUNT];
        for (w, wheel_numbers) in numbers.iter_mut().enumerate() {
            for (i, n) in wheel_numbers.iter_mut().enumerate() {
                *n = first + (w as u32 * NUMBERS_PER_DRAW as u32 + i as u32) % 90;
            }
        }
        Draw { timestamp, numbers }
    }

    #[test]
    fn empty_log_is_distinct_from_empty_result() {
        let dir = tempdir().unwrap();
        let log = DrawLog::new(dir.path().join("draws.bin"));
        assert_eq!(log.count().unwrap(), 0);
        assert!(matches!(log.latest(3, None), Err(LottoError::EmptyLog)));
    }

    #[test]
    fn append_then_read_back() {
        let dir = tempdir().unwrap();
        let log = DrawLog::new(dir.path().join("draws.bin"));
        let draw = draw_at(500, 1);

        log.append(&draw).unwrap();
        assert_eq!(log.count().unwrap(), 1);

        let all: Vec<_> = log.iter().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(all, vec![draw]);
    }

    #[test]
    fn latest_is_newest_first_and_tolerates_large_n() {
        let dir = tempdir().unwrap();
        let log = DrawLog::new(dir.path().join("draws.bin"));
        log.append(&draw_at(100, 1)).unwrap();
        log.append(&draw_at(200, 2)).unwrap();

        // Asking for 3 with only 2 stored returns exactly 2.
        let slices = log.latest(3, None).unwrap();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].timestamp, 200);
        assert_eq!(slices[1].timestamp, 100);
        assert_eq!(slices[0].wheels.len(), WHEEL_COUNT);
    }

    #[test]
    fn latest_filters_to_one_wheel() {
        let dir = tempdir().unwrap();
        let log = DrawLog::new(dir.path().join("draws.bin"));
        let draw = draw_at(100, 1);
        log.append(&draw).unwrap();

        let slices = log.latest(1, Some(Wheel::Roma)).unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(
            slices[0].wheels,
            vec![(Wheel::Roma, *draw.numbers_for(Wheel::Roma))]
        );
    }
}
