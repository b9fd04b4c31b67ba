//! Custom assertions for testing
//!
//! Checks on recorded file operation sequences and arena contents.

use crate::mock::FileOp;

/// Assert that every read is preceded, within its write cycle, by a seek back to the
/// position the cycle's write started at
pub fn assert_seek_precedes_read(ops: &[FileOp]) {
    let mut write_pos: Option<u64> = None;
    let mut seeked_to: Option<u64> = None;

    for (index, op) in ops.iter().enumerate() {
        match op {
            FileOp::Write { pos, .. } => {
                write_pos = Some(*pos);
                seeked_to = None;
            }
            FileOp::Seek(pos) => seeked_to = Some(*pos),
            FileOp::Read { pos, .. } => {
                let expected = write_pos
                    .unwrap_or_else(|| panic!("read at op #{} happened before any write", index));
                assert_eq!(
                    seeked_to,
                    Some(expected),
                    "read at op #{} was not preceded by a seek to the write position {}",
                    index,
                    expected
                );
                assert_eq!(*pos, expected, "read at op #{} started at the wrong offset", index);
            }
            _ => {}
        }
    }
}

/// Assert that the handle was closed exactly once and that nothing touched it afterwards
pub fn assert_closed_once(ops: &[FileOp]) {
    let closes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, FileOp::Close))
        .map(|(i, _)| i)
        .collect();

    assert_eq!(closes.len(), 1, "expected exactly one close, got {}", closes.len());
    assert_eq!(
        closes[0],
        ops.len() - 1,
        "operations recorded after close: {:?}",
        &ops[closes[0] + 1..]
    );
}

/// Assert that one full clean iteration consists of tell, write, seek, read, flush
pub fn assert_clean_iterations(ops: &[FileOp], iterations: usize) {
    let body: Vec<&FileOp> = ops
        .iter()
        .filter(|op| !matches!(op, FileOp::Open(_) | FileOp::Close))
        .collect();

    assert_eq!(
        body.len(),
        iterations * 5,
        "expected {} operations for {} clean iterations",
        iterations * 5,
        iterations
    );

    for (i, chunk) in body.chunks(5).enumerate() {
        let tell = match chunk[0] {
            FileOp::Tell(pos) => *pos,
            other => panic!("iteration {} started with {:?} instead of tell", i, other),
        };
        assert!(
            matches!(chunk[1], FileOp::Write { pos, .. } if *pos == tell),
            "iteration {}: expected write at {}, got {:?}",
            i,
            tell,
            chunk[1]
        );
        assert_eq!(chunk[2], &FileOp::Seek(tell), "iteration {}: bad seek", i);
        assert!(
            matches!(chunk[3], FileOp::Read { pos, .. } if *pos == tell),
            "iteration {}: expected read at {}, got {:?}",
            i,
            tell,
            chunk[3]
        );
        assert_eq!(chunk[4], &FileOp::Flush, "iteration {}: missing flush", i);
    }
}

/// Assert that every byte in `bytes` equals `value`
pub fn assert_uniform_fill(bytes: &[u8], value: u8) {
    if let Some(index) = bytes.iter().position(|&b| b != value) {
        panic!(
            "byte {} is 0x{:02X}, expected every byte to be 0x{:02X}",
            index, bytes[index], value
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_precedes_read_accepts_clean_cycle() {
        let ops = vec![
            FileOp::Tell(0),
            FileOp::Write { pos: 0, len: 4 },
            FileOp::Seek(0),
            FileOp::Read { pos: 0, len: 4 },
            FileOp::Flush,
        ];
        assert_seek_precedes_read(&ops);
        assert_clean_iterations(&ops, 1);
    }

    #[test]
    #[should_panic(expected = "not preceded by a seek")]
    fn test_seek_precedes_read_rejects_missing_seek() {
        let ops = vec![FileOp::Write { pos: 0, len: 4 }, FileOp::Read { pos: 4, len: 4 }];
        assert_seek_precedes_read(&ops);
    }

    #[test]
    #[should_panic(expected = "expected exactly one close")]
    fn test_closed_once_rejects_double_close() {
        assert_closed_once(&[FileOp::Close, FileOp::Close]);
    }

    #[test]
    #[should_panic(expected = "byte 3")]
    fn test_uniform_fill_reports_first_odd_byte() {
        assert_uniform_fill(&[1, 1, 1, 2], 1);
    }
}
