//! Fault-injecting file double
//!
//! `FaultyVolume` hands out `FaultyFile` handles that share one in-memory backing buffer.
//! Every call is recorded as a [`FileOp`], so tests can check ordering (seek before read),
//! count flushes and closes, and inspect the bytes that actually landed on "disk".
//!
//! Faults are keyed by write cycle: cycle `n` starts with the `n`-th `write_block` call
//! (zero-based) and covers the seek, read and flush that follow it. [`Fault::FailTell`] is
//! keyed by `tell` call instead, since a failed `tell` means no write follows.

use busprobe_core::storage::{BlockFile, Volume};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One recorded file operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    Open(PathBuf),
    Tell(u64),
    /// `len` is the number of bytes that reached the buffer
    Write { pos: u64, len: usize },
    Seek(u64),
    /// `len` is the number of bytes handed back
    Read { pos: u64, len: usize },
    Flush,
    Close,
}

/// A fault injected into one write cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The `n`-th `tell` call returns an error
    FailTell,
    /// `write_block` returns an error and stores nothing
    FailWrite,
    /// Only the first `n` bytes are stored and reported
    ShortWrite(usize),
    /// The last byte is silently dropped while the full length is reported
    DropLastByte,
    /// The stored byte at `index` inside the block is flipped after the write lands
    CorruptAfterWrite { index: usize },
    /// `seek_to` returns an error and leaves the cursor where it is
    FailSeek,
    /// `read_block` returns an error
    FailRead,
    /// Only the first `n` bytes are read
    ShortRead(usize),
    /// `flush` returns an error
    FailFlush,
}

/// Faults to inject, by write cycle
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    faults: HashMap<u64, Vec<Fault>>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject `fault` into write cycle `cycle`
    pub fn at(mut self, cycle: u64, fault: Fault) -> Self {
        self.faults.entry(cycle).or_default().push(fault);
        self
    }

    fn has(&self, cycle: u64, fault: &Fault) -> bool {
        self.faults
            .get(&cycle)
            .map(|faults| faults.contains(fault))
            .unwrap_or(false)
    }

    fn find<T>(&self, cycle: u64, pick: impl Fn(&Fault) -> Option<T>) -> Option<T> {
        self.faults.get(&cycle)?.iter().find_map(pick)
    }
}

/// Shared state behind every handle of a `FaultyVolume`
#[derive(Debug, Default)]
pub struct FileState {
    /// Backing bytes of the single file
    pub data: Vec<u8>,
    /// Cursor shared by all handles
    pub pos: u64,
    /// Every operation, in call order
    pub ops: Vec<FileOp>,
    /// `write_block` calls so far
    pub writes: u64,
    /// `tell` calls so far
    pub tells: u64,
}

impl FileState {
    fn cycle(&self) -> u64 {
        self.writes.saturating_sub(1)
    }

    fn count(&self, pred: impl Fn(&FileOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn opens(&self) -> usize {
        self.count(|op| matches!(op, FileOp::Open(_)))
    }

    pub fn closes(&self) -> usize {
        self.count(|op| matches!(op, FileOp::Close))
    }

    pub fn flushes(&self) -> usize {
        self.count(|op| matches!(op, FileOp::Flush))
    }

    pub fn write_calls(&self) -> usize {
        self.count(|op| matches!(op, FileOp::Write { .. }))
    }

    pub fn read_calls(&self) -> usize {
        self.count(|op| matches!(op, FileOp::Read { .. }))
    }
}

/// In-memory volume holding one file
#[derive(Debug, Clone)]
pub struct FaultyVolume {
    state: Arc<Mutex<FileState>>,
    plan: Arc<FaultPlan>,
    open_error: Option<io::ErrorKind>,
}

impl FaultyVolume {
    /// Volume whose file starts as `size` zero bytes
    pub fn new(size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(FileState {
                data: vec![0; size],
                ..Default::default()
            })),
            plan: Arc::new(FaultPlan::new()),
            open_error: None,
        }
    }

    pub fn with_plan(mut self, plan: FaultPlan) -> Self {
        self.plan = Arc::new(plan);
        self
    }

    /// Make every open fail with `kind`
    pub fn failing_open(mut self, kind: io::ErrorKind) -> Self {
        self.open_error = Some(kind);
        self
    }

    /// Shared state, for assertions after the handle is gone
    pub fn state(&self) -> Arc<Mutex<FileState>> {
        Arc::clone(&self.state)
    }

    /// Copy of the recorded operations
    pub fn ops(&self) -> Vec<FileOp> {
        self.state.lock().ops.clone()
    }

    /// Copy of the backing bytes
    pub fn data(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes()
    }

    pub fn flushes(&self) -> usize {
        self.state.lock().flushes()
    }

    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls()
    }
}

impl Volume for FaultyVolume {
    type File = FaultyFile;

    fn open_for_update(&self, path: &Path) -> io::Result<FaultyFile> {
        if let Some(kind) = self.open_error {
            return Err(io::Error::new(kind, format!("injected open failure for {}", path.display())));
        }

        self.state.lock().ops.push(FileOp::Open(path.to_path_buf()));
        Ok(FaultyFile {
            state: Arc::clone(&self.state),
            plan: Arc::clone(&self.plan),
        })
    }
}

/// Handle into a `FaultyVolume`
#[derive(Debug)]
pub struct FaultyFile {
    state: Arc<Mutex<FileState>>,
    plan: Arc<FaultPlan>,
}

fn injected(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("injected {} failure", what))
}

impl BlockFile for FaultyFile {
    fn tell(&mut self) -> io::Result<u64> {
        let mut state = self.state.lock();
        let call = state.tells;
        state.tells += 1;
        if self.plan.has(call, &Fault::FailTell) {
            return Err(injected("tell"));
        }
        let pos = state.pos;
        state.ops.push(FileOp::Tell(pos));
        Ok(pos)
    }

    fn write_block(&mut self, block: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let cycle = state.writes;
        state.writes += 1;
        let pos = state.pos;

        if self.plan.has(cycle, &Fault::FailWrite) {
            state.ops.push(FileOp::Write { pos, len: 0 });
            return Err(injected("write"));
        }

        let short = self.plan.find(cycle, |f| match f {
            Fault::ShortWrite(n) => Some((*n).min(block.len())),
            _ => None,
        });
        let drop_last = self.plan.has(cycle, &Fault::DropLastByte);

        let (stored, reported) = match short {
            Some(n) => (n, n),
            None if drop_last => (block.len().saturating_sub(1), block.len()),
            None => (block.len(), block.len()),
        };

        let start = pos as usize;
        if state.data.len() < start + stored {
            state.data.resize(start + stored, 0);
        }
        state.data[start..start + stored].copy_from_slice(&block[..stored]);

        if let Some(index) = self.plan.find(cycle, |f| match f {
            Fault::CorruptAfterWrite { index } => Some(*index),
            _ => None,
        }) {
            if let Some(byte) = state.data.get_mut(start + index) {
                *byte ^= 0xFF;
            }
        }

        state.pos = pos + reported as u64;
        state.ops.push(FileOp::Write { pos, len: stored });
        Ok(reported)
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        let mut state = self.state.lock();
        if self.plan.has(state.cycle(), &Fault::FailSeek) {
            return Err(injected("seek"));
        }
        state.pos = pos;
        state.ops.push(FileOp::Seek(pos));
        Ok(())
    }

    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let cycle = state.cycle();
        let pos = state.pos;

        if self.plan.has(cycle, &Fault::FailRead) {
            state.ops.push(FileOp::Read { pos, len: 0 });
            return Err(injected("read"));
        }

        let start = (pos as usize).min(state.data.len());
        let available = state.data.len() - start;
        let mut len = buf.len().min(available);
        if let Some(n) = self.plan.find(cycle, |f| match f {
            Fault::ShortRead(n) => Some(*n),
            _ => None,
        }) {
            len = len.min(n);
        }

        buf[..len].copy_from_slice(&state.data[start..start + len]);
        state.pos = pos + len as u64;
        state.ops.push(FileOp::Read { pos, len });
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        if self.plan.has(state.cycle(), &Fault::FailFlush) {
            return Err(injected("flush"));
        }
        state.ops.push(FileOp::Flush);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.lock().ops.push(FileOp::Close);
        Ok(())
    }
}
