//! Filesystem collaborator interface
//!
//! The integrity worker only needs a small POSIX-like surface: open an existing file for
//! update, then tell/write/seek/read/flush/close on the handle. Host volumes, test doubles
//! and fault injectors all implement these two traits.

use std::io;
use std::path::Path;

/// Size of one integrity block
pub const BLOCK_SIZE: usize = 1024;

/// An open file handle with an explicit cursor
pub trait BlockFile: Send {
    /// Current cursor position
    fn tell(&mut self) -> io::Result<u64>;

    /// Write `block` at the cursor, returning the number of bytes the device accepted.
    ///
    /// Implementations transfer the whole block unless the device fails; a count below
    /// `block.len()` is a short write.
    fn write_block(&mut self, block: &[u8]) -> io::Result<usize>;

    /// Move the cursor to an absolute position
    fn seek_to(&mut self, pos: u64) -> io::Result<()>;

    /// Read into `buf` from the cursor, returning the number of bytes read.
    ///
    /// Fills the whole buffer unless the device fails or the file ends.
    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Force buffered writer state to the underlying device
    fn flush(&mut self) -> io::Result<()>;

    /// Release the handle. Called exactly once per opened file.
    fn close(&mut self) -> io::Result<()>;
}

/// A mounted volume that hands out file handles
pub trait Volume: Send + Sync {
    type File: BlockFile;

    /// Open an existing file for reading and writing. Never creates the file.
    fn open_for_update(&self, path: &Path) -> io::Result<Self::File>;
}

impl<V: Volume + ?Sized> Volume for std::sync::Arc<V> {
    type File = V::File;

    fn open_for_update(&self, path: &Path) -> io::Result<Self::File> {
        (**self).open_for_update(path)
    }
}
