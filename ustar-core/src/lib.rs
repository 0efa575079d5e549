#![no_std]
extern crate alloc;

use core::mem;

pub use crate::entry::{Entry, EntryType};
pub use crate::error::Error;
pub use crate::header::{decode_octal, encode_octal, is_zero_block, Header};
pub use crate::mode::{Mode, DEFAULT_DIR_MODE, PERMISSION_TABLE};

mod entry;
mod error;
mod header;
mod mode;

/// Smallest addressable unit of a tar stream
pub const BLOCK_SIZE: usize = 512;
/// Blocks per record
pub const BLOCKING_FACTOR: usize = 20;
/// Archives are always padded to a whole number of records
pub const RECORD_SIZE: usize = BLOCK_SIZE * BLOCKING_FACTOR;

pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Round `size` up to the next block boundary.
pub const fn padded_size(size: u64) -> u64 {
    let rem = size % BLOCK_SIZE as u64;
    if rem == 0 {
        size
    } else {
        size + (BLOCK_SIZE as u64 - rem)
    }
}

#[cfg(test)]
mod tests {
    use core::mem;

    use crate::{padded_size, Header, BLOCK_SIZE, HEADER_SIZE, RECORD_SIZE};

    #[test]
    fn header_size() {
        assert_eq!(mem::size_of::<Header>(), 512);
        assert_eq!(HEADER_SIZE, BLOCK_SIZE);
    }

    #[test]
    fn record_size() {
        assert_eq!(RECORD_SIZE, 10240);
    }

    #[test]
    fn padding() {
        assert_eq!(padded_size(0), 0);
        assert_eq!(padded_size(1), 512);
        assert_eq!(padded_size(512), 512);
        assert_eq!(padded_size(513), 1024);
    }
}
