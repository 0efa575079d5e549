//! In-memory archives for unit tests
use ustar_core::{padded_size, Entry, EntryType, Header, BLOCK_SIZE};

use crate::archive::record_boundary;

/// Header plus padded data for a regular file called `name`
pub fn file_entry(name: &str, data: &[u8]) -> Vec<u8> {
    let mut entry = Entry::new(name, EntryType::Normal);
    entry.size = data.len() as u64;
    entry.mode = 0o644;
    entry.mtime = 1_600_000_000;

    let mut bytes = Header::from_entry(&entry).unwrap().as_bytes().to_vec();
    bytes.extend_from_slice(data);
    bytes.resize(BLOCK_SIZE + padded_size(data.len() as u64) as usize, 0);
    bytes
}

/// `size` bytes of filler content for `name`, distinct per name
pub fn filler(name: &str, size: usize) -> Vec<u8> {
    name.bytes().cycle().take(size).collect()
}

/// Terminate `data` with the end-of-archive marker and pad it to a record
pub fn finish(mut data: Vec<u8>) -> Vec<u8> {
    data.extend_from_slice(&[0; 2 * BLOCK_SIZE]);
    let len = record_boundary(data.len() as u64) as usize;
    data.resize(len, 0);
    data
}

/// A finished archive holding one file per `(name, size)`
pub fn archive(files: &[(&str, usize)]) -> Vec<u8> {
    finish(
        files
            .iter()
            .flat_map(|&(name, size)| file_entry(name, &filler(name, size)))
            .collect(),
    )
}
