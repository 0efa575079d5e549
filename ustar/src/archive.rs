use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use log::{debug, warn};
use ustar_core::{is_zero_block, Entry, Header, BLOCK_SIZE, RECORD_SIZE};

use crate::ext::read_block;
use crate::{wrap_io_err, Error};

/// Random access storage an archive can be rewritten in place on.
pub trait ArchiveStorage: Read + Write + Seek {
    /// Truncate or extend the underlying storage to `len` bytes
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl ArchiveStorage for File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

impl ArchiveStorage for Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

/// In-memory index of a tar archive: every entry in on-disk order, plus a
/// lookup from stored name to position.
#[derive(Debug, Default)]
pub struct Archive {
    entries: Vec<Entry>,
    /// Name to position of the last entry carrying it
    index: HashMap<String, usize>,
}

impl Archive {
    pub fn new() -> Archive {
        Archive::default()
    }

    /// Scan `src` from its start into a new index.
    pub fn read<R: Read + Seek>(src: &mut R) -> Result<Archive, Error> {
        let mut archive = Archive::new();
        archive.read_into(src)?;
        Ok(archive)
    }

    /// Scan `src` from its start into this (empty) index, returning the
    /// number of entries found.
    ///
    /// Only headers are read; data is framed by each header's size and
    /// skipped. The scan ends successfully at the end-of-archive marker (two
    /// zero blocks) or at a short read.
    pub fn read_into<R: Read + Seek>(&mut self, src: &mut R) -> Result<usize, Error> {
        if !self.is_empty() {
            return Err(Error::BadArchive("index must be empty before reading"));
        }

        src.seek(SeekFrom::Start(0))
            .map_err(wrap_io_err!("Seeking to archive start"))?;

        let mut offset = 0u64;
        let mut block = [0; BLOCK_SIZE];
        loop {
            if read_block(src, &mut block).map_err(wrap_io_err!("Reading header"))? != BLOCK_SIZE {
                debug!("Archive ends without an end marker at offset {}", offset);
                break;
            }

            if is_zero_block(&block) {
                if read_block(src, &mut block).map_err(wrap_io_err!("Reading header"))? != BLOCK_SIZE {
                    debug!("Archive ends after a lone zero block at offset {}", offset);
                    break;
                }

                if is_zero_block(&block) {
                    let end = offset + 2 * BLOCK_SIZE as u64;
                    src.seek(SeekFrom::Start(record_boundary(end)))
                        .map_err(wrap_io_err!("Seeking to end of record"))?;
                    break;
                }

                // A lone zero block; the second one is the next header
                offset += BLOCK_SIZE as u64;
            }

            let header = Header::from_bytes(&block)?;
            let entry = header.to_entry(offset);
            if !header.verify_checksum() {
                warn!(
                    "Checksum mismatch for '{}' at offset {}: stored {:o}, computed {:o}",
                    entry.name,
                    offset,
                    entry.checksum,
                    header.checksum()
                );
            }

            let skip = entry.span() - BLOCK_SIZE as u64;
            offset += entry.span();
            src.seek(SeekFrom::Current(skip as i64))
                .map_err(wrap_io_err!("Skipping entry data"))?;

            debug!("{}", entry);
            self.push(entry);
        }

        Ok(self.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The last entry stored under `name` (exact match)
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn exists(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entries whose name is one of `names`, or every entry when `names` is
    /// empty
    pub fn select<'a, S: AsRef<str>>(&'a self, names: &'a [S]) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| names.is_empty() || check_match(entry, names))
    }

    /// Offset just past the last entry's data, where new entries go
    pub fn end_offset(&self) -> u64 {
        self.entries.last().map(Entry::end).unwrap_or(0)
    }

    pub(crate) fn push(&mut self, entry: Entry) {
        self.index.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Swap in a new entry list (already in on-disk order) and rebuild the
    /// name lookup.
    pub(crate) fn replace_entries(&mut self, entries: Vec<Entry>) {
        self.entries = entries;
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.name.clone(), i))
            .collect();
    }
}

/// Whether `entry` is named by any of `names`
pub(crate) fn check_match<S: AsRef<str>>(entry: &Entry, names: &[S]) -> bool {
    names.iter().any(|name| name.as_ref() == entry.name)
}

/// Round `offset` up to the next record boundary
pub(crate) fn record_boundary(offset: u64) -> u64 {
    offset.div_ceil(RECORD_SIZE as u64) * RECORD_SIZE as u64
}
