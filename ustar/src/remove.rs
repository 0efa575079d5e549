use std::io::SeekFrom;

use log::{debug, info};
use ustar_core::BLOCK_SIZE;

use crate::archive::check_match;
use crate::ext::read_block;
use crate::{wrap_io_err, Archive, ArchiveStorage, Error};

/// Move `len` bytes at `from` down to `to` (`to < from`), one block at a time.
fn shift<S>(storage: &mut S, from: u64, to: u64, len: u64, block: &mut [u8; BLOCK_SIZE]) -> Result<(), Error>
where
    S: ArchiveStorage + ?Sized,
{
    let mut done = 0;
    while done < len {
        let want = (len - done).min(BLOCK_SIZE as u64) as usize;

        storage
            .seek(SeekFrom::Start(from + done))
            .map_err(wrap_io_err!("Seeking to entry"))?;
        if read_block(storage, &mut block[..want]).map_err(wrap_io_err!("Reading entry"))? != want {
            return Err(Error::BadArchive("entry data runs past the end of the archive"));
        }

        storage
            .seek(SeekFrom::Start(to + done))
            .map_err(wrap_io_err!("Seeking to entry destination"))?;
        storage
            .write_all(&block[..want])
            .map_err(wrap_io_err!("Writing entry"))?;

        done += want as u64;
    }
    Ok(())
}

impl Archive {
    /// Delete every entry stored under one of `names`, compacting the
    /// archive in place: survivors move down over the gaps, the end of
    /// archive data follows them, and the storage is truncated.
    ///
    /// Returns the new archive length. Nothing is modified if a name is not
    /// in the archive. An interrupted compaction leaves the storage half
    /// shifted; the archive must be read again.
    pub fn remove<S, N>(&mut self, storage: &mut S, names: &[N]) -> Result<u64, Error>
    where
        S: ArchiveStorage + ?Sized,
        N: AsRef<str>,
    {
        let len = storage
            .seek(SeekFrom::End(0))
            .map_err(wrap_io_err!("Seeking to archive end"))?;

        if names.is_empty() {
            return Ok(len);
        }
        if self.is_empty() {
            return Err(Error::BadArchive("cannot remove from an empty archive"));
        }
        if let Some(missing) = names.iter().find(|name| !self.exists(name.as_ref())) {
            return Err(Error::NotFound(missing.as_ref().to_string()));
        }

        let mut block = [0; BLOCK_SIZE];
        let mut write_offset = 0;
        let mut survivors = Vec::with_capacity(self.len());

        for entry in self.entries() {
            if check_match(entry, names) {
                debug!("Removing {}", entry);
                continue;
            }

            let span = entry.span();
            if write_offset < entry.begin {
                debug!("Moving {} from {} to {}", entry.name, entry.begin, write_offset);
                shift(storage, entry.begin, write_offset, span, &mut block)?;
            }

            let mut entry = entry.clone();
            entry.begin = write_offset;
            write_offset += span;
            survivors.push(entry);
        }

        let read_offset = self.end_offset();
        let trailer = len.saturating_sub(read_offset);
        if write_offset < read_offset {
            shift(storage, read_offset, write_offset, trailer, &mut block)?;
        }

        let new_len = write_offset + trailer;
        storage
            .set_len(new_len)
            .map_err(wrap_io_err!("Truncating archive"))?;
        storage.flush().map_err(wrap_io_err!("Flushing archive"))?;

        info!(
            "Removed {} entries, archive shrank from {} to {} bytes",
            self.len() - survivors.len(),
            len,
            new_len
        );
        self.replace_entries(survivors);
        Ok(new_len)
    }
}
