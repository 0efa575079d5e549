use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use log::{debug, info};
use ustar_core::{padded_size, Entry, EntryType, Header, Mode, BLOCK_SIZE, RECORD_SIZE};

use crate::ext::copy_exact;
use crate::{wrap_io_err, Archive, Error, READ_WRITE_BUF_SIZE};

static ZERO_RECORD: [u8; RECORD_SIZE] = [0; RECORD_SIZE];

/// Longest name a directory may have before its trailing `/` is dropped
const NAME_LEN: usize = 100;

/// An entry in the middle of being written. The path it was requested
/// under only lives here; once written, the plain [`Entry`] joins the index.
struct PendingEntry {
    entry: Entry,
    /// Path as given by the caller, used for hard link detection
    original_name: PathBuf,
    /// `original_name` resolved against the base directory
    source: PathBuf,
}

impl PendingEntry {
    /// Stat `original_name` (relative to `base_dir`) and fill in a header
    /// for it.
    fn new(base_dir: &Path, original_name: &Path) -> Result<PendingEntry, Error> {
        let source = base_dir.join(original_name);
        let metadata = fs::metadata(&source).map_err(wrap_io_err!(source, "Reading metadata"))?;

        let file_type = metadata.file_type();
        let kind = if file_type.is_file() {
            EntryType::Normal
        } else if file_type.is_dir() {
            EntryType::Directory
        } else if file_type.is_fifo() {
            EntryType::Fifo
        } else {
            return Err(Error::UnsupportedFileType { path: source });
        };

        let mut entry = Entry::new(
            stored_name(original_name, kind == EntryType::Directory),
            kind,
        );
        entry.mode = Mode::from_bits_truncate(metadata.mode()).perm().bits();
        entry.uid = metadata.uid();
        entry.gid = metadata.gid();
        entry.size = if kind == EntryType::Normal { metadata.len() } else { 0 };
        // Pre-epoch timestamps do not fit the unsigned field
        entry.mtime = u64::try_from(metadata.mtime()).unwrap_or(0);

        Ok(PendingEntry {
            entry,
            original_name: original_name.to_path_buf(),
            source,
        })
    }
}

impl fmt::Debug for PendingEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PendingEntry({:?} -> {})", self.original_name, self.entry)
    }
}

/// The name an entry for `original_name` is stored under: one leading `/`,
/// `./` or `../` is dropped, and directories end in `/` when it fits.
pub fn stored_name(original_name: &Path, is_dir: bool) -> String {
    let original = original_name.to_string_lossy();
    let mut name = ["/", "./", "../"]
        .iter()
        .find_map(|prefix| original.strip_prefix(prefix))
        .unwrap_or(&*original)
        .to_string();
    if is_dir && !name.ends_with('/') && name.len() < NAME_LEN {
        name.push('/');
    }
    name
}

/// Streams new entries onto the end of an archive, recording each one in
/// the index as soon as it is on disk.
struct ArchiveWriter<'a, W> {
    dest: &'a mut W,
    archive: &'a mut Archive,
    base_dir: &'a Path,
    /// Running write cursor
    offset: u64,
    /// Original name to stored name of every file whose contents were
    /// written during this pass
    written: HashMap<PathBuf, String>,
    buf: Vec<u8>,
}

impl<'a, W: Write> ArchiveWriter<'a, W> {
    fn write_entries<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), Error> {
        for path in paths {
            self.write_entry(path.as_ref())?;
        }
        Ok(())
    }

    fn write_entry(&mut self, original_name: &Path) -> Result<(), Error> {
        let PendingEntry {
            mut entry,
            original_name,
            source,
        } = PendingEntry::new(self.base_dir, original_name)?;
        entry.begin = self.offset;

        if entry.kind == EntryType::Directory {
            debug!("Writing {}", entry.name);
            self.write_header(&mut entry)?;
            self.offset += BLOCK_SIZE as u64;
            self.archive.push(entry);

            // Children follow their parent directly, depth first
            let mut children = fs::read_dir(&source)
                .map_err(wrap_io_err!(source, "Reading directory"))?
                .map(|child| child.map(|child| child.file_name()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(wrap_io_err!(source, "Reading directory"))?;
            children.sort();

            for child in children {
                self.write_entry(&original_name.join(child))?;
            }
            return Ok(());
        }

        let mut with_contents = entry.kind == EntryType::Normal;
        if with_contents {
            match self.written.get(&original_name) {
                Some(first) => {
                    debug!("Linking {} to {}", entry.name, first);
                    entry.kind = EntryType::HardLink;
                    entry.link_name = first.clone();
                    entry.size = 0;
                    with_contents = false;
                }
                None => {
                    self.written.insert(original_name, entry.name.clone());
                }
            }
        }

        debug!("Writing {}", entry.name);
        self.write_header(&mut entry)?;

        if with_contents {
            let file = File::open(&source).map_err(wrap_io_err!(source, "Opening source file"))?;
            let copied = copy_exact(file, &mut *self.dest, entry.size, &mut self.buf)
                .map_err(wrap_io_err!(source, "Copying into archive"))?;
            if copied != entry.size {
                return Err(Error::LengthMismatch {
                    path: source,
                    expected: entry.size,
                    actual: copied,
                });
            }
        }

        let pad = (padded_size(entry.size) - entry.size) as usize;
        self.dest
            .write_all(&ZERO_RECORD[..pad])
            .map_err(wrap_io_err!("Padding entry data"))?;

        self.offset += entry.span();
        self.archive.push(entry);
        Ok(())
    }

    fn write_header(&mut self, entry: &mut Entry) -> Result<(), Error> {
        let header = Header::from_entry(entry)?;
        entry.checksum = header.checksum();
        self.dest
            .write_all(header.as_bytes())
            .map_err(wrap_io_err!("Writing header"))
    }
}

/// Pad `dest` with zeros from `offset` to the next record boundary, adding a
/// whole extra record when the padding alone would not hold the two zero
/// blocks of the end-of-archive marker. Returns the final offset.
pub fn write_end_data<W: Write>(dest: &mut W, offset: u64) -> Result<u64, Error> {
    let mut pad = RECORD_SIZE - (offset % RECORD_SIZE as u64) as usize;
    dest.write_all(&ZERO_RECORD[..pad])
        .map_err(wrap_io_err!("Writing end of archive"))?;

    if pad < 2 * BLOCK_SIZE {
        dest.write_all(&ZERO_RECORD)
            .map_err(wrap_io_err!("Writing end of archive"))?;
        pad += RECORD_SIZE;
    }

    Ok(offset + pad as u64)
}

impl Archive {
    /// Append `paths` (resolved against `base_dir`, stored as given) after
    /// the last indexed entry, then terminate the archive. Directories are
    /// written recursively. A path given more than once is stored as a hard
    /// link to its first copy.
    ///
    /// Returns the final offset, which is the archive length when `dest`
    /// started out empty or held exactly this index.
    pub fn append<W, P>(
        &mut self,
        dest: &mut W,
        base_dir: impl AsRef<Path>,
        paths: &[P],
    ) -> Result<u64, Error>
    where
        W: Write + Seek,
        P: AsRef<Path>,
    {
        let start = self.end_offset();
        dest.seek(SeekFrom::Start(start))
            .map_err(wrap_io_err!("Seeking past last entry"))?;

        let count = self.len();
        let mut writer = ArchiveWriter {
            dest: &mut *dest,
            archive: &mut *self,
            base_dir: base_dir.as_ref(),
            offset: start,
            written: HashMap::new(),
            buf: vec![0; READ_WRITE_BUF_SIZE],
        };
        writer.write_entries(paths)?;
        let offset = writer.offset;

        let end = write_end_data(dest, offset)?;
        dest.flush().map_err(wrap_io_err!("Flushing archive"))?;

        info!("Appended {} entries, archive ends at {}", self.len() - count, end);
        Ok(end)
    }
}
