//! Structured view of an archived object
use alloc::string::String;
use core::fmt::{self, Display};

use crate::{padded_size, Mode, BLOCK_SIZE};

/// Type flag of a header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Pre-POSIX regular file (`\0`)
    Regular,
    Normal,
    HardLink,
    SymLink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    Contiguous,
    /// Unknown flag, kept so the header can still be framed
    Other(u8),
}

impl EntryType {
    pub fn from_byte(flag: u8) -> EntryType {
        match flag {
            0 => EntryType::Regular,
            b'0' => EntryType::Normal,
            b'1' => EntryType::HardLink,
            b'2' => EntryType::SymLink,
            b'3' => EntryType::CharDevice,
            b'4' => EntryType::BlockDevice,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'7' => EntryType::Contiguous,
            other => EntryType::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            EntryType::Regular => 0,
            EntryType::Normal => b'0',
            EntryType::HardLink => b'1',
            EntryType::SymLink => b'2',
            EntryType::CharDevice => b'3',
            EntryType::BlockDevice => b'4',
            EntryType::Directory => b'5',
            EntryType::Fifo => b'6',
            EntryType::Contiguous => b'7',
            EntryType::Other(flag) => flag,
        }
    }

    /// Whether entries of this type carry file contents that extract to a
    /// regular file
    pub fn is_file(self) -> bool {
        matches!(
            self,
            EntryType::Regular | EntryType::Normal | EntryType::Contiguous
        )
    }

    /// First character of an `ls -l` style listing
    pub fn ls_char(self) -> char {
        match self {
            EntryType::HardLink => 'h',
            EntryType::SymLink => 'l',
            EntryType::CharDevice => 'c',
            EntryType::BlockDevice => 'b',
            EntryType::Directory => 'd',
            EntryType::Fifo => 'p',
            _ => '-',
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EntryType::Regular | EntryType::Normal => "Normal File",
            EntryType::HardLink => "Hard Link",
            EntryType::SymLink => "Symbolic Link",
            EntryType::CharDevice => "Character Special",
            EntryType::BlockDevice => "Block Special",
            EntryType::Directory => "Directory",
            EntryType::Fifo => "FIFO",
            EntryType::Contiguous => "Contiguous File",
            EntryType::Other(_) => "Unknown",
        }
    }
}

/// One archived object, decoded from (or destined for) a header block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Path as stored in the archive, directories end in `/`
    pub name: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Length of the data following the header
    pub size: u64,
    /// Modification time in Unix seconds
    pub mtime: u64,
    /// Checksum as read from the header, or as computed when it was encoded
    pub checksum: u32,
    pub kind: EntryType,
    pub link_name: String,
    /// Offset of the header block within the archive
    pub begin: u64,
}

impl Entry {
    pub fn new(name: impl Into<String>, kind: EntryType) -> Entry {
        Entry {
            name: name.into(),
            mode: 0,
            uid: 0,
            gid: 0,
            size: 0,
            mtime: 0,
            checksum: 0,
            kind,
            link_name: String::new(),
            begin: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_bits_truncate(self.mode)
    }

    /// Offset of the first data byte
    pub fn data_offset(&self) -> u64 {
        self.begin + BLOCK_SIZE as u64
    }

    /// Header plus block-padded data
    pub fn span(&self) -> u64 {
        BLOCK_SIZE as u64 + padded_size(self.size)
    }

    /// Offset just past this entry's padded data
    pub fn end(&self) -> u64 {
        self.begin + self.span()
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={:?} type={} begin={} size={} mode={:o}",
            self.name,
            self.kind.description(),
            self.begin,
            self.size,
            self.mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryType};

    #[test]
    fn type_flags() {
        for flag in [0, b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'x'] {
            assert_eq!(EntryType::from_byte(flag).as_byte(), flag);
        }
        assert_eq!(EntryType::from_byte(b'x'), EntryType::Other(b'x'));
    }

    #[test]
    fn span() {
        let mut entry = Entry::new("a", EntryType::Normal);
        entry.begin = 1024;
        assert_eq!(entry.span(), 512);
        entry.size = 1;
        assert_eq!(entry.span(), 1024);
        assert_eq!(entry.data_offset(), 1536);
        assert_eq!(entry.end(), 2048);
    }
}
