//! The packed struct represents the on-disk header block of a tar entry
use alloc::string::String;
use bytemuck::{Pod, Zeroable};
use core::mem;

use crate::{Entry, EntryType, Error, BLOCK_SIZE};

const CHECKSUM_OFFSET: usize = mem::offset_of!(Header, checksum);
const CHECKSUM_LEN: usize = 8;

/// Pre-POSIX (v7) header layout, one block long
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct Header {
    /// NUL-padded path
    pub name: [u8; 100],
    pub mode: [u8; 8],
    pub uid: [u8; 8],
    pub gid: [u8; 8],
    pub size: [u8; 12],
    pub mtime: [u8; 12],
    /// Six octal digits, NUL, space
    pub checksum: [u8; 8],
    pub typeflag: u8,
    pub link_name: [u8; 100],
    /// Remainder of the block, written as zeros and ignored on read
    pub padding: [u8; 255],
}

impl Header {
    /// View a header block without validation
    pub fn from_bytes(data: &[u8]) -> Result<&Header, Error> {
        Ok(bytemuck::try_from_bytes(data)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Encode an entry. The checksum is always recomputed.
    pub fn from_entry(entry: &Entry) -> Result<Header, Error> {
        let mut header = Header::zeroed();
        encode_str(&mut header.name, &entry.name, "name")?;
        encode_octal(&mut header.mode, entry.mode as u64, "mode")?;
        encode_octal(&mut header.uid, entry.uid as u64, "uid")?;
        encode_octal(&mut header.gid, entry.gid as u64, "gid")?;
        encode_octal(&mut header.size, entry.size, "size")?;
        encode_octal(&mut header.mtime, entry.mtime, "mtime")?;
        header.typeflag = entry.kind.as_byte();
        encode_str(&mut header.link_name, &entry.link_name, "link name")?;
        header.set_checksum();
        Ok(header)
    }

    /// Decode into an entry whose header block starts at `begin`
    pub fn to_entry(&self, begin: u64) -> Entry {
        Entry {
            name: decode_str(&self.name),
            mode: decode_octal(&self.mode) as u32,
            uid: decode_octal(&self.uid) as u32,
            gid: decode_octal(&self.gid) as u32,
            size: self.size(),
            mtime: decode_octal(&self.mtime),
            checksum: self.stored_checksum(),
            kind: self.kind(),
            link_name: decode_str(&self.link_name),
            begin,
        }
    }

    pub fn kind(&self) -> EntryType {
        EntryType::from_byte(self.typeflag)
    }

    pub fn size(&self) -> u64 {
        decode_octal(&self.size)
    }

    /// Sum of every byte in the block, counting the checksum field as spaces
    pub fn checksum(&self) -> u32 {
        let bytes = self.as_bytes();
        let sum = |range: &[u8]| range.iter().map(|b| *b as u32).sum::<u32>();
        sum(&bytes[..CHECKSUM_OFFSET])
            + sum(&bytes[CHECKSUM_OFFSET + CHECKSUM_LEN..])
            + b' ' as u32 * CHECKSUM_LEN as u32
    }

    pub fn stored_checksum(&self) -> u32 {
        decode_octal(&self.checksum) as u32
    }

    pub fn set_checksum(&mut self) {
        let sum = self.checksum();
        // A block sums to at most 512 * 255 = 0o377000, six digits always suffice
        let overflow = write_octal(&mut self.checksum[..6], sum as u64);
        debug_assert_eq!(overflow, 0);
        self.checksum[6] = 0;
        self.checksum[7] = b' ';
    }

    pub fn verify_checksum(&self) -> bool {
        self.stored_checksum() == self.checksum()
    }
}

/// Whether a block is entirely zero (half of an end-of-archive marker)
pub fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|b| *b == 0)
}

/// Parse a left-justified octal number, stopping at the first NUL or
/// non-octal byte. Leading spaces are skipped. Malformed input yields the
/// value accumulated so far.
pub fn decode_octal(field: &[u8]) -> u64 {
    field
        .iter()
        .skip_while(|b| **b == b' ')
        .take_while(|b| (b'0'..=b'7').contains(*b))
        .fold(0, |acc, b| (acc << 3) | (b - b'0') as u64)
}

/// Store `value` as zero-padded octal digits followed by a NUL
pub fn encode_octal(field: &mut [u8], value: u64, name: &'static str) -> Result<(), Error> {
    let Some((nul, digits)) = field.split_last_mut() else {
        return Err(Error::FieldOverflow { field: name, value });
    };
    if write_octal(digits, value) != 0 {
        return Err(Error::FieldOverflow { field: name, value });
    }
    *nul = 0;
    Ok(())
}

/// Fill `digits` right to left and return whatever did not fit
fn write_octal(digits: &mut [u8], value: u64) -> u64 {
    let mut rest = value;
    for slot in digits.iter_mut().rev() {
        *slot = b'0' + (rest & 0o7) as u8;
        rest >>= 3;
    }
    rest
}

fn encode_str(field: &mut [u8], value: &str, name: &'static str) -> Result<(), Error> {
    let bytes = value.as_bytes();
    if bytes.len() > field.len() {
        return Err(Error::NameTooLong {
            field: name,
            len: bytes.len(),
            max: field.len(),
        });
    }
    field[..bytes.len()].copy_from_slice(bytes);
    field[bytes.len()..].fill(0);
    Ok(())
}

/// Text up to the first NUL
fn decode_str(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

const _: () = assert!(mem::size_of::<Header>() == BLOCK_SIZE);

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use bytemuck::Zeroable;
    use core::mem;

    use super::{decode_octal, encode_octal, is_zero_block, Header};
    use crate::{Entry, EntryType, Error};

    fn sample() -> Entry {
        let mut entry = Entry::new("dir/file.txt", EntryType::Normal);
        entry.mode = 0o644;
        entry.uid = 1000;
        entry.gid = 100;
        entry.size = 1234;
        entry.mtime = 1_600_000_000;
        entry
    }

    #[test]
    fn field_offsets() {
        assert_eq!(mem::offset_of!(Header, name), 0);
        assert_eq!(mem::offset_of!(Header, mode), 100);
        assert_eq!(mem::offset_of!(Header, uid), 108);
        assert_eq!(mem::offset_of!(Header, gid), 116);
        assert_eq!(mem::offset_of!(Header, size), 124);
        assert_eq!(mem::offset_of!(Header, mtime), 136);
        assert_eq!(mem::offset_of!(Header, checksum), 148);
        assert_eq!(mem::offset_of!(Header, typeflag), 156);
        assert_eq!(mem::offset_of!(Header, link_name), 157);
    }

    #[test]
    fn octal_decoding() {
        assert_eq!(decode_octal(b"0000017"), 15);
        assert_eq!(decode_octal(b"0000000"), 0);
        assert_eq!(decode_octal(b"0000644\0"), 0o644);
        assert_eq!(decode_octal(b"   755 \0"), 0o755);
        assert_eq!(decode_octal(b"12x4"), 0o12);
        assert_eq!(decode_octal(b"\0\0\0"), 0);
    }

    #[test]
    fn octal_encoding() {
        let mut field = [0xff; 8];
        encode_octal(&mut field, 0o644, "mode").unwrap();
        assert_eq!(&field, b"0000644\0");

        let mut size = [0; 12];
        encode_octal(&mut size, 15, "size").unwrap();
        assert_eq!(&size, b"00000000017\0");

        assert!(matches!(
            encode_octal(&mut field, 0o10000000, "mode"),
            Err(Error::FieldOverflow { field: "mode", .. })
        ));
    }

    #[test]
    fn zeroed_checksum() {
        // Only the eight spaces standing in for the checksum field count
        let header = Header::zeroed();
        assert_eq!(header.checksum(), 256);
        assert!(is_zero_block(header.as_bytes()));
    }

    #[test]
    fn checksum_layout() {
        let header = Header::from_entry(&sample()).unwrap();
        assert_eq!(header.checksum[6], 0);
        assert_eq!(header.checksum[7], b' ');
        assert!(header.checksum[..6].iter().all(|b| b.is_ascii_digit()));
        assert!(header.verify_checksum());
    }

    #[test]
    fn checksum_survives_decode() {
        let header = Header::from_entry(&sample()).unwrap();
        let block = header.as_bytes();
        let view = Header::from_bytes(block).unwrap();
        let entry = view.to_entry(0);
        assert_eq!(entry.checksum, view.checksum());
        assert_eq!(Header::from_entry(&entry).unwrap().as_bytes(), block);
    }

    #[test]
    fn corruption_detected() {
        let mut header = Header::from_entry(&sample()).unwrap();
        header.name[0] = b'X';
        assert!(!header.verify_checksum());
    }

    #[test]
    fn decode_fields() {
        let entry = Header::from_entry(&sample()).unwrap().to_entry(2048);
        assert_eq!(entry.name, "dir/file.txt");
        assert_eq!(entry.mode, 0o644);
        assert_eq!(entry.uid, 1000);
        assert_eq!(entry.gid, 100);
        assert_eq!(entry.size, 1234);
        assert_eq!(entry.mtime, 1_600_000_000);
        assert_eq!(entry.kind, EntryType::Normal);
        assert_eq!(entry.begin, 2048);
    }

    #[test]
    fn full_length_name() {
        let name: String = core::iter::repeat('a').take(100).collect();
        let header = Header::from_entry(&Entry::new(name.clone(), EntryType::Normal)).unwrap();
        assert_eq!(header.to_entry(0).name, name);

        let long: String = core::iter::repeat('a').take(101).collect();
        assert!(matches!(
            Header::from_entry(&Entry::new(long, EntryType::Normal)),
            Err(Error::NameTooLong { len: 101, max: 100, .. })
        ));
    }

    #[test]
    fn short_slice_rejected() {
        assert!(Header::from_bytes(&[0; 100]).is_err());
    }
}
