//! Extension traits for base types defined in `ustar-core`, plus the block
//! level I/O helpers shared by the engine.
use std::io::{self, Read, Write};
use std::path::{Component, Path};

use ustar_core::Entry;

use crate::Error;

pub trait EntryExt {
    fn check_path(&self) -> Result<&Path, Error>;
}

impl EntryExt for Entry {
    /// Iterate the components of the stored name and ensure that there are
    /// no components other than normal ones and `.`, and at least one
    /// normal one.
    fn check_path(&self) -> Result<&Path, Error> {
        let path = Path::new(&self.name);
        let mut normal = 0;
        for component in path.components() {
            match component {
                Component::Normal(_) => normal += 1,
                // `tar -cf x.tar .` stores every name under `./`
                Component::CurDir => {}
                invalid => {
                    let bad_component: &Path = invalid.as_ref();
                    return Err(Error::InvalidPath {
                        entry: path.to_path_buf(),
                        component: bad_component.to_path_buf(),
                    });
                }
            }
        }
        if normal == 0 {
            return Err(Error::InvalidPath {
                entry: path.to_path_buf(),
                component: path.to_path_buf(),
            });
        }
        Ok(path)
    }
}

/// Fill `block` from `read`, stopping early only at end of stream. Returns
/// the number of bytes read.
pub(crate) fn read_block<R: Read + ?Sized>(read: &mut R, block: &mut [u8]) -> io::Result<usize> {
    let mut got = 0;
    while got < block.len() {
        match read.read(&mut block[got..]) {
            Ok(0) => break,
            Ok(count) => got += count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(got)
}

/// Copy at most `len` bytes through `buf`, returning how many were copied.
/// Fewer than `len` means `read` ran dry.
pub(crate) fn copy_exact<R, W>(mut read: R, mut write: W, len: u64, buf: &mut [u8]) -> io::Result<u64>
where
    R: Read,
    W: Write,
{
    let mut total = 0;
    while total < len {
        let want = buf.len().min((len - total) as usize);
        let count = read_block(&mut read, &mut buf[..want])?;
        if count == 0 {
            break;
        }
        write.write_all(&buf[..count])?;
        total += count as u64;
    }
    Ok(total)
}
