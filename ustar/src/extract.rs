use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ustar_core::{Entry, DEFAULT_DIR_MODE};

use crate::ext::{copy_exact, EntryExt};
use crate::{wrap_io_err, Archive, Error, READ_WRITE_BUF_SIZE};

/// Sibling of `target` that its contents are written to before the rename
fn temp_path(target: &Path) -> Result<PathBuf, Error> {
    let file_name = target.file_name().ok_or_else(|| Error::InvalidPath {
        entry: target.to_path_buf(),
        component: target.to_path_buf(),
    })?;
    let tmp_name = format!(".ustar.{}", Path::new(file_name).display());
    Ok(target.with_file_name(tmp_name))
}

fn extract_entry<R>(src: &mut R, base_dir: &Path, entry: &Entry, buf: &mut [u8]) -> Result<(), Error>
where
    R: Read + Seek,
{
    let target = base_dir.join(entry.check_path()?);
    if let Some(parent) = target.parent() {
        DirBuilder::new()
            .recursive(true)
            .mode(DEFAULT_DIR_MODE.bits())
            .create(parent)
            .map_err(wrap_io_err!(parent, "Creating directory"))?;
    }
    let tmp_path = temp_path(&target)?;
    let perm = entry.mode().perm().bits();

    src.seek(SeekFrom::Start(entry.data_offset()))
        .map_err(wrap_io_err!("Seeking to entry data"))?;

    let mut tmp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(perm)
        .open(&tmp_path)
        .map_err(wrap_io_err!(tmp_path, "Creating temporary file"))?;

    let copied = match copy_exact(&mut *src, &mut tmp_file, entry.size, buf) {
        Ok(copied) if copied == entry.size => copied,
        result => {
            let _ = fs::remove_file(&tmp_path);
            return match result {
                Ok(copied) => Err(Error::LengthMismatch {
                    path: target,
                    expected: entry.size,
                    actual: copied,
                }),
                Err(source) => Err(Error::Io {
                    source,
                    path: Some(tmp_path),
                    context: "Copying entry to temporary file",
                }),
            };
        }
    };

    // The open mode was filtered through the umask
    let committed = tmp_file
        .set_permissions(Permissions::from_mode(perm))
        .map_err(wrap_io_err!(tmp_path, "Setting permissions"))
        .and_then(|()| fs::rename(&tmp_path, &target).map_err(wrap_io_err!(target, "Renaming temporary file")));
    if let Err(err) = committed {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    debug!("Extracted {} ({} bytes)", target.display(), copied);
    Ok(())
}

impl Archive {
    /// Write the contents of the entries named by `names` (every entry when
    /// empty) from `src` into files under `base_dir`, creating missing
    /// parent directories. Entries that are not regular files are skipped.
    ///
    /// Every requested name must be in the archive. A file that cannot be
    /// extracted is logged and skipped, and the call then fails with
    /// [`Error::Incomplete`]. Returns the number of files written.
    pub fn extract<R, N>(&self, src: &mut R, base_dir: impl AsRef<Path>, names: &[N]) -> Result<usize, Error>
    where
        R: Read + Seek,
        N: AsRef<str>,
    {
        if let Some(missing) = names.iter().find(|name| !self.exists(name.as_ref())) {
            return Err(Error::NotFound(missing.as_ref().to_string()));
        }

        let base_dir = base_dir.as_ref();
        let mut buf = vec![0; READ_WRITE_BUF_SIZE];
        let mut total = 0;
        let mut failed = 0;

        for entry in self.select(names) {
            if !entry.kind.is_file() {
                debug!("Skipping {} ({})", entry.name, entry.kind.description());
                continue;
            }

            total += 1;
            if let Err(err) = extract_entry(src, base_dir, entry, &mut buf) {
                warn!("Failed to extract '{}': {}", entry.name, err);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(Error::Incomplete {
                operation: "extract",
                failed,
                total,
            });
        }

        info!("Extracted {} files into {}", total, base_dir.display());
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use ustar_core::{Entry, EntryType, Header};

    use super::temp_path;
    use crate::test::{file_entry, filler, finish};
    use crate::{Archive, Error};

    #[test]
    fn temp_file_sits_next_to_target() {
        assert_eq!(
            temp_path(Path::new("/base/dir/file")).unwrap(),
            Path::new("/base/dir/.ustar.file")
        );
    }

    #[test]
    fn extracts_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut data = file_entry("top", &filler("top", 3));
        data.extend(file_entry("sub/dir/deep", &filler("deep", 700)));
        let mut src = Cursor::new(finish(data));
        let archive = Archive::read(&mut src).unwrap();

        let none: [&str; 0] = [];
        assert_eq!(archive.extract(&mut src, tmp.path(), &none).unwrap(), 2);
        assert_eq!(fs::read(tmp.path().join("top")).unwrap(), filler("top", 3));
        assert_eq!(
            fs::read(tmp.path().join("sub/dir/deep")).unwrap(),
            filler("deep", 700)
        );
        let mode = fs::metadata(tmp.path().join("top")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert!(!tmp.path().join(".ustar.top").exists());
    }

    #[test]
    fn skips_directories_and_unrequested() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Entry::new("dir/", EntryType::Directory);
        let mut data = Header::from_entry(&dir).unwrap().as_bytes().to_vec();
        data.extend(file_entry("dir/a", b"a"));
        data.extend(file_entry("dir/b", b"b"));
        let mut src = Cursor::new(finish(data));
        let archive = Archive::read(&mut src).unwrap();

        assert_eq!(archive.extract(&mut src, tmp.path(), &["dir/", "dir/b"]).unwrap(), 1);
        assert!(tmp.path().join("dir/b").exists());
        assert!(!tmp.path().join("dir/a").exists());
    }

    #[test]
    fn unknown_name_fails_up_front() {
        let tmp = tempfile::tempdir().unwrap();
        let mut src = Cursor::new(finish(file_entry("a", b"a")));
        let archive = Archive::read(&mut src).unwrap();

        assert!(matches!(
            archive.extract(&mut src, tmp.path(), &["a", "b"]),
            Err(Error::NotFound(_))
        ));
        assert!(!tmp.path().join("a").exists());
    }

    #[test]
    fn escaping_entry_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut data = file_entry("../escape", b"x");
        data.extend(file_entry("ok", b"y"));
        let mut src = Cursor::new(finish(data));
        let archive = Archive::read(&mut src).unwrap();

        let none: [&str; 0] = [];
        assert!(matches!(
            archive.extract(&mut src, tmp.path().join("root"), &none),
            Err(Error::Incomplete { failed: 1, total: 2, .. })
        ));
        assert!(tmp.path().join("root/ok").exists());
        assert!(!tmp.path().join("escape").exists());
    }

    #[test]
    fn current_dir_prefix_extracts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Entry::new("./", EntryType::Directory);
        let mut data = Header::from_entry(&dir).unwrap().as_bytes().to_vec();
        data.extend(file_entry("./y", b"y"));
        data.extend(file_entry("./d/x", &filler("x", 600)));
        let mut src = Cursor::new(finish(data));
        let archive = Archive::read(&mut src).unwrap();

        let none: [&str; 0] = [];
        assert_eq!(archive.extract(&mut src, tmp.path(), &none).unwrap(), 2);
        assert_eq!(fs::read(tmp.path().join("y")).unwrap(), b"y");
        assert_eq!(fs::read(tmp.path().join("d/x")).unwrap(), filler("x", 600));
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        // A non-empty directory in the way makes the rename fail
        fs::create_dir(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("a/keep"), "keep").unwrap();
        let mut src = Cursor::new(finish(file_entry("a", b"a")));
        let archive = Archive::read(&mut src).unwrap();

        assert!(matches!(
            archive.extract(&mut src, tmp.path(), &["a"]),
            Err(Error::Incomplete { failed: 1, total: 1, .. })
        ));
        assert!(!tmp.path().join(".ustar.a").exists());
        assert!(tmp.path().join("a/keep").exists());
    }
}
