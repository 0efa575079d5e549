use std::fmt;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use log::{debug, info};
use ustar_core::Mode;

use crate::Archive;

/// A way in which an archived entry disagrees with the filesystem
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Difference {
    /// Nothing could be stat'ed at the entry's path
    Missing { name: String, reason: String },
    Mtime { name: String, archived: u64, actual: i64 },
    Size { name: String, archived: u64, actual: u64 },
    Mode { name: String, archived: Mode, actual: Mode },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Missing { name, reason } => write!(f, "{}: Warning: Cannot stat: {}", name, reason),
            Difference::Mtime { name, .. } => write!(f, "{}: Modification time differs", name),
            Difference::Size { name, .. } => write!(f, "{}: Size differs", name),
            Difference::Mode { name, archived, actual } => {
                write!(f, "{}: Mode differs ({} in archive, {} on disk)", name, archived, actual)
            }
        }
    }
}

impl Archive {
    /// Compare every entry against the file at its name under `base_dir`.
    /// Nothing is modified; an unchanged tree yields no differences.
    pub fn diff(&self, base_dir: impl AsRef<Path>) -> Vec<Difference> {
        let base_dir = base_dir.as_ref();
        let mut differences = Vec::new();

        for entry in self.entries() {
            let path = base_dir.join(&entry.name);
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    differences.push(Difference::Missing {
                        name: entry.name.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            debug!("Comparing {} with {}", entry.name, path.display());

            if i64::try_from(entry.mtime).ok() != Some(metadata.mtime()) {
                differences.push(Difference::Mtime {
                    name: entry.name.clone(),
                    archived: entry.mtime,
                    actual: metadata.mtime(),
                });
            }

            let archived = entry.mode().perm();
            let actual = Mode::from_bits_truncate(metadata.mode()).perm();
            if archived != actual {
                differences.push(Difference::Mode {
                    name: entry.name.clone(),
                    archived,
                    actual,
                });
            }

            if entry.kind.is_file() && entry.size != metadata.len() {
                differences.push(Difference::Size {
                    name: entry.name.clone(),
                    archived: entry.size,
                    actual: metadata.len(),
                });
            }
        }

        info!("{} differences across {} entries", differences.len(), self.len());
        differences
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};
    use std::io::Cursor;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, UNIX_EPOCH};

    use super::Difference;
    use crate::test::{archive, filler};
    use crate::Archive;

    /// Lay out the files of the fixture archive with matching metadata
    fn tree(files: &[(&str, usize)]) -> (Archive, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        for &(name, size) in files {
            let path = tmp.path().join(name);
            fs::write(&path, filler(name, size)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
            File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(UNIX_EPOCH + Duration::from_secs(1_600_000_000))
                .unwrap();
        }
        let archive = Archive::read(&mut Cursor::new(archive(files))).unwrap();
        (archive, tmp)
    }

    #[test]
    fn unchanged_tree_has_no_differences() {
        let (archive, tmp) = tree(&[("a", 10), ("b", 0)]);
        assert!(archive.diff(tmp.path()).is_empty());
    }

    #[test]
    fn reports_each_kind() {
        let (archive, tmp) = tree(&[("a", 10), ("b", 5), ("c", 1)]);
        fs::write(tmp.path().join("a"), "longer than before").unwrap();
        fs::set_permissions(tmp.path().join("b"), fs::Permissions::from_mode(0o600)).unwrap();
        fs::remove_file(tmp.path().join("c")).unwrap();

        let differences = archive.diff(tmp.path());
        let rendered: Vec<_> = differences.iter().map(|d| d.to_string()).collect();
        // Rewriting `a` also moved its mtime
        assert_eq!(rendered[0], "a: Modification time differs");
        assert_eq!(rendered[1], "a: Size differs");
        assert!(rendered[2].starts_with("b: Mode differs"));
        assert!(matches!(&differences[3], Difference::Missing { name, .. } if name == "c"));
        assert_eq!(differences.len(), 4);
    }
}
