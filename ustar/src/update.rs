use std::fs;
use std::io::{Seek, Write};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use log::{debug, info, warn};

use crate::{stored_name, Archive, Error};

impl Archive {
    /// Append those of `paths` (resolved against `base_dir`) that are not in
    /// the archive yet, or whose modification time is newer than the last
    /// archived copy. Returns the final offset.
    ///
    /// A path that cannot be stat'ed is logged and left out; the call fails
    /// with [`Error::Incomplete`] after appending the rest.
    pub fn update<W, P>(&mut self, dest: &mut W, base_dir: impl AsRef<Path>, paths: &[P]) -> Result<u64, Error>
    where
        W: Write + Seek,
        P: AsRef<Path>,
    {
        let base_dir = base_dir.as_ref();
        let mut failed = 0;
        let mut newer = Vec::with_capacity(paths.len());

        for path in paths {
            let path = path.as_ref();
            let metadata = match fs::metadata(base_dir.join(path)) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("Cannot stat {}: {}", path.display(), err);
                    failed += 1;
                    continue;
                }
            };

            let name = stored_name(path, metadata.is_dir());
            match self.find(&name) {
                Some(entry) if metadata.mtime() <= entry.mtime as i64 => {
                    debug!("{} is up to date", name);
                }
                Some(_) => {
                    debug!("{} is newer than its archived copy", name);
                    newer.push(path);
                }
                None => {
                    debug!("{} is not archived yet", name);
                    newer.push(path);
                }
            }
        }

        let end = self.append(dest, base_dir, &newer)?;
        if failed > 0 {
            return Err(Error::Incomplete {
                operation: "stat",
                failed,
                total: paths.len(),
            });
        }

        info!("Updated {} of {} paths", newer.len(), paths.len());
        Ok(end)
    }
}
