//! File level entry points used by the `ustar` binary.
use std::fs::{self, File};
use std::path::Path;

use chrono::{Local, TimeZone};
use ustar_core::Entry;

use crate::{wrap_io_err, Archive, Difference, Error};

fn open_read(archive_path: &str) -> Result<(File, Archive), Error> {
    let mut archive_file = File::open(archive_path)
        .map_err(wrap_io_err!(archive_path, "Opening archive"))?;
    let archive = Archive::read(&mut archive_file)?;
    Ok((archive_file, archive))
}

fn open_rw(archive_path: &str) -> Result<(File, Archive), Error> {
    let mut archive_file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(archive_path)
        .map_err(wrap_io_err!(archive_path, "Opening archive"))?;
    let archive = Archive::read(&mut archive_file)?;
    Ok((archive_file, archive))
}

fn local_time(mtime: u64, format: &str) -> String {
    i64::try_from(mtime)
        .ok()
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|time| time.format(format).to_string())
        .unwrap_or_else(|| mtime.to_string())
}

/// One listing line: the bare name, or when `long` an `ls -l` style line
/// `-rw-r--r-- gid/uid size YYYY-MM-DD HH:MM name`
pub fn format_entry(entry: &Entry, long: bool) -> String {
    if !long {
        return entry.name.clone();
    }

    let mut line = format!(
        "{}{} {}/{} {:>8} {} {}",
        entry.kind.ls_char(),
        entry.mode().perm(),
        entry.gid,
        entry.uid,
        entry.size,
        local_time(entry.mtime, "%Y-%m-%d %H:%M"),
        entry.name
    );
    if !entry.link_name.is_empty() {
        line.push_str(" -> ");
        line.push_str(&entry.link_name);
    }
    line
}

/// Every decoded header field of `entry`, one per line
pub fn format_metadata(entry: &Entry) -> String {
    format!(
        "File Name: {}\n\
         Owner UID: {}\n\
         Owner GID: {}\n\
         File Mode: {:03o} ({})\n\
         File Size: {}\n\
         Time     : {} ({})\n\
         Checksum : {:06o}\n\
         File Type: {}\n\
         Link Name: {}\n\
         Offset   : {}\n",
        entry.name,
        entry.uid,
        entry.gid,
        entry.mode,
        entry.mode().perm(),
        entry.size,
        entry.mtime,
        local_time(entry.mtime, "%c"),
        entry.checksum,
        entry.kind.description(),
        entry.link_name,
        entry.begin
    )
}

/// Create (or truncate) `archive_path` holding `paths`, resolved against
/// `base_dir`.
pub fn create<P: AsRef<Path>>(archive_path: &str, base_dir: &str, paths: &[P]) -> Result<u64, Error> {
    let mut archive_file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(archive_path)
        .map_err(wrap_io_err!(archive_path, "Creating archive"))?;

    Archive::new().append(&mut archive_file, base_dir, paths)
}

pub fn list(archive_path: &str, names: &[&str], long: bool) -> Result<(), Error> {
    let (_, archive) = open_read(archive_path)?;
    for entry in archive.select(names) {
        println!("{}", format_entry(entry, long));
    }
    Ok(())
}

pub fn metadata(archive_path: &str) -> Result<(), Error> {
    let (_, archive) = open_read(archive_path)?;
    for entry in archive.entries() {
        println!("{}", format_metadata(entry));
    }
    Ok(())
}

pub fn extract(archive_path: &str, base_dir: &str, names: &[&str]) -> Result<usize, Error> {
    let (mut archive_file, archive) = open_read(archive_path)?;
    archive.extract(&mut archive_file, base_dir, names)
}

/// Print every difference between the archive and `base_dir`, and return
/// them.
pub fn diff(archive_path: &str, base_dir: &str) -> Result<Vec<Difference>, Error> {
    let (_, archive) = open_read(archive_path)?;
    let differences = archive.diff(base_dir);
    for difference in &differences {
        println!("{}", difference);
    }
    Ok(differences)
}

pub fn remove(archive_path: &str, names: &[&str]) -> Result<u64, Error> {
    let (mut archive_file, mut archive) = open_rw(archive_path)?;
    archive.remove(&mut archive_file, names)
}

pub fn update<P: AsRef<Path>>(archive_path: &str, base_dir: &str, paths: &[P]) -> Result<u64, Error> {
    let (mut archive_file, mut archive) = open_rw(archive_path)?;
    archive.update(&mut archive_file, base_dir, paths)
}
