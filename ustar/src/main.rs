//TODO: update clap to remove the need for this
#![allow(dangerous_implicit_autorefs)]

use std::process;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, App, AppSettings, Arg, ArgMatches, SubCommand,
};
use log::{Level, LevelFilter, Log, Metadata, Record};
use ustar::{create, diff, extract, list, metadata, remove, update};

/// Writes records to stderr, prefixed with their level
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                Level::Error => "error",
                Level::Warn => "warning",
                Level::Info => "info",
                Level::Debug => "debug",
                Level::Trace => "trace",
            };
            eprintln!("{}: {}", level, record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Only fails if a logger is already installed
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn values<'a>(matches: &'a ArgMatches, name: &str) -> Vec<&'a str> {
    matches.values_of(name).map(|values| values.collect()).unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let arg_names = Arg::with_name("names")
        .help("Archived names (defaults to all)")
        .multiple(true)
        .value_name("NAME");

    let arg_paths = Arg::with_name("paths")
        .help("Paths to archive, relative to the base directory")
        .required(true)
        .multiple(true)
        .value_name("PATH");

    let matches = App::new(crate_name!())
        .author(crate_authors!(", "))
        .about(crate_description!())
        .version(crate_version!())
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("archive")
                .help("Archive file")
                .short("f")
                .long("file")
                .required(true)
                .takes_value(true)
                .value_name("ARCHIVE"),
        )
        .arg(
            Arg::with_name("basedir")
                .help("Directory paths are resolved against (defaults to '.')")
                .short("C")
                .long("directory")
                .takes_value(true)
                .value_name("DIR")
                .default_value("."),
        )
        .arg(
            Arg::with_name("verbose")
                .help("Log more, repeat for even more")
                .short("v")
                .multiple(true),
        )
        .subcommand(
            SubCommand::with_name("create")
                .about("Create archive")
                .arg(&arg_paths),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List archive")
                .arg(
                    Arg::with_name("long")
                        .help("Show type, mode, owner, size and time")
                        .short("l")
                        .long("long"),
                )
                .arg(&arg_names),
        )
        .subcommand(SubCommand::with_name("metadata").about("Print every header field of every entry"))
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extract archive")
                .arg(&arg_names),
        )
        .subcommand(SubCommand::with_name("diff").about("Compare archive with the base directory"))
        .subcommand(
            SubCommand::with_name("remove")
                .about("Remove entries from archive")
                .arg(
                    Arg::with_name("names")
                        .help("Archived names")
                        .required(true)
                        .multiple(true)
                        .value_name("NAME"),
                ),
        )
        .subcommand(
            SubCommand::with_name("update")
                .about("Append paths newer than their archived copy")
                .arg(&arg_paths),
        )
        .get_matches();

    init_logging(matches.occurrences_of("verbose"));

    let archive = matches.value_of("archive").unwrap();
    let basedir = matches.value_of("basedir").unwrap();

    if let Some(matches) = matches.subcommand_matches("create") {
        create(archive, basedir, &values(matches, "paths"))?;
    } else if let Some(matches) = matches.subcommand_matches("list") {
        list(archive, &values(matches, "names"), matches.is_present("long"))?;
    } else if matches.subcommand_matches("metadata").is_some() {
        metadata(archive)?;
    } else if let Some(matches) = matches.subcommand_matches("extract") {
        extract(archive, basedir, &values(matches, "names"))?;
    } else if matches.subcommand_matches("diff").is_some() {
        if !diff(archive, basedir)?.is_empty() {
            process::exit(1);
        }
    } else if let Some(matches) = matches.subcommand_matches("remove") {
        remove(archive, &values(matches, "names"))?;
    } else if let Some(matches) = matches.subcommand_matches("update") {
        update(archive, basedir, &values(matches, "paths"))?;
    }

    Ok(())
}
