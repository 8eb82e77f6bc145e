//! Generate a constfs image from a directory tree.

use std::{io, process};

use clap::{crate_authors, crate_version, App, AppSettings::*, Arg};
use console::style;
use log::{info, trace, LevelFilter};
use simplelog::*;

use sercom::constfs;

fn main() {
    let matches = App::new("mkconstfs")
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about("Embed a directory tree in a C source file as a constfs image")
        .long_about(
            "\n\
            Walks ROOT and writes to stdout a C source file holding every \
            regular file as a constant byte array, along with the file table \
            and the `vfs_mount_t` to mount it as a read-only file system. \
            Files are listed depth-first, sorted by name, so the same tree \
            always gives the same output.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("ROOT")
                .help("directory to embed")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("MOUNT_POINT")
                .help("where the file system gets mounted")
                .default_value(constfs::DEFAULT_MOUNT_POINT)
                .index(2),
        )
        .arg(
            Arg::with_name("NAME")
                .help("name of the generated `vfs_mount_t` variable")
                .default_value(constfs::DEFAULT_NAME)
                .index(3),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // stdout carries the generated source, diagnostics go to stderr
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .unwrap();

    trace!("{:#?}", matches);

    // Safe to unwrap, all arguments are either required or have a default.
    let root = matches.value_of("ROOT").unwrap();
    let mount_point = matches.value_of("MOUNT_POINT").unwrap();
    let name = matches.value_of("NAME").unwrap();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match constfs::generate(root, mount_point, name, &mut out) {
        Ok(files) => info!("{} files embedded from {}", files.len(), root),
        Err(err) => {
            eprintln!(
                "{}: could not embed `{}`: {}",
                style("error").red(),
                style(root).cyan(),
                err
            );
            process::exit(1);
        }
    }
}
