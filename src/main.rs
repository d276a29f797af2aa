extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;
extern crate vinasm;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs;
use std::path::{Path, PathBuf};

use vinasm::assembler::{Assembler, Assembled, NullaryEncoding, Options};

/// Extension of the hex output written next to the input.
const OUTPUT_EXTENSION: &str = "4vin";

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    // INPUT is a required argument, so clap has already rejected its absence.
    let ifile = args.value_of("INPUT").unwrap_or_default();

    debug!("Arguments:\n\tVerbosity: {}\n\tExpand Only: {}\n\tAlign Nullary: {}\n\tOutfile: {}\n\tInfile: {}",
        verbosity_filter(args.occurrences_of("verbose")),
        args.is_present("expand"),
        args.is_present("align-nullary"),
        args.value_of("output").unwrap_or("None"),
        ifile
    );

    let ipath = Path::new(ifile);
    let source = match fs::read_to_string(&ipath) {
        Err(err) => {
            error!("fatal: unable to read input file `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(source) => source,
    };

    let options = Options {
        nullary: if args.is_present("align-nullary") {
            NullaryEncoding::Aligned
        } else {
            NullaryEncoding::Legacy
        },
    };
    let assembler = Assembler::new(&ipath.display().to_string()).with_options(options);

    if args.is_present("expand") {
        match assembler.expand(&source) {
            Ok(program) => print!("{}", program),
            Err(err) => {
                error!("{}", err.render(&source));
                std::process::exit(1);
            },
        }
        return;
    }

    let assembled = match assembler.compile(&source) {
        Err(err) => {
            error!("{}", err.render(&source));
            std::process::exit(1);
        },
        Ok(assembled) => assembled,
    };

    if args.is_present("print-debug") {
        print_listing(&assembled);
    }

    let opath = match args.value_of("output") {
        Some(filename) => PathBuf::from(filename),
        None => ipath.with_extension(OUTPUT_EXTENSION),
    };

    if let Err(err) = fs::write(&opath, format!("{}\n", assembled.to_hex())) {
        error!("fatal: unable to write to output file `{}`: {}", opath.display(), err);
        std::process::exit(1);
    }
    info!("wrote {} word(s) to `{}`", assembled.words().len(), opath.display());
}

fn print_listing(assembled: &Assembled) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for entry in assembled.listing.iter() {
        let hex = entry.bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ");
        grid.add(Cell::from(format!("0x{:04X}:", entry.offset)));
        grid.add(Cell::from(entry.text.clone()));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(hex));
    }

    println!("{}", grid.fit_into_columns(4));

    let mut labels: Vec<(&String, &u32)> = assembled.labels.iter().collect();
    labels.sort_by_key(|&(_, addr)| *addr);
    for (name, addr) in labels {
        println!("${} = 0x{:04X}", name, addr);
    }
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write output to an outfile (default: the input with a .4vin extension)"))
        .arg(Arg::with_name("expand")
            .short("e")
            .takes_value(false)
            .help("expand microcode only and print the resulting assembly to STDOUT"))
        .arg(Arg::with_name("align-nullary")
            .short("a")
            .long("align-nullary")
            .takes_value(false)
            .help("encode instructions without operands as a full 4-byte word"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .alias("s")
            .takes_value(false)
            .help("prints the debug information alongside the assembly to STDOUT"))
        .get_matches()
}

fn verbosity_filter(verbosity: u64) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(verbosity_filter(verbosity))
        .chain(std::io::stderr())
        .apply().ok();
}
