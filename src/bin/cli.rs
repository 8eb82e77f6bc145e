//! Sercom command line interface.

use std::process;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
};
use console::style;
use log::{debug, trace, LevelFilter};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use simplelog::*;

use sercom as sc;

fn main() {
    println!("[SC] sercom v{}", crate_version!());

    // At the console prompt, Ctrl+C is read by the line editor and ends the
    // session like `/exit` does.
    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let default_dir = sc::default_config_dir().display().to_string();

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Sercom is a line oriented terminal for boards attached to a \
            serial port. Each line typed on the console is sent to the board \
            followed by a newline; several commands can be given on one line \
            separated by ';'. Each line received from the board is printed \
            with a timestamp and appended to a session log in the \
            configuration directory.\n\
            \n\
            Lines starting with '/' are handled by sercom itself:\n\
               \t* /alias NAME = COMMAND rewrites the first word of a command \n\
               \t* /ignore PATTERN hides the matching board lines \n\
               \t* /filter PATTERN only keeps the matching board lines \n\
               \t* /save keeps the aliases, filters and ignores for the next \
                   session \n\
               \t* /reset toggles DTR to reboot the board \n\
               \t* /exit leaves sercom \n\
            \n\
            Type '/help' in the terminal for the full list.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("PORT")
                .help("the serial port to use")
                .long_help(
                    "the serial port to use; when not set, the port saved in \
                     the configuration file is used, and `/dev/ttyUSB0` when \
                     there is none.",
                )
                .short("p")
                .long("port")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .short("b")
                .long("baudrate")
                .takes_value(true)
                .default_value("115200"),
        )
        .arg(
            Arg::with_name("DIRECTORY")
                .help("directory for the configuration, history and session logs")
                .short("d")
                .long("directory")
                .takes_value(true)
                .default_value(&default_dir),
        )
        .arg(
            Arg::with_name("CONFIG")
                .help("name of the configuration file inside the directory")
                .short("c")
                .long("config")
                .takes_value(true)
                .default_value(sc::DEFAULT_CONFIG_FILE),
        )
        .arg(
            Arg::with_name("DATA_BITS")
                .help("number of bits per character")
                .long("data-bits")
                .takes_value(true)
                .possible_values(&["5", "6", "7", "8"])
                .default_value("8")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("STOP_BITS")
                .help("number of stop bits per byte")
                .long("stop-bits")
                .takes_value(true)
                .possible_values(&["1", "2"])
                .default_value("1")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("PARITY")
                .help("parity checking protocol")
                .long("parity")
                .takes_value(true)
                .possible_values(&["none", "odd", "even"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("FLOW_CONTROL")
                .help("flow control mode")
                .long("flow-control")
                .takes_value(true)
                .possible_values(&["none", "soft", "hard"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'sercom -v -v -v' or 'sercom -vvv' vs 'sercom -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap();

    trace!("{:#?}", matches);

    // Arguments with default values ===========================================

    // It's safe to call unwrap on all command line arguments with default
    // values, because the value with either be what the user input at runtime
    // or the default value

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32).unwrap_or_else(|_| {
        println!(
            "{}: `{}` needs to be a numeric value",
            style("error").red(),
            style("baudrate").cyan()
        );
        println!(
            "   {} `{}` is not a valid value",
            style("-->").cyan(),
            style(matches.value_of("BAUD_RATE").unwrap()).on_red()
        );
        process::exit(-1);
    });

    let data_bits = match matches.value_of("DATA_BITS").unwrap() {
        "5" => DataBits::Five,
        "6" => DataBits::Six,
        "7" => DataBits::Seven,
        "8" => DataBits::Eight,
        _ => unreachable!(),
    };

    let stop_bits = match matches.value_of("STOP_BITS").unwrap() {
        "1" => StopBits::One,
        "2" => StopBits::Two,
        _ => unreachable!(),
    };

    let parity = match matches.value_of("PARITY").unwrap() {
        "none" => Parity::None,
        "even" => Parity::Even,
        "odd" => Parity::Odd,
        _ => unreachable!(),
    };

    let flow_control = match matches.value_of("FLOW_CONTROL").unwrap() {
        "none" => FlowControl::None,
        "soft" => FlowControl::Software,
        "hard" => FlowControl::Hardware,
        _ => unreachable!(),
    };

    let mut builder = sc::SettingsBuilder::default()
        .baud_rate(baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(flow_control)
        .config_dir(matches.value_of("DIRECTORY").unwrap())
        .config_file(matches.value_of("CONFIG").unwrap());

    // END - Arguments with default values =====================================

    // The port is left unset unless given, so the saved one can be used.
    if let Some(port) = matches.value_of("PORT") {
        builder = builder.port(port);
    }

    let settings = builder.finalize();

    // Run the state machine ===================================================

    let mut terminal = sc::factory(settings);
    let exit_code = terminal.run();
    debug!("exit code: {}", exit_code);
    process::exit(exit_code.into());
}
