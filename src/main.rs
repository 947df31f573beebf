//! CLI entry point: parses `--log-level`/`--script`, then feeds lines
//! (from the script file or stdin) through the command protocol into a
//! `Controller` writing to stdout.
//!
//! Grounded on `timely::execute::execute_from_args`'s flag-parsing shape:
//! `getopts` builds the option table, `--help` prints usage and exits
//! zero, and a bad flag is a hard error with a nonzero exit code rather
//! than a silently-ignored default.

use std::io::{self, BufRead};

use chandy_lamport_sim::command::parse;
use chandy_lamport_sim::controller::Controller;
use chandy_lamport_sim::logging;

fn print_usage(program: &str, opts: &getopts::Options) {
    let brief = format!("Usage: {program} [options]");
    print!("{}", opts.usage(&brief));
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let program = args[0].clone();

    let mut opts = getopts::Options::new();
    opts.optopt("l", "log-level", "tracing level (error|warn|info|debug|trace)", "LEVEL");
    opts.optopt("s", "script", "read commands from FILE instead of stdin", "FILE");
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}");
            print_usage(&program, &opts);
            std::process::exit(2);
        }
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return;
    }

    let log_level = matches.opt_str("l").unwrap_or_else(|| "warn".to_string());
    logging::init(&log_level);

    let input: Box<dyn BufRead> = match matches.opt_str("s") {
        Some(path) => match std::fs::File::open(&path) {
            Ok(file) => Box::new(io::BufReader::new(file)),
            Err(e) => {
                eprintln!("cannot open script {path}: {e}");
                std::process::exit(1);
            }
        },
        None => Box::new(io::BufReader::new(io::stdin())),
    };

    run(input, io::stdout().lock());
}

fn run<R: BufRead, W: std::io::Write>(input: R, out: W) {
    let mut controller = Controller::new(out);
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "stopping on unreadable input line");
                break;
            }
        };
        if let Some(command) = parse(&line) {
            controller.dispatch(command);
        } else {
            tracing::debug!(line, "unparsed command line, ignored");
        }
    }
}

