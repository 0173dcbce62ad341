//! pcpurge daemon entry point.
//!
//! Usage: pcpurge [options] <watchpath>

mod cli;

use std::process::ExitCode;

use cli::Command;
use pcpurge::{daemon, logging, version};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match cli::parse_args_from(&args) {
        Ok(Command::Help) => {
            cli::print_usage();
            ExitCode::SUCCESS
        }
        Ok(Command::Version) => {
            println!("{}", version::version());
            ExitCode::SUCCESS
        }
        Ok(Command::Run(config)) => {
            logging::init(&config);
            if let Err(e) = daemon::run(config) {
                eprintln!("Error: {:#}", e);
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!();
            cli::print_usage();
            ExitCode::from(1)
        }
    }
}
