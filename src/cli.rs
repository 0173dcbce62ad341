//! Command-line parsing for pcpurge.

use anyhow::{anyhow, Result};
use pcpurge::{validate_root, DaemonConfig};

pub fn print_usage() {
    eprintln!("pcpurge - evict recently written files from the page cache");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  pcpurge [-h|--help] [-V|--version] [-d|--debug]... [-b|--bg] [-l|--life <SECS>] <WATCHPATH>");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <WATCHPATH>         Directory tree to watch (absolute; not '/')");
    eprintln!("  -l, --life <SECS>   Seconds a closed file stays cached before eviction (default: 60)");
    eprintln!("  -d, --debug         Increase diagnostic verbosity (repeatable)");
    eprintln!("  -b, --bg            Detach from the terminal and run as a daemon (silences diagnostics)");
    eprintln!("  -V, --version       Print version and build information");
    eprintln!("  -h, --help          Print this help");
    eprintln!();
    eprintln!("Signals:");
    eprintln!("  USR1                Print the number of tracked files");
    eprintln!("  USR2                Print every tracked file with its state");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PCPURGE_LOG         tracing filter directive overriding --debug");
}

#[derive(Debug)]
pub enum Command {
    Run(DaemonConfig),
    Help,
    Version,
}

/// Parse arguments (without the program name).
pub fn parse_args_from(args: &[String]) -> Result<Command> {
    let mut watchpath: Option<&str> = None;
    let mut ttl_secs: i64 = 60;
    let mut verbosity: u8 = 0;
    let mut background = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-d" | "--debug" => {
                verbosity = verbosity.saturating_add(1);
                i += 1;
            }
            "-b" | "--bg" | "--background" => {
                background = true;
                i += 1;
            }
            "-l" | "--life" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow!("{} requires an argument", args[i]))?;
                ttl_secs = value
                    .parse()
                    .map_err(|_| anyhow!("invalid lifespan '{}', expected seconds", value))?;
                i += 2;
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(anyhow!("unknown argument: {}", other));
            }
            other => {
                watchpath = Some(other);
                i += 1;
            }
        }
    }

    let raw = watchpath.ok_or_else(|| anyhow!("need watchpath argument"))?;
    let root = validate_root(raw)?;

    Ok(Command::Run(DaemonConfig::new(
        root, ttl_secs, verbosity, background,
    )))
}
