//! Text dump of the eviction index, written on request to the diagnostic stream.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;

use crate::index::FileState;
use crate::signals::DumpRequest;

/// Write a dump of `entries`.
///
/// A full dump lists one line per entry before the summary line; a count dump
/// writes only the summary.
pub fn write_dump<W: Write>(
    out: &mut W,
    entries: &[(PathBuf, FileState)],
    kind: DumpRequest,
    now: Instant,
) -> io::Result<()> {
    if kind == DumpRequest::Full {
        for (n, (path, state)) in entries.iter().enumerate() {
            match state {
                FileState::Active(since) => writeln!(
                    out,
                    "index[{}] <{}> active age={:.1}s",
                    n,
                    path.display(),
                    now.saturating_duration_since(*since).as_secs_f64()
                )?,
                FileState::Purged => writeln!(out, "index[{}] <{}> purged", n, path.display())?,
            }
        }
    }

    writeln!(
        out,
        "number of index entries = {} time now = {}",
        entries.len(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    out.flush()
}
