//! Directory listing parser framework — server-format-agnostic parsing of
//! `LIST` output into [`StatRecord`](crate::stat::StatRecord)s, with
//! pluggable parsers and autodetection.

pub mod dos;
pub mod unix;

pub use dos::DosParser;
pub use unix::UnixParser;

use crate::error::FtpResult;
use crate::stat::StatRecord;
use chrono::{DateTime, Utc};

/// A pluggable line parser for one `LIST` output dialect.
pub trait DirectoryParser: Send + Sync {
    /// Lines that are not entries at all (blank lines, the `total N`
    /// preamble). Default covers both built-in parsers' needs.
    fn ignores_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with("total ")
    }

    /// Parse one non-ignored line into a stat record, resolving any
    /// ambiguous year/timestamp against `server_now` (the server's current
    /// time, i.e. `Utc::now()` shifted by the host's time shift) and
    /// converting the result to UTC by subtracting `time_shift` seconds.
    fn parse_line(&self, line: &str, time_shift: i64, server_now: DateTime<Utc>) -> FtpResult<StatRecord>;

    /// Short name used for logging / diagnostics.
    fn name(&self) -> &'static str;
}

/// Try each built-in parser in turn against a probe listing, returning the
/// first one that successfully parses at least one non-ignored line.
pub fn autodetect(
    lines: &[String],
    time_shift: i64,
    server_now: DateTime<Utc>,
) -> Option<Box<dyn DirectoryParser>> {
    let candidates: Vec<Box<dyn DirectoryParser>> =
        vec![Box::new(UnixParser), Box::new(DosParser)];
    for parser in candidates {
        for line in lines {
            if parser.ignores_line(line) {
                continue;
            }
            if parser.parse_line(line, time_shift, server_now).is_ok() {
                return Some(parser);
            }
        }
    }
    None
}
