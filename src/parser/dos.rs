//! MS/DOS-style `LIST` parser, as served by IIS and some embedded FTP
//! daemons.
//!
//! ```text
//! 09-14-23  09:42AM       <DIR>          sub
//! 09-14-23  09:42AM                 1234 file.txt
//! ```

use super::DirectoryParser;
use crate::error::{FtpResult, InternalKind};
use crate::stat::{mode, StatRecord};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;

lazy_static::lazy_static! {
    static ref LINE_RE: Regex = Regex::new(
        r"(?x)
        ^(\d{2})-(\d{2})-(\d{2})\s+
        (\d{2}):(\d{2})(AM|PM)\s+
        (<DIR>|\d+)\s+
        (.+)$
        "
    ).unwrap();
}

pub struct DosParser;

impl DirectoryParser for DosParser {
    fn name(&self) -> &'static str {
        "dos"
    }

    fn parse_line(&self, line: &str, time_shift: i64, _server_now: DateTime<Utc>) -> FtpResult<StatRecord> {
        let caps = LINE_RE
            .captures(line)
            .ok_or_else(|| InternalKind::ParserFailure(line.to_string()))?;

        let month: u32 = caps[1].parse().map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
        let day: u32 = caps[2].parse().map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
        let yy: i32 = caps[3].parse().map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
        let year = if yy < 70 { 2000 + yy } else { 1900 + yy };

        let mut hour: u32 = caps[4].parse().map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
        let minute: u32 = caps[5].parse().map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(InternalKind::ParserFailure(line.to_string()).into());
        }
        let is_pm = &caps[6] == "PM";
        hour %= 12;
        if is_pm {
            hour += 12;
        }

        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| InternalKind::ParserFailure(line.to_string()))?;
        let naive = date
            .and_hms_opt(hour, minute, 0)
            .ok_or_else(|| InternalKind::ParserFailure(line.to_string()))?;
        let local = Utc.from_utc_datetime(&naive);
        let mtime = local.timestamp() as f64 - time_shift as f64;

        let size_or_dir = &caps[7];
        let name = caps[8].to_string();

        let (file_mode, size) = if size_or_dir == "<DIR>" {
            (mode::S_IFDIR, 0)
        } else {
            let size: u64 = size_or_dir
                .parse()
                .map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
            (mode::S_IFREG, size)
        };

        Ok(StatRecord {
            mode: file_mode,
            ino: None,
            dev: None,
            nlink: None,
            uid: None,
            gid: None,
            size,
            atime: None,
            mtime,
            ctime: None,
            name,
            target: None,
            mtime_precision: Some(60.0),
        }
        .clamp_mtime())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_directory() {
        let p = DosParser;
        let rec = p
            .parse_line("09-14-23  09:42AM       <DIR>          sub", 0, now())
            .unwrap();
        assert!(rec.is_dir());
        assert_eq!(rec.name, "sub");
        assert_eq!(rec.size, 0);
    }

    #[test]
    fn parses_file_with_size() {
        let p = DosParser;
        let rec = p
            .parse_line("09-14-23  09:42AM                 1234 file.txt", 0, now())
            .unwrap();
        assert!(rec.is_file());
        assert_eq!(rec.size, 1234);
        assert_eq!(rec.name, "file.txt");
    }

    #[test]
    fn pivot_year_rule() {
        let p = DosParser;
        let recent = p
            .parse_line("01-01-69  01:00AM       <DIR>          a", 0, now())
            .unwrap();
        let old = p
            .parse_line("01-01-70  01:00AM       <DIR>          b", 0, now())
            .unwrap();
        let recent_dt = DateTime::<Utc>::from_timestamp(recent.mtime as i64, 0).unwrap();
        let old_dt = DateTime::<Utc>::from_timestamp(old.mtime as i64, 0).unwrap();
        assert_eq!(recent_dt.date_naive().format("%Y").to_string(), "2069");
        assert_eq!(old_dt.date_naive().format("%Y").to_string(), "1970");
    }

    #[test]
    fn noon_and_midnight_pm_am_rollover() {
        let p = DosParser;
        let noon = p
            .parse_line("01-01-23  12:00PM       <DIR>          a", 0, now())
            .unwrap();
        let midnight = p
            .parse_line("01-01-23  12:00AM       <DIR>          a", 0, now())
            .unwrap();
        assert!(noon.mtime > midnight.mtime);
    }

    #[test]
    fn invalid_line_is_parser_failure() {
        let p = DosParser;
        assert!(p.parse_line("not a listing line at all", 0, now()).is_err());
    }
}
