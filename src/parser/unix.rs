//! Unix `ls -l`-style `LIST` parser.
//!
//! ```text
//! -rw-r--r--   1 user     group      1234 Sep 14 09:42 filename
//! drwxr-xr-x   5 user     group      4096 Sep 14  2023 dirname
//! lrwxrwxrwx   1 user     group         7 Sep 14 09:42 link -> target
//! ```

use super::DirectoryParser;
use crate::error::{FtpResult, InternalKind};
use crate::stat::{mode, StatRecord};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use regex::Regex;

lazy_static::lazy_static! {
    static ref LINE_RE: Regex = Regex::new(
        r"(?x)
        ^([-dlbcps])([r-][w-][xsS-][r-][w-][xsS-][r-][w-][xtT-])\s+
        (\d+)\s+
        (\S+)\s+
        (\S+)\s+
        (\d+)\s+
        (\w{3})\s+
        (\d{1,2})\s+
        (\d{1,2}:\d{2}|\d{4})\s+
        (.+)$
        "
    ).unwrap();
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

pub struct UnixParser;

impl UnixParser {
    fn decode_mode(type_char: char, perm_bits: &str) -> u32 {
        let file_type = match type_char {
            'd' => mode::S_IFDIR,
            'l' => mode::S_IFLNK,
            _ => mode::S_IFREG,
        };
        let mut bits: u32 = 0;
        let triplets = [(0o400u32, 0o200, 0o100), (0o40, 0o20, 0o10), (0o4, 0o2, 0o1)];
        let chars: Vec<char> = perm_bits.chars().collect();
        for (i, (r, w, x)) in triplets.iter().enumerate() {
            let base = i * 3;
            if chars[base] == 'r' {
                bits |= r;
            }
            if chars[base + 1] == 'w' {
                bits |= w;
            }
            match chars[base + 2] {
                'x' => bits |= x,
                's' | 't' => bits |= x,
                'S' | 'T' => {}
                _ => {}
            }
        }
        file_type | bits
    }
}

impl DirectoryParser for UnixParser {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn parse_line(&self, line: &str, time_shift: i64, server_now: DateTime<Utc>) -> FtpResult<StatRecord> {
        let caps = LINE_RE
            .captures(line)
            .ok_or_else(|| InternalKind::ParserFailure(line.to_string()))?;

        let type_char = caps[1].chars().next().unwrap();
        let perm_bits = &caps[2];
        let size: u64 = caps[6]
            .parse()
            .map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
        let month_str = caps[7].to_lowercase();
        let month = MONTHS
            .iter()
            .position(|m| *m == month_str)
            .ok_or_else(|| InternalKind::ParserFailure(line.to_string()))?
            + 1;
        let day: u32 = caps[8]
            .parse()
            .map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
        if !(1..=31).contains(&day) {
            return Err(InternalKind::ParserFailure(line.to_string()).into());
        }
        let time_or_year = &caps[9];
        let rest = caps[10].to_string();

        let (mtime, precision) = if let Some((h, m)) = time_or_year.split_once(':') {
            let hour: u32 = h.parse().map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
            let minute: u32 = m.parse().map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
            if hour > 23 || minute > 59 {
                return Err(InternalKind::ParserFailure(line.to_string()).into());
            }
            let mut year = server_now.year();
            let candidate = build_utc(year, month as u32, day, hour, minute)
                .ok_or_else(|| InternalKind::ParserFailure(line.to_string()))?;
            // If the candidate is more than a day in the future relative to
            // the server's current time, it must belong to last year.
            if candidate > server_now + Duration::days(1) {
                year -= 1;
            }
            let local = build_utc(year, month as u32, day, hour, minute)
                .ok_or_else(|| InternalKind::ParserFailure(line.to_string()))?;
            (local.timestamp() as f64 - time_shift as f64, 60.0)
        } else {
            let year: i32 = time_or_year
                .parse()
                .map_err(|_| InternalKind::ParserFailure(line.to_string()))?;
            let local = build_utc(year, month as u32, day, 0, 0)
                .ok_or_else(|| InternalKind::ParserFailure(line.to_string()))?;
            (local.timestamp() as f64 - time_shift as f64, 86400.0)
        };

        let (name, target) = match rest.find(" -> ") {
            Some(idx) if type_char == 'l' => (rest[..idx].to_string(), Some(rest[idx + 4..].to_string())),
            _ => (rest, None),
        };

        Ok(StatRecord {
            mode: Self::decode_mode(type_char, perm_bits),
            ino: None,
            dev: None,
            nlink: caps[3].parse().ok(),
            uid: Some(caps[4].to_string()),
            gid: Some(caps[5].to_string()),
            size,
            atime: None,
            mtime,
            ctime: None,
            name,
            target,
            mtime_precision: Some(precision),
        }
        .clamp_mtime())
    }
}

fn build_utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_regular_file_recent() {
        let p = UnixParser;
        let rec = p
            .parse_line("-rw-r--r--   1 user     group      1234 Jan 02 03:04 a.txt", 0, now())
            .unwrap();
        assert!(rec.is_file());
        assert_eq!(rec.size, 1234);
        assert_eq!(rec.name, "a.txt");
        assert_eq!(rec.mtime_precision, Some(60.0));
    }

    #[test]
    fn parses_directory_with_year() {
        let p = UnixParser;
        let rec = p
            .parse_line("drwxr-xr-x   2 u g 4096 Jan 02 2023 sub", 0, now())
            .unwrap();
        assert!(rec.is_dir());
        assert_eq!(rec.mtime_precision, Some(86400.0));
    }

    #[test]
    fn parses_symlink_target() {
        let p = UnixParser;
        let rec = p
            .parse_line("lrwxrwxrwx   1 u g 7 Jan 02 03:04 link -> target", 0, now())
            .unwrap();
        assert!(rec.is_symlink());
        assert_eq!(rec.name, "link");
        assert_eq!(rec.target.as_deref(), Some("target"));
    }

    #[test]
    fn future_recent_date_rolls_back_a_year() {
        // "now" is Jan 2026; a listing claiming "Dec 31 23:59" without a
        // year must be read as belonging to the previous year, not the
        // future.
        let p = UnixParser;
        let server_now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 30, 0).unwrap();
        let rec = p
            .parse_line("-rw-r--r--   1 u g 1 Dec 31 23:59 f", 0, server_now)
            .unwrap();
        let dt = DateTime::<Utc>::from_timestamp(rec.mtime as i64, 0).unwrap();
        assert_eq!(dt.year(), 2025);
    }

    #[test]
    fn invalid_day_is_parser_failure() {
        let p = UnixParser;
        let err = p.parse_line("-rw-r--r--   1 u g 1 Jan 40 03:04 f", 0, now());
        assert!(err.is_err());
    }

    #[test]
    fn time_shift_is_subtracted() {
        let p = UnixParser;
        let rec0 = p
            .parse_line("-rw-r--r--   1 u g 1 Jan 02 03:04 f", 0, now())
            .unwrap();
        let rec_shifted = p
            .parse_line("-rw-r--r--   1 u g 1 Jan 02 03:04 f", 3600, now())
            .unwrap();
        assert_eq!(rec0.mtime - rec_shifted.mtime, 3600.0);
    }

    #[test]
    fn ignores_total_and_blank() {
        let p = UnixParser;
        assert!(p.ignores_line("total 0"));
        assert!(p.ignores_line("   "));
        assert!(!p.ignores_line("-rw-r--r--   1 u g 1 Jan 02 03:04 f"));
    }
}
