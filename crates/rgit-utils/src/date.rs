use bstr::{BStr, BString, ByteSlice, ByteVec};
use chrono::{DateTime, FixedOffset, Utc};

use crate::error::UtilError;
use crate::Result;

/// A git timestamp: seconds since the Unix epoch plus the timezone offset
/// the timestamp was recorded in.
///
/// The offset is kept in minutes from UTC (e.g. `+0200` is 120). Equality
/// compares the absolute instant only; two dates with the same `timestamp`
/// but different offsets denote the same moment.
#[derive(Debug, Clone, Copy)]
pub struct GitDate {
    /// Seconds since Unix epoch.
    pub timestamp: i64,
    /// Timezone offset in minutes from UTC.
    pub tz_offset: i32,
}

impl PartialEq for GitDate {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl Eq for GitDate {}

impl PartialOrd for GitDate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GitDate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

/// Git stores the offset as a decimal `±HHMM` (e.g. -0500 parses to -500).
fn tz_offset_to_minutes(tz: i32) -> i32 {
    let sign = if tz < 0 { -1 } else { 1 };
    let abs = tz.unsigned_abs() as i32;
    sign * ((abs / 100) * 60 + abs % 100)
}

/// Convert minutes back to the `±HHMM` decimal form.
fn minutes_to_tz_offset(minutes: i32) -> i32 {
    let sign = if minutes < 0 { -1 } else { 1 };
    let abs = minutes.unsigned_abs() as i32;
    sign * ((abs / 60) * 100 + abs % 60)
}

impl GitDate {
    /// Create a GitDate from a Unix timestamp and timezone offset in minutes.
    pub fn new(timestamp: i64, tz_offset_minutes: i32) -> Self {
        Self {
            timestamp,
            tz_offset: tz_offset_minutes,
        }
    }

    /// Parse raw git format: `"<seconds> <±HHMM>"`, offset optional.
    pub fn parse_raw(input: &str) -> Result<Self> {
        let input = input.trim();
        let mut parts = input.splitn(2, ' ');

        let ts_str = parts.next().unwrap_or("");
        let timestamp: i64 = ts_str
            .parse()
            .map_err(|_| UtilError::DateParse(format!("invalid timestamp: '{ts_str}'")))?;

        let tz_offset = match parts.next() {
            Some(tz_str) => {
                let tz_str = tz_str.trim();
                let tz_int: i32 = tz_str.parse().map_err(|_| {
                    UtilError::DateParse(format!("invalid timezone: '{tz_str}'"))
                })?;
                tz_offset_to_minutes(tz_int)
            }
            None => 0,
        };

        Ok(Self {
            timestamp,
            tz_offset,
        })
    }

    /// The instant as a `chrono` datetime in the recorded timezone.
    ///
    /// A bogus stored offset falls back to UTC; a timestamp outside
    /// chrono's representable range clamps to the epoch.
    pub fn to_datetime(&self) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(self.tz_offset * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        let utc = DateTime::<Utc>::from_timestamp(self.timestamp, 0).unwrap_or_else(|| {
            DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is representable")
        });
        utc.with_timezone(&offset)
    }

    /// Format in raw git form: `"<seconds> <±HHMM>"`.
    pub fn to_raw(&self) -> String {
        format!("{} {:+05}", self.timestamp, minutes_to_tz_offset(self.tz_offset))
    }
}

/// An authorship or committership record: who, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: BString,
    pub email: BString,
    pub date: GitDate,
}

impl Signature {
    /// Parse from git format: `Name <email> timestamp tz`
    ///
    /// Example: "John Doe <john@example.com> 1234567890 +0000"
    pub fn parse(input: &BStr) -> Result<Self> {
        let input = input.as_bytes();

        // Scan from the right: the date follows the last '>'.
        let gt_pos = input
            .iter()
            .rposition(|&b| b == b'>')
            .ok_or_else(|| UtilError::SignatureParse("missing '>' in signature".into()))?;

        let lt_pos = input[..gt_pos]
            .iter()
            .rposition(|&b| b == b'<')
            .ok_or_else(|| UtilError::SignatureParse("missing '<' in signature".into()))?;

        let name = input[..lt_pos].trim();
        let email = &input[lt_pos + 1..gt_pos];

        let date_str = input[gt_pos + 1..].trim();
        let date_str = std::str::from_utf8(date_str)
            .map_err(|_| UtilError::SignatureParse("non-UTF-8 date in signature".into()))?;
        let date = GitDate::parse_raw(date_str)?;

        Ok(Self {
            name: BString::from(name),
            email: BString::from(email),
            date,
        })
    }

    /// Format in git's canonical form: `Name <email> timestamp tz`
    pub fn to_bytes(&self) -> BString {
        let mut out = BString::new(Vec::new());
        out.push_str(&self.name);
        out.push_str(b" <");
        out.push_str(&self.email);
        out.push_str(b"> ");
        out.push_str(self.date.to_raw().as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_raw_with_offset() {
        let d = GitDate::parse_raw("1234567890 +0200").unwrap();
        assert_eq!(d.timestamp, 1234567890);
        assert_eq!(d.tz_offset, 120);
    }

    #[test]
    fn parse_raw_negative_offset() {
        let d = GitDate::parse_raw("1234567890 -0530").unwrap();
        assert_eq!(d.tz_offset, -330);
    }

    #[test]
    fn parse_raw_without_offset() {
        let d = GitDate::parse_raw("1234567890").unwrap();
        assert_eq!(d.timestamp, 1234567890);
        assert_eq!(d.tz_offset, 0);
    }

    #[test]
    fn parse_raw_invalid() {
        assert!(GitDate::parse_raw("not-a-date").is_err());
        assert!(GitDate::parse_raw("123 bad").is_err());
    }

    #[test]
    fn equality_ignores_offset() {
        // 22:13:13 +0200 and 20:13:13 +0000 are the same instant.
        let a = GitDate::new(1112904793, 120);
        let b = GitDate::new(1112904793, 0);
        assert_eq!(a, b);
        assert_ne!(a, GitDate::new(1112904794, 120));
    }

    #[test]
    fn raw_roundtrip() {
        for s in ["1234567890 +0000", "1234567890 +0200", "1234567890 -0530"] {
            let d = GitDate::parse_raw(s).unwrap();
            assert_eq!(d.to_raw(), s);
        }
    }

    #[test]
    fn datetime_conversion() {
        let d = GitDate::new(1112904793, 120);
        let dt = d.to_datetime();
        assert_eq!(dt.timestamp(), 1112904793);
        assert_eq!(dt.offset().local_minus_utc(), 120 * 60);
    }

    #[test]
    fn parse_signature() {
        let sig =
            Signature::parse(BStr::new(b"John Doe <john@example.com> 1234567890 +0000"))
                .unwrap();
        assert_eq!(sig.name, "John Doe");
        assert_eq!(sig.email, "john@example.com");
        assert_eq!(sig.date.timestamp, 1234567890);
    }

    #[test]
    fn parse_signature_with_angle_in_name() {
        // Scanning from the right keeps odd names intact.
        let sig = Signature::parse(BStr::new(b"A <b> C <x@y.z> 100 +0100")).unwrap();
        assert_eq!(sig.name, "A <b> C");
        assert_eq!(sig.email, "x@y.z");
        assert_eq!(sig.date.tz_offset, 60);
    }

    #[test]
    fn parse_signature_missing_email() {
        assert!(Signature::parse(BStr::new(b"No Email Here 123 +0000")).is_err());
    }

    #[test]
    fn signature_roundtrip() {
        let raw = b"Test Author <author@example.com> 1112904793 +0200";
        let sig = Signature::parse(BStr::new(raw)).unwrap();
        assert_eq!(sig.to_bytes(), raw.as_slice());
    }
}
