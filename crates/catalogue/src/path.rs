//! Capture date to destination folder path.

use crate::CaptureDate;
use derive_more::Display;

/// The `YYYY/MM/DD` folder path a file belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{year:04}/{month:02}/{day:02}")]
pub struct DatePath {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}
impl DatePath {
    /// Zero-padded `[year, month, day]` folder names.
    pub fn segments(&self) -> [String; 3] {
        [format!("{:04}", self.year), format!("{:02}", self.month), format!("{:02}", self.day)]
    }
}
impl From<&CaptureDate> for DatePath {
    fn from(capture: &CaptureDate) -> Self {
        let date = capture.date();
        Self {
            year: date.year(),
            month: u8::from(date.month()),
            day: date.day(),
        }
    }
}

/// Folder names, from the target root down, that a file captured at
/// `capture` should live under.
///
/// # Examples
///
/// ```
/// use pcat_catalogue::{CaptureDate, resolve_path};
/// use time::{Date, Month, PrimitiveDateTime, Time};
///
/// let taken = PrimitiveDateTime::new(Date::from_calendar_date(2023, Month::March, 7).unwrap(), Time::MIDNIGHT);
/// assert_eq!(resolve_path(&CaptureDate::from(taken)), ["2023", "03", "07"]);
/// ```
pub fn resolve_path(capture: &CaptureDate) -> [String; 3] {
    DatePath::from(capture).segments()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[rstest]
    #[case(CaptureDate::from(datetime!(2023-03-07 00:00)), ["2023", "03", "07"])]
    #[case(CaptureDate::from(datetime!(2022-11-05 23:59:59)), ["2022", "11", "05"])]
    #[case(CaptureDate::from(datetime!(1999-12-31 12:00)), ["1999", "12", "31"])]
    #[case(CaptureDate::from(datetime!(0800-01-01 00:00)), ["0800", "01", "01"])]
    #[case(CaptureDate::from(datetime!(2020-02-29 08:00 +14:00)), ["2020", "02", "29"])]
    fn test_resolve_path(#[case] capture: CaptureDate, #[case] expected: [&str; 3]) {
        assert_eq!(resolve_path(&capture), expected);
        // Same input, same output.
        assert_eq!(resolve_path(&capture), resolve_path(&capture));
    }

    #[test]
    fn test_display() {
        let path = DatePath::from(&CaptureDate::from(datetime!(2022-11-05 10:00)));
        assert_eq!(path.to_string(), "2022/11/05");
    }
}
