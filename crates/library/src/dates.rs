//! Calendar date sequences used as placeholder values.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::format_description::{self, BorrowedFormatItem};
use time::{Date, Duration, Month};

/// Format used by [`date_seq`]: `20000131`.
pub const DEFAULT_DATE_FORMAT: &str = "[year][month][day]";

/// A calendar step. Years and months are applied first, clamping the day to
/// the length of the target month, then weeks and days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delta {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
}

impl Delta {
    pub fn years(years: u32) -> Self {
        Self { years, ..Self::default() }
    }

    pub fn months(months: u32) -> Self {
        Self { months, ..Self::default() }
    }

    pub fn weeks(weeks: u32) -> Self {
        Self { weeks, ..Self::default() }
    }

    pub fn days(days: u32) -> Self {
        Self { days, ..Self::default() }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// `date + n * self`, or `None` past the representable range.
    fn times(&self, date: Date, n: u32) -> Option<Date> {
        let months = i64::from(self.years) * 12 + i64::from(self.months);
        let index = i64::from(date.year()) * 12 + i64::from(u8::from(date.month()) - 1) + months * i64::from(n);
        let year = i32::try_from(index.div_euclid(12)).ok()?;
        let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
        let day = date.day().min(month_length(year, month));
        let shifted = Date::from_calendar_date(year, month, day).ok()?;

        let days = (i64::from(self.weeks) * 7 + i64::from(self.days)) * i64::from(n);
        shifted.checked_add(Duration::days(days))
    }
}

fn month_length(year: i32, month: Month) -> u8 {
    match month {
        Month::February if time::util::is_leap_year(year) => 29,
        Month::February => 28,
        Month::April | Month::June | Month::September | Month::November => 30,
        _ => 31,
    }
}

fn parse_format(format: &str) -> Result<Vec<BorrowedFormatItem<'_>>> {
    format_description::parse(format).or_raise(|| ErrorKind::InvalidDate(format!("bad format `{format}`")))
}

/// Dates from `start` up to and including `end`, spaced by a [`Delta`].
///
/// The n-th date is computed from `start` directly rather than from the
/// previous date, so a sequence starting on the 31st returns to the 31st in
/// every month long enough to have one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSeq {
    start: Date,
    end: Date,
    delta: Delta,
    feb29: bool,
}

impl DateSeq {
    pub fn new(start: Date, end: Date, delta: Delta) -> Result<Self> {
        if delta.is_zero() {
            exn::bail!(ErrorKind::InvalidDelta("delta must advance by at least one day".to_string()));
        }
        Ok(Self { start, end, delta, feb29: true })
    }

    /// Parses both bounds with a `time` format description such as
    /// [`DEFAULT_DATE_FORMAT`].
    pub fn parse(start: &str, end: &str, delta: Delta, format: &str) -> Result<Self> {
        let items = parse_format(format)?;
        let date = |value: &str| {
            Date::parse(value, &items).or_raise(|| ErrorKind::InvalidDate(format!("`{value}` does not match `{format}`")))
        };
        Self::new(date(start)?, date(end)?, delta)
    }

    /// With `false`, any generated 29 February becomes 28 February.
    pub fn feb29(mut self, keep: bool) -> Self {
        self.feb29 = keep;
        self
    }

    pub fn dates(&self) -> Vec<Date> {
        (0..)
            .map_while(|n| self.delta.times(self.start, n))
            .take_while(|date| *date <= self.end)
            .map(|date| match date.replace_day(28) {
                Ok(feb28) if !self.feb29 && date.month() == Month::February && date.day() == 29 => feb28,
                _ => date,
            })
            .collect()
    }

    pub fn format(&self, format: &str) -> Result<Vec<String>> {
        let items = parse_format(format)?;
        self.dates()
            .into_iter()
            .map(|date| date.format(&items).or_raise(|| ErrorKind::InvalidDate(date.to_string())))
            .collect()
    }
}

/// Every date from `start` to `end` in [`DEFAULT_DATE_FORMAT`], ready to be
/// passed to [`FileList::expand`](crate::FileList::expand).
///
/// ```
/// use sheaf_library::{Delta, date_seq};
///
/// let months = date_seq("20000101", "20001231", Delta::months(1)).unwrap();
/// assert_eq!(months.len(), 12);
/// assert_eq!(months.last().map(String::as_str), Some("20001201"));
/// ```
pub fn date_seq(start: &str, end: &str, delta: Delta) -> Result<Vec<String>> {
    DateSeq::parse(start, end, delta, DEFAULT_DATE_FORMAT)?.format(DEFAULT_DATE_FORMAT)
}
