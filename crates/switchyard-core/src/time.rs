// SPDX-License-Identifier: Apache-2.0
//! Calendar and clock value types.
//!
//! The service calendar covers June through August of a single year; a
//! [`Date`] is a day offset from June 1st. An [`Instant`] is a time of day
//! relative to a train's origin date and may run past midnight (a segment
//! arriving at 26:30 arrives at 02:30 the next day); [`Moment`] is the
//! normalized (date, time-of-day) pair used for display and comparison.

use std::fmt;

use switchyard_store::codec::{ByteReader, ByteWriter, CodecError, Record};

const MINUTES_PER_DAY: i32 = 24 * 60;
/// Cumulative days before June, July and August (relative to June 1st).
const MONTH_STARTS: [i32; 3] = [0, 30, 61];
const FIRST_MONTH: i32 = 6;
/// Days covered by the calendar (June + July + August).
const CALENDAR_DAYS: i32 = 92;

/// A calendar day, stored as the offset from June 1st.
///
/// Arithmetic may step outside the calendar (a journey starting May 31st
/// does not exist, but `date - overflow` can produce it transiently);
/// [`Date::in_range`] and the parser keep observable dates inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(i32);

impl Date {
    /// Parse a strict `MM-DD` string within the June–August calendar.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (month, day) = split_two_digit_pair(text, b'-')?;
        let month_ix = month.checked_sub(FIRST_MONTH)?;
        if month_ix >= 3 {
            return None;
        }
        let days_in_month = match month_ix {
            0 => 30,
            1 | 2 => 31,
            _ => return None,
        };
        if day < 1 || day > days_in_month {
            return None;
        }
        Some(Self(MONTH_STARTS[month_ix as usize] + day - 1))
    }

    /// Month number (6–8 inside the calendar).
    #[must_use]
    pub fn month(self) -> i32 {
        if self.0 >= MONTH_STARTS[2] {
            FIRST_MONTH + 2
        } else if self.0 >= MONTH_STARTS[1] {
            FIRST_MONTH + 1
        } else {
            FIRST_MONTH
        }
    }

    /// Day of month (1-based).
    #[must_use]
    pub fn day(self) -> i32 {
        let month_ix = (self.month() - FIRST_MONTH) as usize;
        self.0 - MONTH_STARTS[month_ix] + 1
    }

    /// Day offset from June 1st.
    #[must_use]
    pub fn days(self) -> i32 {
        self.0
    }

    /// The date `days` later.
    #[must_use]
    pub fn plus(self, days: i32) -> Self {
        Self(self.0 + days)
    }

    /// The date `days` earlier.
    #[must_use]
    pub fn minus(self, days: i32) -> Self {
        Self(self.0 - days)
    }

    /// Whole days from `rhs` to `self`.
    #[must_use]
    pub fn diff(self, rhs: Self) -> i32 {
        self.0 - rhs.0
    }

    /// Inclusive range check.
    #[must_use]
    pub fn in_range(self, begin: Self, end: Self) -> bool {
        begin.0 <= self.0 && self.0 <= end.0
    }

    /// True when the date lies inside the supported calendar at all.
    #[must_use]
    pub fn in_calendar(self) -> bool {
        (0..CALENDAR_DAYS).contains(&self.0)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month(), self.day())
    }
}

impl Record for Date {
    const BYTES: usize = 4;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_i32(self.0);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self(input.i32()?))
    }
}

/// A signed span of time, in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(i32);

impl Duration {
    /// A span of `minutes` minutes.
    #[must_use]
    pub fn minutes(minutes: i32) -> Self {
        Self(minutes)
    }

    /// Parse a strict `HH:MM` string (hours unbounded at two digits).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (hours, mins) = split_two_digit_pair(text, b':')?;
        if !(0..60).contains(&mins) {
            return None;
        }
        Some(Self(hours * 60 + mins))
    }

    /// Total minutes in the span.
    #[must_use]
    pub fn total_minutes(self) -> i32 {
        self.0
    }
}

/// A clock reading relative to some origin day's midnight.
///
/// Unlike [`Duration`] this is a point in time, and it may overflow past
/// midnight any number of days; [`Instant::days_overflow`] recovers the day
/// carry and [`Instant::minute_of_day`] the in-day remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(i32);

impl Instant {
    /// Parse a strict `HH:MM` time of day (hours below 24).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (hours, mins) = split_two_digit_pair(text, b':')?;
        if !(0..24).contains(&hours) || !(0..60).contains(&mins) {
            return None;
        }
        Some(Self(hours * 60 + mins))
    }

    /// Days carried past the origin date.
    #[must_use]
    pub fn days_overflow(self) -> i32 {
        self.0.div_euclid(MINUTES_PER_DAY)
    }

    /// Minutes past midnight of the day the instant falls on.
    #[must_use]
    pub fn minute_of_day(self) -> i32 {
        self.0.rem_euclid(MINUTES_PER_DAY)
    }

    /// The instant `span` later.
    #[must_use]
    pub fn plus(self, span: Duration) -> Self {
        Self(self.0 + span.total_minutes())
    }

    /// The span from `rhs` up to `self`.
    #[must_use]
    pub fn since(self, rhs: Self) -> Duration {
        Duration::minutes(self.0 - rhs.0)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minute = self.minute_of_day();
        write!(f, "{:02}:{:02}", minute / 60, minute % 60)
    }
}

impl Record for Instant {
    const BYTES: usize = 4;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_i32(self.0);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self(input.i32()?))
    }
}

/// A normalized calendar point: date plus minutes past its midnight.
///
/// Built from an origin [`Date`] and a possibly-overflowing [`Instant`];
/// renders as `MM-DD HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Moment {
    date: Date,
    minute: i32,
}

impl Moment {
    /// Normalize `at` against the origin date it is relative to.
    #[must_use]
    pub fn new(origin: Date, at: Instant) -> Self {
        Self {
            date: origin.plus(at.days_overflow()),
            minute: at.minute_of_day(),
        }
    }

    /// Calendar day of the moment.
    #[must_use]
    pub fn date(self) -> Date {
        self.date
    }

    /// Minutes past the moment's midnight.
    #[must_use]
    pub fn minute_of_day(self) -> i32 {
        self.minute
    }

    /// Minutes from `rhs` up to `self`.
    #[must_use]
    pub fn minutes_since(self, rhs: Self) -> i32 {
        self.date.diff(rhs.date) * MINUTES_PER_DAY + self.minute - rhs.minute
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}",
            self.date,
            self.minute / 60,
            self.minute % 60
        )
    }
}

/// Parse `"NN<sep>NN"` as two two-digit decimal numbers.
fn split_two_digit_pair(text: &str, sep: u8) -> Option<(i32, i32)> {
    let raw = text.as_bytes();
    if raw.len() != 5 || raw[2] != sep {
        return None;
    }
    let digit = |b: u8| -> Option<i32> { b.is_ascii_digit().then(|| i32::from(b - b'0')) };
    let first = digit(raw[0])? * 10 + digit(raw[1])?;
    let second = digit(raw[3])? * 10 + digit(raw[4])?;
    Some((first, second))
}
