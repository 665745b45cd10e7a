//! # **TimeUnits Module** - *Arrow Temporal Units*
//!
//! Units carried inside temporal format strings.
//!
//! `TimeUnit` covers the second, millisecond, microsecond and nanosecond resolutions
//! used by `time`, `timestamp` and `duration` formats.
//! `IntervalUnit` specifies year–month, day–time, or month–day–nanosecond intervals.
//!
//! Both map one-to-one onto the single-character unit codes of the Arrow C format
//! vocabulary, e.g. `tsu:UTC` or `tiM`.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// # TimeUnit
///
/// Resolution of a temporal value.
///
/// ## Behaviour
/// - Parsed from the trailing unit code of `tt?`, `ts?` and `tD?` formats.
/// - Rendered back to the same code by [`TimeUnit::code`].
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Maps a C format unit code (`s`, `m`, `u`, `n`) to its unit.
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b's' => Some(TimeUnit::Seconds),
            b'm' => Some(TimeUnit::Milliseconds),
            b'u' => Some(TimeUnit::Microseconds),
            b'n' => Some(TimeUnit::Nanoseconds),
            _ => None,
        }
    }

    /// The C format unit code.
    #[inline]
    pub fn code(&self) -> char {
        match self {
            TimeUnit::Seconds => 's',
            TimeUnit::Milliseconds => 'm',
            TimeUnit::Microseconds => 'u',
            TimeUnit::Nanoseconds => 'n',
        }
    }
}

/// # IntervalUnit
///
/// Inner Arrow discriminant for interval types.
///
/// The physical width differs per unit: 4 bytes for `YearMonth`, 8 for
/// `DayTime`, and 16 for `MonthDayNano`.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum IntervalUnit {
    YearMonth,
    DayTime,
    MonthDayNano,
}

impl IntervalUnit {
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'M' => Some(IntervalUnit::YearMonth),
            b'D' => Some(IntervalUnit::DayTime),
            b'n' => Some(IntervalUnit::MonthDayNano),
            _ => None,
        }
    }

    #[inline]
    pub fn code(&self) -> char {
        match self {
            IntervalUnit::YearMonth => 'M',
            IntervalUnit::DayTime => 'D',
            IntervalUnit::MonthDayNano => 'n',
        }
    }

    /// Width in bytes of one interval value.
    #[inline]
    pub fn byte_width(&self) -> usize {
        match self {
            IntervalUnit::YearMonth => 4,
            IntervalUnit::DayTime => 8,
            IntervalUnit::MonthDayNano => 16,
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TimeUnit::Seconds => f.write_str("Seconds"),
            TimeUnit::Milliseconds => f.write_str("Milliseconds"),
            TimeUnit::Microseconds => f.write_str("Microseconds"),
            TimeUnit::Nanoseconds => f.write_str("Nanoseconds"),
        }
    }
}

impl Display for IntervalUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            IntervalUnit::YearMonth => f.write_str("YearMonth"),
            IntervalUnit::DayTime => f.write_str("DayTime"),
            IntervalUnit::MonthDayNano => f.write_str("MonthDayNano"),
        }
    }
}
