//! Calendar and clock facts
//!
//! Dates follow a thirteen-month calendar of 28-day months, with the
//! remaining day (two in leap years) outside any month. The clock is the
//! elapsed fraction of the day in thousandths, written `above:below`.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Serialize;

use crate::error::{ParadoxError, Result};

pub const MONTHS: [&str; 13] = [
    "Unesamber",
    "Dutesamber",
    "Trisesamber",
    "Tetresamber",
    "Pentesamber",
    "Hexesamber",
    "Sevesamber",
    "Octesamber",
    "Novesamber",
    "Desamber",
    "Undesamber",
    "Dodesamber",
    "Tridesamber",
];

const DAYS_PER_MONTH: u32 = 28;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarFacts {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub time: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockFacts {
    pub month_name: String,
    pub month: u32,
    pub day: u32,
    pub year: i32,
    pub date: String,
    pub clock: String,
    pub above: String,
    pub below: String,
    pub timestamp: String,
    pub calendar: CalendarFacts,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    offset: Option<FixedOffset>,
}

impl Clock {
    /// A clock in the host's local time zone.
    pub fn local() -> Self {
        Self { offset: None }
    }

    /// A clock at a fixed offset from UTC, in hours.
    pub fn with_offset_hours(hours: i64) -> Result<Self> {
        let offset = i32::try_from(hours * 3600)
            .ok()
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ParadoxError::Eval(format!("invalid time zone offset: {}", hours)))?;
        Ok(Self { offset: Some(offset) })
    }

    fn wall_time(&self, at: DateTime<Utc>) -> NaiveDateTime {
        match self.offset {
            Some(offset) => at.with_timezone(&offset).naive_local(),
            None => at.with_timezone(&Local).naive_local(),
        }
    }

    pub fn now(&self) -> ClockFacts {
        self.facts(Utc::now())
    }

    pub fn facts(&self, at: DateTime<Utc>) -> ClockFacts {
        let wall = self.wall_time(at);
        let year = wall.year();
        let leap = NaiveDate::from_ymd_opt(year, 2, 29).is_some();
        let yd = wall.ordinal0();
        let months_span = DAYS_PER_MONTH * MONTHS.len() as u32;

        let (month_name, month, day, date) = if yd < months_span {
            let month = yd / DAYS_PER_MONTH + 1;
            let day = yd % DAYS_PER_MONTH + 1;
            let name = MONTHS[(month - 1) as usize].to_string();
            let date = format!("{} {}, {}", name, day, year);
            (name, month, day, date)
        } else {
            let name = if leap && yd > months_span { "Leap Day" } else { "Year Day" };
            let month = MONTHS.len() as u32 + 1;
            (name.to_string(), month, 1, format!("{}, {}", name, year))
        };

        let seconds =
            f64::from(wall.num_seconds_from_midnight()) + f64::from(wall.nanosecond()) / 1e9;
        let thousandths = seconds / 86_400.0 * 1000.0;
        let clock = format!("{:07.3}", thousandths).replace('.', ":");
        let (above, below) = clock
            .split_once(':')
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .unwrap_or_default();

        ClockFacts {
            timestamp: format!("{} {}", date, clock),
            month_name,
            month,
            day,
            year,
            date,
            clock,
            above,
            below,
            calendar: CalendarFacts {
                day: wall.day(),
                month: wall.month(),
                year,
                hour: wall.hour(),
                minute: wall.minute(),
                second: wall.second(),
                time: wall.time().format("%H:%M:%S").to_string(),
                date: wall.date().format("%Y-%m-%d").to_string(),
            },
        }
    }

    /// Render a moment as `"<date> <clock>"`.
    pub fn to_str(&self, at: DateTime<Utc>) -> String {
        self.facts(at).timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_first_day() {
        let clock = Clock::with_offset_hours(0).unwrap();
        let facts = clock.facts(utc(2023, 1, 1, 0, 0));
        assert_eq!(facts.month_name, "Unesamber");
        assert_eq!(facts.day, 1);
        assert_eq!(facts.clock, "000:000");
        assert_eq!(facts.timestamp, "Unesamber 1, 2023 000:000");
    }

    #[test]
    fn test_midday_clock() {
        let clock = Clock::with_offset_hours(0).unwrap();
        let facts = clock.facts(utc(2023, 1, 29, 12, 0));
        assert_eq!(facts.month_name, "Dutesamber");
        assert_eq!(facts.day, 1);
        assert_eq!(facts.clock, "500:000");
        assert_eq!(facts.above, "500");
        assert_eq!(facts.below, "000");
        assert_eq!(facts.calendar.hour, 12);
    }

    #[test]
    fn test_year_and_leap_day() {
        let clock = Clock::with_offset_hours(0).unwrap();
        assert_eq!(clock.facts(utc(2023, 12, 31, 1, 0)).month_name, "Year Day");
        assert_eq!(clock.facts(utc(2024, 12, 30, 1, 0)).month_name, "Year Day");
        assert_eq!(clock.facts(utc(2024, 12, 31, 1, 0)).month_name, "Leap Day");
    }

    #[test]
    fn test_offset_shifts_wall_time() {
        let clock = Clock::with_offset_hours(6).unwrap();
        let facts = clock.facts(utc(2023, 1, 1, 6, 0));
        assert_eq!(facts.calendar.hour, 12);
        assert_eq!(facts.clock, "500:000");
    }

    #[test]
    fn test_invalid_offset() {
        assert!(Clock::with_offset_hours(100).is_err());
    }
}
