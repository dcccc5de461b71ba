//! Temporal value data model: raw date, time, date-time, and interval containers.
//!
//! These types carry validated components (year/month/day, hour/minute/second/nanosecond, and an
//! optional UTC offset) without depending on a calendar/clock library. They exist as a pure data
//! model, per spec.md's "Excluded collaborators (thin)": wiring them into a general-purpose
//! calendar type is left to the host application.

use std::io::{Read, Write};

use crate::error::{Error, ErrorKind, Result};
use crate::packed;

const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn range_err(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::Range(msg.into()), Default::default())
}

/// A calendar date: `year` may be any signed value, `month` is `1..=12`, `day` is
/// `1..=days_in_month(year, month)` (Feb 29 only in leap years).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl RawDate {
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(range_err(format!("month {} out of range 1..=12", month)));
        }
        let max_day = if month == 2 && is_leap_year(year) {
            29
        } else {
            DAYS_IN_MONTH[(month - 1) as usize]
        };
        if !(1..=max_day).contains(&day) {
            return Err(range_err(format!(
                "day {} out of range 1..={} for {}-{:02}",
                day, max_day, year, month
            )));
        }
        Ok(Self { year, month, day })
    }

    pub fn write<W: Write>(&self, dst: &mut W) -> Result<()> {
        packed::encode_i32(self.year, dst)?;
        packed::encode_i32(self.month as i32, dst)?;
        packed::encode_i32(self.day as i32, dst)?;
        Ok(())
    }

    pub fn read<R: Read>(src: &mut R) -> Result<Self> {
        let year = packed::decode_i32(src)?;
        let month = packed::decode_i32(src)?;
        let day = packed::decode_i32(src)?;
        RawDate::new(year, month as u8, day as u8)
    }
}

/// A zone qualifier for [RawTime]: no zone information, UTC (`Z`), or a fixed offset from UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneType {
    None,
    Utc,
    Offset { hour_offset: i8, minute_offset: u8 },
}

const ZONE_TAG_NONE: i32 = 0;
const ZONE_TAG_UTC: i32 = 1;
const ZONE_TAG_OFFSET: i32 = 2;

impl ZoneType {
    pub fn write<W: Write>(&self, dst: &mut W) -> Result<()> {
        match *self {
            ZoneType::None => {
                packed::encode_i32(ZONE_TAG_NONE, dst)?;
            }
            ZoneType::Utc => {
                packed::encode_i32(ZONE_TAG_UTC, dst)?;
            }
            ZoneType::Offset {
                hour_offset,
                minute_offset,
            } => {
                packed::encode_i32(ZONE_TAG_OFFSET, dst)?;
                packed::encode_i32(hour_offset as i32, dst)?;
                packed::encode_i32(minute_offset as i32, dst)?;
            }
        }
        Ok(())
    }

    pub fn read<R: Read>(src: &mut R) -> Result<Self> {
        match packed::decode_i32(src)? {
            ZONE_TAG_NONE => Ok(ZoneType::None),
            ZONE_TAG_UTC => Ok(ZoneType::Utc),
            ZONE_TAG_OFFSET => {
                let hour_offset = packed::decode_i32(src)?;
                let minute_offset = packed::decode_i32(src)?;
                Ok(ZoneType::Offset {
                    hour_offset: hour_offset as i8,
                    minute_offset: minute_offset as u8,
                })
            }
            other => Err(Error::new(
                ErrorKind::Range(format!("unknown zone tag {}", other)),
                Default::default(),
            )),
        }
    }
}

/// A time of day with nanosecond resolution and optional zone information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
    pub zone: ZoneType,
}

impl RawTime {
    pub fn new(
        hour: u8,
        minute: u8,
        second: u8,
        nanosecond: u32,
        zone: ZoneType,
    ) -> Result<Self> {
        if hour > 23 {
            return Err(range_err(format!("hour {} out of range 0..=23", hour)));
        }
        if minute > 59 {
            return Err(range_err(format!("minute {} out of range 0..=59", minute)));
        }
        if second > 60 {
            return Err(range_err(format!("second {} out of range 0..=60", second)));
        }
        if second == 60 && nanosecond != 0 {
            return Err(range_err("leap second 60 must have nanosecond == 0"));
        }
        if nanosecond > 999_999_999 {
            return Err(range_err(format!(
                "nanosecond {} out of range 0..=999_999_999",
                nanosecond
            )));
        }
        if let ZoneType::Offset {
            hour_offset,
            minute_offset,
        } = zone
        {
            if !(-23..=23).contains(&hour_offset) {
                return Err(range_err(format!(
                    "hour_offset {} out of range -23..=23",
                    hour_offset
                )));
            }
            if minute_offset > 59 {
                return Err(range_err(format!(
                    "minute_offset {} out of range 0..=59",
                    minute_offset
                )));
            }
        }
        Ok(Self {
            hour,
            minute,
            second,
            nanosecond,
            zone,
        })
    }

    /// The wire `fraction` value for this time: non-negative milliseconds, or the negated
    /// nanosecond count when sub-millisecond precision is present (spec §6).
    pub fn wire_fraction(&self) -> i64 {
        if self.nanosecond % 1_000_000 == 0 {
            (self.nanosecond / 1_000_000) as i64
        } else {
            -(self.nanosecond as i64)
        }
    }

    /// Reconstructs the nanosecond count from a wire `fraction` value.
    pub fn nanosecond_from_wire_fraction(fraction: i64) -> u32 {
        if fraction >= 0 {
            (fraction as u32).saturating_mul(1_000_000)
        } else {
            (-fraction) as u32
        }
    }

    pub fn write<W: Write>(&self, dst: &mut W) -> Result<()> {
        packed::encode_i32(self.hour as i32, dst)?;
        packed::encode_i32(self.minute as i32, dst)?;
        packed::encode_i32(self.second as i32, dst)?;
        packed::encode_i64(self.wire_fraction(), dst)?;
        self.zone.write(dst)?;
        Ok(())
    }

    pub fn read<R: Read>(src: &mut R) -> Result<Self> {
        let hour = packed::decode_i32(src)?;
        let minute = packed::decode_i32(src)?;
        let second = packed::decode_i32(src)?;
        let fraction = packed::decode_i64(src)?;
        let zone = ZoneType::read(src)?;
        RawTime::new(
            hour as u8,
            minute as u8,
            second as u8,
            Self::nanosecond_from_wire_fraction(fraction),
            zone,
        )
    }
}

/// A date and a time of day together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDateTime {
    pub date: RawDate,
    pub time: RawTime,
}

impl RawDateTime {
    pub fn write<W: Write>(&self, dst: &mut W) -> Result<()> {
        self.date.write(dst)?;
        self.time.write(dst)
    }

    pub fn read<R: Read>(src: &mut R) -> Result<Self> {
        let date = RawDate::read(src)?;
        let time = RawTime::read(src)?;
        Ok(Self { date, time })
    }
}

/// A year/month interval, e.g. "2 years, 3 months".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawYearMonthInterval {
    pub years: i32,
    pub months: i32,
}

impl RawYearMonthInterval {
    pub fn write<W: Write>(&self, dst: &mut W) -> Result<()> {
        packed::encode_i32(self.years, dst)?;
        packed::encode_i32(self.months, dst)?;
        Ok(())
    }

    pub fn read<R: Read>(src: &mut R) -> Result<Self> {
        Ok(Self {
            years: packed::decode_i32(src)?,
            months: packed::decode_i32(src)?,
        })
    }
}

/// A time-of-day-shaped interval (hours/minutes/seconds/nanoseconds, no day component).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawTimeInterval {
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub nanoseconds: i32,
}

impl RawTimeInterval {
    pub fn write<W: Write>(&self, dst: &mut W) -> Result<()> {
        packed::encode_i32(self.hours, dst)?;
        packed::encode_i32(self.minutes, dst)?;
        packed::encode_i32(self.seconds, dst)?;
        packed::encode_i32(self.nanoseconds, dst)?;
        Ok(())
    }

    pub fn read<R: Read>(src: &mut R) -> Result<Self> {
        Ok(Self {
            hours: packed::decode_i32(src)?,
            minutes: packed::decode_i32(src)?,
            seconds: packed::decode_i32(src)?,
            nanoseconds: packed::decode_i32(src)?,
        })
    }
}

/// A day/time interval, e.g. "3 days, 4 hours, 5 minutes".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDayTimeInterval {
    pub days: i32,
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub nanoseconds: i32,
}

impl RawDayTimeInterval {
    pub fn write<W: Write>(&self, dst: &mut W) -> Result<()> {
        packed::encode_i32(self.days, dst)?;
        packed::encode_i32(self.hours, dst)?;
        packed::encode_i32(self.minutes, dst)?;
        packed::encode_i32(self.seconds, dst)?;
        packed::encode_i32(self.nanoseconds, dst)?;
        Ok(())
    }

    pub fn read<R: Read>(src: &mut R) -> Result<Self> {
        Ok(Self {
            days: packed::decode_i32(src)?,
            hours: packed::decode_i32(src)?,
            minutes: packed::decode_i32(src)?,
            seconds: packed::decode_i32(src)?,
            nanoseconds: packed::decode_i32(src)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_year_feb_29_is_valid_only_in_leap_years() {
        assert!(RawDate::new(2024, 2, 29).is_ok());
        assert!(RawDate::new(2023, 2, 29).is_err());
        assert!(RawDate::new(1900, 2, 29).is_err()); // divisible by 100, not 400
        assert!(RawDate::new(2000, 2, 29).is_ok()); // divisible by 400
    }

    #[test]
    fn time_rejects_out_of_range_components() {
        assert!(RawTime::new(24, 0, 0, 0, ZoneType::None).is_err());
        assert!(RawTime::new(23, 60, 0, 0, ZoneType::None).is_err());
        assert!(RawTime::new(23, 59, 61, 0, ZoneType::None).is_err());
        assert!(RawTime::new(23, 59, 60, 0, ZoneType::None).is_ok());
        assert!(RawTime::new(23, 59, 60, 1, ZoneType::None).is_err());
    }

    #[test]
    fn wire_fraction_round_trips_millis_and_nanos() {
        let t = RawTime::new(1, 2, 3, 500_000_000, ZoneType::Utc).unwrap();
        assert_eq!(t.wire_fraction(), 500);
        assert_eq!(RawTime::nanosecond_from_wire_fraction(500), 500_000_000);

        let t = RawTime::new(1, 2, 3, 123, ZoneType::Utc).unwrap();
        assert_eq!(t.wire_fraction(), -123);
        assert_eq!(RawTime::nanosecond_from_wire_fraction(-123), 123);
    }

    #[test]
    fn date_time_wire_roundtrip() {
        let dt = RawDateTime {
            date: RawDate::new(2026, 7, 28).unwrap(),
            time: RawTime::new(13, 45, 30, 250_000_000, ZoneType::Utc).unwrap(),
        };
        let mut buf = Vec::new();
        dt.write(&mut buf).unwrap();
        let mut cur = std::io::Cursor::new(&buf);
        assert_eq!(RawDateTime::read(&mut cur).unwrap(), dt);
    }

    #[test]
    fn offset_zone_validates_ranges() {
        assert!(RawTime::new(
            1,
            0,
            0,
            0,
            ZoneType::Offset {
                hour_offset: 24,
                minute_offset: 0
            }
        )
        .is_err());
        assert!(RawTime::new(
            1,
            0,
            0,
            0,
            ZoneType::Offset {
                hour_offset: -5,
                minute_offset: 30
            }
        )
        .is_ok());
    }
}
