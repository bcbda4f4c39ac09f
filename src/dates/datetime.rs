use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use crate::dates::calendar::{days_in_month, to_astronomical, NANOS_PER_SECOND};
use crate::dates::Field;
use crate::core::qm::Error;
use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::str::FromStr;

/// The most extreme timezone offset in either direction, in minutes.
pub const MAX_TIMEZONE_MINUTES: i16 = 14 * 60;

/// The era of a year. The lexical forms express the era through the sign of
/// the year; this field exists for patterns that spell it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Era {
    BeforeCommonEra,
    CommonEra,
}

impl Era {
    /// The era a lexical year falls in.
    pub fn of_year(year: i64) -> Era {
        if year < 0 {
            Era::BeforeCommonEra
        } else {
            Era::CommonEra
        }
    }
}

/// The XML Schema datatype a partial date-time belongs to, determined by
/// which of its fields are defined. The timezone and era do not affect the
/// kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XsdKind {
    DateTime,
    Date,
    GYearMonth,
    GYear,
    GMonthDay,
    GMonth,
    GDay,
    Time,
}

/// The fields of a partial date-time, each of which may be undefined. This
/// is a plain record with no invariants: it is used to build and take apart
/// a `PartialDateTime`, which validates it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateTimeFields {
    pub era: Option<Era>,
    pub year: Option<i64>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
    /// Fraction of a second, in nanoseconds
    pub fraction: Option<u32>,
    /// Offset from UTC in minutes
    pub timezone: Option<i16>,
}

/// A date, a time, or a combination of the two where any field may be
/// missing. This models the seven XML Schema date and time types (for
/// example `gYearMonth` or `time`) with one type, as well as a `dateTime`
/// with or without a timezone.
///
/// A PartialDateTime is immutable. Arithmetic and normalization return new
/// values with the same pattern of defined fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialDateTime {
    fields: DateTimeFields,
}

impl PartialDateTime {
    /// Validates the fields and builds a value from them. Each defined
    /// field must lie in its natural range, the day must exist in the month
    /// (February allows the 29th when the year is undefined), hour 24 is
    /// only allowed at exactly midnight, and year zero does not exist.
    pub fn from_fields(fields: DateTimeFields) -> Result<PartialDateTime, Error> {
        validate(&fields)?;
        Ok(PartialDateTime { fields })
    }

    /// A complete date and time, with whole seconds.
    pub fn date_time(
        year: i64,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        timezone: Option<i16>,
    ) -> Result<PartialDateTime, Error> {
        PartialDateTime::from_fields(DateTimeFields {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            hour: Some(hour),
            minute: Some(minute),
            second: Some(second),
            timezone,
            ..Default::default()
        })
    }

    pub fn date(year: i64, month: u8, day: u8, timezone: Option<i16>) -> Result<PartialDateTime, Error> {
        PartialDateTime::from_fields(DateTimeFields {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            timezone,
            ..Default::default()
        })
    }

    pub fn time(hour: u8, minute: u8, second: u8, timezone: Option<i16>) -> Result<PartialDateTime, Error> {
        PartialDateTime::from_fields(DateTimeFields {
            hour: Some(hour),
            minute: Some(minute),
            second: Some(second),
            timezone,
            ..Default::default()
        })
    }

    /// Builds a value from fields that are already known to be valid. Only
    /// the arithmetic in this crate uses this, where the algorithms
    /// guarantee the ranges.
    pub(crate) fn from_valid_fields(fields: DateTimeFields) -> PartialDateTime {
        debug_assert!(validate(&fields).is_ok(), "invalid fields {:?}", fields);
        PartialDateTime { fields }
    }

    pub fn fields(&self) -> DateTimeFields {
        self.fields
    }

    pub fn era(&self) -> Option<Era> {
        self.fields.era
    }

    pub fn year(&self) -> Option<i64> {
        self.fields.year
    }

    pub fn month(&self) -> Option<u8> {
        self.fields.month
    }

    pub fn day(&self) -> Option<u8> {
        self.fields.day
    }

    pub fn hour(&self) -> Option<u8> {
        self.fields.hour
    }

    pub fn minute(&self) -> Option<u8> {
        self.fields.minute
    }

    pub fn second(&self) -> Option<u8> {
        self.fields.second
    }

    /// The fraction of a second in nanoseconds.
    pub fn fraction(&self) -> Option<u32> {
        self.fields.fraction
    }

    /// The offset from UTC in minutes.
    pub fn timezone(&self) -> Option<i16> {
        self.fields.timezone
    }

    /// The seconds including the fraction, as a floating point number.
    pub fn seconds_with_fraction(&self) -> Option<f64> {
        self.fields.second.map(|s| {
            s as f64 + self.fields.fraction.unwrap_or(0) as f64 / NANOS_PER_SECOND as f64
        })
    }

    /// Returns a copy with a different timezone. The local fields are not
    /// changed; use `normalize` to convert between timezones.
    pub fn with_timezone(&self, timezone: Option<i16>) -> Result<PartialDateTime, Error> {
        let mut fields = self.fields;
        fields.timezone = timezone;
        PartialDateTime::from_fields(fields)
    }

    /// Returns a copy with the era set or cleared. The era must agree with
    /// the sign of the year, if there is one.
    pub fn with_era(&self, era: Option<Era>) -> Result<PartialDateTime, Error> {
        let mut fields = self.fields;
        fields.era = era;
        PartialDateTime::from_fields(fields)
    }

    /// The XML Schema datatype this value belongs to, or None if the defined
    /// fields do not form any of them (for example a year and a day with no
    /// month).
    pub fn kind(&self) -> Option<XsdKind> {
        let f = &self.fields;
        let date = (f.year.is_some(), f.month.is_some(), f.day.is_some());
        let time = f.hour.is_some() && f.minute.is_some() && f.second.is_some();
        let no_time = f.hour.is_none() && f.minute.is_none() && f.second.is_none();
        if f.fraction.is_some() && !time {
            return None;
        }

        match (date, time, no_time) {
            ((true, true, true), true, _) => Some(XsdKind::DateTime),
            ((false, false, false), true, _) => Some(XsdKind::Time),
            ((true, true, true), _, true) => Some(XsdKind::Date),
            ((true, true, false), _, true) => Some(XsdKind::GYearMonth),
            ((true, false, false), _, true) => Some(XsdKind::GYear),
            ((false, true, true), _, true) => Some(XsdKind::GMonthDay),
            ((false, true, false), _, true) => Some(XsdKind::GMonth),
            ((false, false, true), _, true) => Some(XsdKind::GDay),
            _ => None,
        }
    }

    /// Are all of the date and time fields (not necessarily the fraction or
    /// timezone) defined?
    pub fn is_complete(&self) -> bool {
        self.kind() == Some(XsdKind::DateTime)
    }

    /// Converts a complete value to a chrono date-time, ignoring the
    /// timezone. Leap seconds use chrono's convention of a nanosecond count
    /// beyond one second. Hour 24 is rolled over to the next day.
    pub fn to_naive_date_time(&self) -> Result<NaiveDateTime, Error> {
        let value = self.end_of_day_rolled()?;
        let f = &value.fields;
        let year = require(f.year, Field::Year)?;
        let month = require(f.month, Field::Month)?;
        let day = require(f.day, Field::Day)?;
        let hour = require(f.hour, Field::Hour)?;
        let minute = require(f.minute, Field::Minute)?;
        let second = require(f.second, Field::Second)?;
        let mut nanos = f.fraction.unwrap_or(0);
        let second = if second == 60 {
            nanos += NANOS_PER_SECOND as u32;
            59
        } else {
            second
        };

        // chrono counts years astronomically
        let year = i32_year(to_astronomical(year))?;
        let date = NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .ok_or(Error::OutOfRange(Field::Year))?;
        date.and_hms_nano_opt(hour as u32, minute as u32, second as u32, nanos)
            .ok_or(Error::OutOfRange(Field::Second))
    }

    /// Converts a complete value with a timezone to a chrono date-time.
    pub fn to_date_time(&self) -> Result<DateTime<FixedOffset>, Error> {
        let timezone = require(self.fields.timezone, Field::Timezone)?;
        let offset =
            FixedOffset::east_opt(timezone as i32 * 60).ok_or(Error::OutOfRange(Field::Timezone))?;
        let naive = self.to_naive_date_time()?;
        offset
            .from_local_datetime(&naive)
            .single()
            .ok_or(Error::OutOfRange(Field::Timezone))
    }

    /// Builds a complete value without a timezone from a chrono date-time.
    pub fn from_naive_date_time(value: &NaiveDateTime) -> Result<PartialDateTime, Error> {
        from_chrono_fields(value.date(), value.time(), None)
    }

    /// Builds a complete value from a chrono date-time, keeping its offset.
    /// Offsets that are not a whole number of minutes, or beyond 14 hours,
    /// cannot be represented.
    pub fn from_date_time(value: &DateTime<FixedOffset>) -> Result<PartialDateTime, Error> {
        let seconds = value.offset().local_minus_utc();
        if seconds % 60 != 0 {
            return Err(Error::OutOfRange(Field::Timezone));
        }
        let local = value.naive_local();
        from_chrono_fields(local.date(), local.time(), Some((seconds / 60) as i16))
    }
}

fn from_chrono_fields(
    date: NaiveDate,
    time: chrono::NaiveTime,
    timezone: Option<i16>,
) -> Result<PartialDateTime, Error> {
    let nanos = time.nanosecond();
    let (second, fraction) = if nanos >= NANOS_PER_SECOND as u32 {
        (60, nanos - NANOS_PER_SECOND as u32)
    } else {
        (time.second() as u8, nanos)
    };
    let year = crate::dates::calendar::from_astronomical(date.year() as i64);
    PartialDateTime::from_fields(DateTimeFields {
        era: None,
        year: Some(year),
        month: Some(date.month() as u8),
        day: Some(date.day() as u8),
        hour: Some(time.hour() as u8),
        minute: Some(time.minute() as u8),
        second: Some(second),
        fraction: if fraction == 0 { None } else { Some(fraction) },
        timezone,
    })
}

fn i32_year(year: i64) -> Result<i32, Error> {
    if year < i32::min_value() as i64 || year > i32::max_value() as i64 {
        Err(Error::OutOfRange(Field::Year))
    } else {
        Ok(year as i32)
    }
}

pub(crate) fn require<T>(value: Option<T>, field: Field) -> Result<T, Error> {
    value.ok_or(Error::FieldRequired(field))
}

fn out_of_range<T: PartialOrd>(value: Option<T>, low: T, high: T) -> bool {
    match value {
        Some(v) => v < low || v > high,
        None => false,
    }
}

fn validate(f: &DateTimeFields) -> Result<(), Error> {
    if f.year == Some(0) {
        return Err(Error::OutOfRange(Field::Year));
    }
    if let (Some(era), Some(year)) = (f.era, f.year) {
        if era != Era::of_year(year) {
            return Err(Error::OutOfRange(Field::Era));
        }
    }
    if out_of_range(f.month, 1, 12) {
        return Err(Error::OutOfRange(Field::Month));
    }
    if let Some(day) = f.day {
        let max_day = match (f.year, f.month) {
            (Some(year), Some(month)) => days_in_month(to_astronomical(year), month),
            // any leap year will do
            (None, Some(month)) => days_in_month(2000, month),
            (_, None) => 31,
        };
        if day < 1 || day > max_day {
            return Err(Error::OutOfRange(Field::Day));
        }
    }
    if out_of_range(f.hour, 0, 24) {
        return Err(Error::OutOfRange(Field::Hour));
    }
    if out_of_range(f.minute, 0, 59) {
        return Err(Error::OutOfRange(Field::Minute));
    }
    if out_of_range(f.second, 0, 60) {
        return Err(Error::OutOfRange(Field::Second));
    }
    if out_of_range(f.fraction, 0, NANOS_PER_SECOND as u32 - 1) {
        return Err(Error::OutOfRange(Field::FractionalSecond));
    }
    if out_of_range(f.timezone, -MAX_TIMEZONE_MINUTES, MAX_TIMEZONE_MINUTES) {
        return Err(Error::OutOfRange(Field::Timezone));
    }

    // 24:00:00 is the end of the day, and nothing later
    if f.hour == Some(24)
        && (f.minute.unwrap_or(0) != 0 || f.second.unwrap_or(0) != 0 || f.fraction.unwrap_or(0) != 0)
    {
        return Err(Error::OutOfRange(Field::Hour));
    }
    Ok(())
}

impl FromStr for PartialDateTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::dates::lexical::parse_date_time(s)
    }
}

impl Serialize for PartialDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = crate::dates::lexical::format_date_time(self)
            .map_err(|e| <S::Error as serde::ser::Error>::custom(e))?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for PartialDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(PartialDateTimeVisitor)
    }
}

struct PartialDateTimeVisitor;

impl<'de> de::Visitor<'de> for PartialDateTimeVisitor {
    type Value = PartialDateTime;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an XML Schema date or time such as 2001-10-26T21:32:52Z")
    }

    fn visit_str<E>(self, value: &str) -> Result<PartialDateTime, E>
    where
        E: de::Error,
    {
        value.parse().map_err(E::custom)
    }
}
