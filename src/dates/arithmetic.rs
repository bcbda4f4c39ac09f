//! Adding durations to date-times, following the algorithm in appendix E of
//! XML Schema Part 2, and normalizing date-times to UTC.

use crate::dates::calendar::{
    days_in_month, days_in_twelve_months_before, days_in_twelve_months_from, f_quotient_range,
    from_astronomical, maximum_day_in_month_for, modulo_range, to_astronomical, DAYS_PER_400_YEARS,
    NANOS_PER_SECOND,
};
use crate::dates::datetime::{require, DateTimeFields, Era, PartialDateTime};
use crate::dates::duration::{Duration, Signum};
use crate::dates::Field;
use crate::core::qm::{checked, Error};
use num_traits::ToPrimitive;

/// The astronomical year used in place of an undefined year. It is a leap
/// year, so that a month-day such as `--02-29` survives the arithmetic.
const STAND_IN_YEAR: i64 = 0;

const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND as i128;

impl PartialDateTime {
    /// Adds a duration, field by field from the months down to the days,
    /// carrying into the next larger field as it goes. The day of the month
    /// is first clamped to the length of the resulting month, so the 31st
    /// of January plus one month is the 28th (or 29th) of February.
    ///
    /// Undefined fields take part in the arithmetic as their smallest legal
    /// value and are undefined again in the result. The fraction of a second
    /// becomes defined if the result has one and the seconds are defined.
    pub fn add_duration(&self, duration: &Duration) -> Result<PartialDateTime, Error> {
        add_duration(self, duration)
    }

    /// Adds the negation of the duration.
    pub fn subtract_duration(&self, duration: &Duration) -> Result<PartialDateTime, Error> {
        add_duration(self, &duration.negate())
    }

    /// Converts to UTC by subtracting the timezone offset, returning a value
    /// with a zero timezone. A value without a timezone is returned
    /// unchanged. The time of day must be defined.
    pub fn normalize(&self) -> Result<PartialDateTime, Error> {
        let timezone = match self.timezone() {
            Some(timezone) => timezone,
            None => return Ok(*self),
        };
        require(self.hour(), Field::Hour)?;
        require(self.minute(), Field::Minute)?;
        require(self.second(), Field::Second)?;

        let signum = if timezone > 0 {
            Signum::Negative
        } else {
            Signum::Positive
        };
        let minutes = (timezone as i64).abs();
        let offset = Duration::new(signum, 0, 0, 0, minutes / 60, minutes % 60, 0, 0)?;

        let mut fields = add_duration(self, &offset)?.fields();
        fields.timezone = Some(0);
        Ok(PartialDateTime::from_valid_fields(fields))
    }

    /// Rolls 24:00:00 over to 00:00:00 of the next day. Any other value is
    /// returned as it is.
    pub(crate) fn end_of_day_rolled(&self) -> Result<PartialDateTime, Error> {
        if self.hour() == Some(24) {
            add_duration(self, &Duration::zero())
        } else {
            Ok(*self)
        }
    }

    /// Rolls 24:00:00 into the next day and a leap second into the next
    /// minute, the same way `normalize` does, so that values compare alike
    /// whether or not they are normalized first.
    pub(crate) fn overflow_rolled(&self) -> Result<PartialDateTime, Error> {
        if self.hour() == Some(24) || self.second() == Some(60) {
            add_duration(self, &Duration::zero())
        } else {
            Ok(*self)
        }
    }
}

/// `E = S + D`, with the fields computed in the order months, years,
/// timezone, seconds, minutes, hours, days.
pub fn add_duration(start: &PartialDateTime, duration: &Duration) -> Result<PartialDateTime, Error> {
    let s = start.fields();
    let [d_years, d_months] = duration.signed_year_month();
    let [d_days, d_hours, d_minutes, d_nanos] = duration.signed_day_time();

    // months
    let temp = s.month.unwrap_or(1) as i128 - 1 + d_months;
    let mut month = (temp.rem_euclid(12) + 1) as u8;
    let carry = temp.div_euclid(12);

    // years, on the astronomical scale
    let start_year = s.year.map(to_astronomical).unwrap_or(STAND_IN_YEAR);
    let mut year = to_i64(start_year as i128 + d_years + carry)?;

    // seconds, including the fraction
    let temp = s.second.unwrap_or(0) as i128 * NANOS_PER_SECOND as i128
        + s.fraction.unwrap_or(0) as i128
        + d_nanos;
    let second_nanos = temp.rem_euclid(NANOS_PER_MINUTE);
    let carry = temp.div_euclid(NANOS_PER_MINUTE);
    let second = (second_nanos / NANOS_PER_SECOND as i128) as u8;
    let fraction = (second_nanos % NANOS_PER_SECOND as i128) as u32;

    // minutes
    let temp = s.minute.unwrap_or(0) as i128 + d_minutes + carry;
    let minute = temp.rem_euclid(60) as u8;
    let carry = temp.div_euclid(60);

    // hours
    let temp = s.hour.unwrap_or(0) as i128 + d_hours + carry;
    let hour = temp.rem_euclid(24) as u8;
    let carry = temp.div_euclid(24);

    // days
    let max_day = days_in_month(year, month);
    let start_day = s.day.unwrap_or(1).max(1).min(max_day);
    let mut day = start_day as i128 + d_days + carry;
    roll_days(&mut day, &mut month, &mut year)?;

    let lexical_year = checked(year.checked_sub(if year <= 0 { 1 } else { 0 }))?;
    debug_assert_eq!(lexical_year, from_astronomical(year));

    let fields = DateTimeFields {
        era: match (s.era, s.year) {
            (Some(_), Some(_)) => Some(Era::of_year(lexical_year)),
            (era, _) => era,
        },
        year: s.year.map(|_| lexical_year),
        month: s.month.map(|_| month),
        day: s.day.map(|_| day as u8),
        hour: s.hour.map(|_| hour),
        minute: s.minute.map(|_| minute),
        second: s.second.map(|_| second),
        fraction: if s.fraction.is_some() || (s.second.is_some() && fraction != 0) {
            Some(fraction)
        } else {
            None
        },
        timezone: s.timezone,
    };
    trace!("{:?} + {} = {:?}", start, duration, fields);
    Ok(PartialDateTime::from_valid_fields(fields))
}

/// Moves a day count relative to the start of a month into the range of
/// that month, adjusting the month and year to match.
///
/// The loop is bounded. Whole 400-year cycles are removed first, since the
/// calendar repeats every 146 097 days, leaving a remainder under one cycle.
/// Whole years are then removed, at most 400 of them, each reducing the
/// remainder by at least 365 days. What is left is less than a year, which
/// takes at most twelve single-month steps. Each step strictly reduces the
/// distance of the day from its month.
fn roll_days(day: &mut i128, month: &mut u8, year: &mut i64) -> Result<(), Error> {
    let cycles = *day / DAYS_PER_400_YEARS as i128;
    if cycles != 0 {
        *day -= cycles * DAYS_PER_400_YEARS as i128;
        let years = checked(to_i64(cycles)?.checked_mul(400))?;
        *year = checked(year.checked_add(years))?;
    }

    while *day > 366 {
        *day -= days_in_twelve_months_from(*year, *month) as i128;
        *year = checked(year.checked_add(1))?;
    }
    while *day < -365 {
        *day += days_in_twelve_months_before(*year, *month) as i128;
        *year = checked(year.checked_sub(1))?;
    }

    loop {
        let step = if *day < 1 {
            *day += maximum_day_in_month_for(*year, *month as i64 - 1) as i128;
            -1
        } else if *day > days_in_month(*year, *month) as i128 {
            *day -= days_in_month(*year, *month) as i128;
            1
        } else {
            return Ok(());
        };
        let temp = *month as i64 + step;
        *month = modulo_range(temp, 1, 13) as u8;
        *year = checked(year.checked_add(f_quotient_range(temp, 1, 13)))?;
    }
}

fn to_i64(value: i128) -> Result<i64, Error> {
    value.to_i64().ok_or(Error::Overflow)
}
