use crate::dates::calendar::{
    HOURS_PER_DAY, MINUTES_PER_HOUR, MONTHS_PER_YEAR, NANOS_PER_SECOND, SECONDS_PER_MINUTE,
};
use crate::dates::datetime::PartialDateTime;
use crate::dates::Comparison;
use crate::core::qm::Error;
use num_traits::ToPrimitive;
use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

const NANOS_PER_MINUTE: i128 = SECONDS_PER_MINUTE as i128 * NANOS_PER_SECOND as i128;

/// The sign of a duration, which applies to all of its fields at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signum {
    Negative,
    Zero,
    Positive,
}

impl Signum {
    pub fn as_i64(self) -> i64 {
        match self {
            Signum::Negative => -1,
            Signum::Zero => 0,
            Signum::Positive => 1,
        }
    }

    pub fn negate(self) -> Signum {
        match self {
            Signum::Negative => Signum::Positive,
            Signum::Zero => Signum::Zero,
            Signum::Positive => Signum::Negative,
        }
    }

    fn of(value: i128) -> Signum {
        if value < 0 {
            Signum::Negative
        } else if value > 0 {
            Signum::Positive
        } else {
            Signum::Zero
        }
    }

    fn times(self, other: Signum) -> Signum {
        Signum::of((self.as_i64() * other.as_i64()) as i128)
    }
}

/// An XML Schema duration such as `P1Y2M3DT4H5M6.7S`.
///
/// A duration has a sign and six non-negative fields. The fields are not
/// normalized: `PT36H` and `P1DT12H` are different values, although they
/// compare as equal. Months and days have no fixed ratio, so `P1M` and
/// `P30D` are not comparable at all; see `compare`.
///
/// Equality (`==`) is structural. Use `compare` for the XML Schema order
/// relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duration {
    signum: Signum,
    years: i64,
    months: i64,
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
    nanos: u32,
}

impl Duration {
    /// Builds a duration from its sign and field magnitudes. The magnitudes
    /// must not be negative and the nanoseconds must be less than a second.
    /// A duration whose fields are all zero has a zero sign, whatever sign
    /// is passed in, but a zero sign with non-zero fields is an error.
    pub fn new(
        signum: Signum,
        years: i64,
        months: i64,
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
        nanos: u32,
    ) -> Result<Duration, Error> {
        if years < 0 || months < 0 || days < 0 || hours < 0 || minutes < 0 || seconds < 0 {
            return Err(Error::InvalidArgument(
                "duration fields must not be negative".to_string(),
            ));
        }
        if nanos as i64 >= NANOS_PER_SECOND {
            return Err(Error::InvalidArgument(
                "nanoseconds must be less than one second".to_string(),
            ));
        }

        let all_zero = years == 0
            && months == 0
            && days == 0
            && hours == 0
            && minutes == 0
            && seconds == 0
            && nanos == 0;
        if all_zero {
            return Ok(Duration::zero());
        }
        if signum == Signum::Zero {
            return Err(Error::InvalidArgument(
                "a non-zero duration needs a sign".to_string(),
            ));
        }

        Ok(Duration {
            signum,
            years,
            months,
            days,
            hours,
            minutes,
            seconds,
            nanos,
        })
    }

    /// A positive duration, or zero if all the fields are zero.
    pub fn positive(
        years: i64,
        months: i64,
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
    ) -> Result<Duration, Error> {
        Duration::new(Signum::Positive, years, months, days, hours, minutes, seconds, 0)
    }

    pub fn zero() -> Duration {
        Duration {
            signum: Signum::Zero,
            years: 0,
            months: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            nanos: 0,
        }
    }

    /// A day-time duration of the given number of milliseconds, spread over
    /// days, hours, minutes and seconds. For example 90061001 milliseconds
    /// is `P1DT1H1M1.001S`.
    pub fn from_millis<T: ToPrimitive>(millis: T) -> Result<Duration, Error> {
        let millis = millis.to_i128().ok_or(Error::Overflow)?;
        Duration::from_day_time_nanos(millis * 1_000_000)
    }

    /// A day-time duration with the same length as a chrono duration.
    pub fn from_chrono(duration: &chrono::Duration) -> Result<Duration, Error> {
        let seconds = duration.num_seconds();
        let nanos = (*duration - chrono::Duration::seconds(seconds))
            .num_nanoseconds()
            .ok_or(Error::Overflow)?;
        Duration::from_day_time_nanos(seconds as i128 * NANOS_PER_SECOND as i128 + nanos as i128)
    }

    /// Converts to a chrono duration. Only day-time durations have a fixed
    /// length, so any years or months make this fail.
    pub fn to_chrono(&self) -> Result<chrono::Duration, Error> {
        let total = self.day_time_nanos()?;
        let seconds = total / NANOS_PER_SECOND as i128;
        let nanos = total % NANOS_PER_SECOND as i128;

        // chrono durations are limited to i64::MAX milliseconds
        let limit = (i64::max_value() / 1000 - 1) as i128;
        if seconds.abs() > limit {
            return Err(Error::Overflow);
        }
        Ok(chrono::Duration::seconds(seconds as i64) + chrono::Duration::nanoseconds(nanos as i64))
    }

    pub(crate) fn from_day_time_nanos(total: i128) -> Result<Duration, Error> {
        let signum = Signum::of(total);
        let mut fields = [0i128, 0, 0, total.abs()];
        carry_up(&mut fields, &DAY_TIME_FACTORS);
        Duration::from_signed_groups(signum, [0, 0], fields)
    }

    pub fn signum(&self) -> Signum {
        self.signum
    }

    pub fn is_zero(&self) -> bool {
        self.signum == Signum::Zero
    }

    pub fn is_negative(&self) -> bool {
        self.signum == Signum::Negative
    }

    pub fn years(&self) -> i64 {
        self.years
    }

    pub fn months(&self) -> i64 {
        self.months
    }

    pub fn days(&self) -> i64 {
        self.days
    }

    pub fn hours(&self) -> i64 {
        self.hours
    }

    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    /// The whole seconds. The fraction is in `nanos`.
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// The seconds including the fraction, as a floating point number.
    pub fn seconds_with_fraction(&self) -> f64 {
        self.seconds as f64 + self.nanos as f64 / NANOS_PER_SECOND as f64
    }

    /// Does this duration only have years and months (an XML Schema
    /// `yearMonthDuration`)?
    pub fn is_year_month(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0 && self.nanos == 0
    }

    /// Does this duration only have days and smaller units (an XML Schema
    /// `dayTimeDuration`)?
    pub fn is_day_time(&self) -> bool {
        self.years == 0 && self.months == 0
    }

    /// The signed length of a day-time duration in nanoseconds.
    pub fn day_time_nanos(&self) -> Result<i128, Error> {
        if !self.is_day_time() {
            return Err(Error::IncommensurableDuration);
        }
        let [days, hours, minutes, seconds] = self.signed_day_time();
        let total = ((days * HOURS_PER_DAY as i128 + hours) * MINUTES_PER_HOUR as i128 + minutes)
            * NANOS_PER_MINUTE
            + seconds;
        Ok(total)
    }

    /// The duration with the opposite sign.
    pub fn negate(&self) -> Duration {
        Duration {
            signum: self.signum.negate(),
            ..*self
        }
    }

    /// Adds two durations field by field, then borrows between neighbouring
    /// fields so that every field has the same sign. Years and months are
    /// aligned separately from days, hours, minutes and seconds, because
    /// there is no fixed number of days in a month. If the two groups end
    /// up with different signs, as in `P1M` plus `-P1D`, the result cannot
    /// be expressed and this fails with `IncommensurableDuration`.
    pub fn add(&self, other: &Duration) -> Result<Duration, Error> {
        let (a, b) = (self.signed_year_month(), other.signed_year_month());
        let mut year_month = [a[0] + b[0], a[1] + b[1]];
        let (a, b) = (self.signed_day_time(), other.signed_day_time());
        let mut day_time = [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]];

        let year_month_sign = align_signs(&mut year_month, &YEAR_MONTH_FACTORS);
        let day_time_sign = align_signs(&mut day_time, &DAY_TIME_FACTORS);
        let signum = match (year_month_sign, day_time_sign) {
            (Signum::Zero, s) | (s, Signum::Zero) => s,
            (s, t) if s == t => s,
            _ => {
                debug!("cannot align signs of {} + {}", self, other);
                return Err(Error::IncommensurableDuration);
            }
        };

        let abs = |v: [i128; 2]| [v[0].abs(), v[1].abs()];
        let day_time = [
            day_time[0].abs(),
            day_time[1].abs(),
            day_time[2].abs(),
            day_time[3].abs(),
        ];
        Duration::from_signed_groups(signum, abs(year_month), day_time)
    }

    /// `self - other`, defined as `self + (-other)`.
    pub fn subtract(&self, other: &Duration) -> Result<Duration, Error> {
        self.add(&other.negate())
    }

    /// Scales every field by the factor, carrying whole years out of the
    /// months. A negative factor flips the sign.
    pub fn multiply(&self, factor: i64) -> Result<Duration, Error> {
        self.multiply_ratio(factor, 1)
    }

    /// Scales every field by `numerator / denominator`. Fractions of a field
    /// carry down into the next smaller field, so half a year is six months
    /// and half a day is twelve hours. A fraction of a month has no fixed
    /// number of days, so it fails with `IncommensurableDuration`. Fractions
    /// of a nanosecond are truncated. Finally whole years are carried out of
    /// the months.
    pub fn multiply_ratio(&self, numerator: i64, denominator: i64) -> Result<Duration, Error> {
        if denominator == 0 {
            return Err(Error::InvalidArgument("zero denominator".to_string()));
        }
        let signum = self
            .signum
            .times(Signum::of(numerator as i128))
            .times(Signum::of(denominator as i128));
        if signum == Signum::Zero {
            return Ok(Duration::zero());
        }

        let n = (numerator as i128).abs();
        let d = (denominator as i128).abs();
        let fields = [
            self.years as i128,
            self.months as i128,
            self.days as i128,
            self.hours as i128,
            self.minutes as i128,
            self.seconds as i128,
            self.nanos as i128,
        ];
        // the factor that converts a remainder into units of the next field,
        // or None where there is no fixed conversion
        let down = [
            Some(MONTHS_PER_YEAR as i128),
            None,
            Some(HOURS_PER_DAY as i128),
            Some(MINUTES_PER_HOUR as i128),
            Some(SECONDS_PER_MINUTE as i128),
            Some(NANOS_PER_SECOND as i128),
            None,
        ];

        let mut scaled = [0i128; 7];
        let mut carry = 0i128;
        for i in 0..fields.len() {
            let numer = mul(fields[i], n)?
                .checked_add(carry)
                .ok_or(Error::Overflow)?;
            scaled[i] = numer / d;
            let remainder = numer % d;
            carry = match down[i] {
                Some(factor) => mul(remainder, factor)?,
                None if i == 1 && remainder != 0 => {
                    debug!("cannot carry a fraction of a month from {}", self);
                    return Err(Error::IncommensurableDuration);
                }
                None => 0,
            };
        }

        // carry whole years out of the months, and whole seconds out of the
        // nanoseconds
        scaled[0] += scaled[1] / MONTHS_PER_YEAR as i128;
        scaled[1] %= MONTHS_PER_YEAR as i128;
        scaled[5] += scaled[6] / NANOS_PER_SECOND as i128;
        scaled[6] %= NANOS_PER_SECOND as i128;

        let seconds = mul(scaled[5], NANOS_PER_SECOND as i128)?
            .checked_add(scaled[6])
            .ok_or(Error::Overflow)?;
        Duration::from_signed_groups(
            signum,
            [scaled[0], scaled[1]],
            [scaled[2], scaled[3], scaled[4], seconds],
        )
    }

    /// Adds this duration to a date-time. See `PartialDateTime::add_duration`.
    pub fn add_to(&self, date_time: &PartialDateTime) -> Result<PartialDateTime, Error> {
        date_time.add_duration(self)
    }

    /// Compares two durations under the XML Schema partial order. Durations
    /// are compared by adding them to four reference date-times and
    /// comparing the results; the answer is only decisive if all four agree.
    /// So `P1D` equals `PT24H`, but `P1M` against `P30D` is indeterminate.
    ///
    /// Fails with `Unsupported` if any field is too large for the
    /// comparison arithmetic.
    pub fn compare(&self, other: &Duration) -> Result<Comparison, Error> {
        crate::dates::order::compare_durations(self, other)
    }

    pub(crate) fn signed_year_month(&self) -> [i128; 2] {
        let s = self.signum.as_i64() as i128;
        [s * self.years as i128, s * self.months as i128]
    }

    /// Days, hours and minutes, followed by the seconds in nanoseconds, all
    /// with the sign applied.
    pub(crate) fn signed_day_time(&self) -> [i128; 4] {
        let s = self.signum.as_i64() as i128;
        let seconds = self.seconds as i128 * NANOS_PER_SECOND as i128 + self.nanos as i128;
        [
            s * self.days as i128,
            s * self.hours as i128,
            s * self.minutes as i128,
            s * seconds,
        ]
    }

    /// Builds a duration from non-negative magnitudes, where the last
    /// day-time field holds the seconds in nanoseconds.
    fn from_signed_groups(
        signum: Signum,
        year_month: [i128; 2],
        day_time: [i128; 4],
    ) -> Result<Duration, Error> {
        let seconds = day_time[3] / NANOS_PER_SECOND as i128;
        let nanos = (day_time[3] % NANOS_PER_SECOND as i128) as u32;
        Duration::new(
            signum,
            to_i64(year_month[0])?,
            to_i64(year_month[1])?,
            to_i64(day_time[0])?,
            to_i64(day_time[1])?,
            to_i64(day_time[2])?,
            to_i64(seconds)?,
            nanos,
        )
    }
}

const YEAR_MONTH_FACTORS: [i128; 1] = [MONTHS_PER_YEAR as i128];
const DAY_TIME_FACTORS: [i128; 3] = [
    HOURS_PER_DAY as i128,
    MINUTES_PER_HOUR as i128,
    NANOS_PER_MINUTE,
];

fn to_i64(value: i128) -> Result<i64, Error> {
    value.to_i64().ok_or(Error::Overflow)
}

fn mul(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_mul(b).ok_or(Error::Overflow)
}

/// Moves units between neighbouring fields until all of them share the sign
/// of the value as a whole, and returns that sign. `factors[i]` is the
/// number of units of field `i + 1` in one unit of field `i`.
///
/// First any wrongly signed field is pushed entirely into its smaller
/// neighbour, working downwards, which leaves only the last field possibly
/// wrong. Then, working upwards, a wrongly signed field borrows just enough
/// whole units from its larger neighbour to change sign. The larger
/// neighbour may then be wrong in turn, but because the value as a whole has
/// the right sign, the borrowing always stops by the first field.
fn align_signs(fields: &mut [i128], factors: &[i128]) -> Signum {
    debug_assert_eq!(fields.len(), factors.len() + 1);
    let mut total = fields[0];
    for i in 1..fields.len() {
        total = total * factors[i - 1] + fields[i];
    }
    let signum = Signum::of(total);
    let s = signum.as_i64() as i128;
    if signum == Signum::Zero {
        for field in fields.iter_mut() {
            *field = 0;
        }
        return signum;
    }

    for i in 0..fields.len() - 1 {
        if fields[i] * s < 0 {
            fields[i + 1] += fields[i] * factors[i];
            fields[i] = 0;
        }
    }
    for i in (1..fields.len()).rev() {
        if fields[i] * s < 0 {
            let factor = factors[i - 1];
            let borrow = (fields[i].abs() + factor - 1) / factor;
            fields[i] += s * borrow * factor;
            fields[i - 1] -= s * borrow;
        }
    }

    debug_assert!(fields.iter().all(|field| field * s >= 0), "{:?}", fields);
    signum
}

/// Carries overflowing units upwards in a group of non-negative fields, so
/// that every field but the first is less than one unit of its neighbour.
fn carry_up(fields: &mut [i128], factors: &[i128]) {
    for i in (1..fields.len()).rev() {
        let factor = factors[i - 1];
        fields[i - 1] += fields[i] / factor;
        fields[i] %= factor;
    }
}

impl Default for Duration {
    fn default() -> Duration {
        Duration::zero()
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        self.negate()
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        crate::dates::lexical::write_duration(f, self)
    }
}

impl FromStr for Duration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::dates::lexical::parse_duration(s)
    }
}

impl Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(DurationVisitor)
    }
}

struct DurationVisitor;

impl<'de> de::Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an XML Schema duration such as P1Y2M3DT4H5M6S")
    }

    fn visit_str<E>(self, value: &str) -> Result<Duration, E>
    where
        E: de::Error,
    {
        value.parse().map_err(E::custom)
    }
}
