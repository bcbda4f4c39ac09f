//! Proleptic Gregorian calendar arithmetic.
//!
//! XML Schema 1.0 has no year zero: the year before 0001 is -0001. All of
//! the date arithmetic in this crate is done on the astronomical scale,
//! where 1 BCE is year 0 and the leap year rule applies uniformly, and
//! converted back to the lexical scale at the end. That way a year zero can
//! never leak out of an addition.

/// The number of days in every 400-year cycle of the Gregorian calendar.
/// The calendar repeats exactly after this many days, wherever the cycle
/// starts.
pub const DAYS_PER_400_YEARS: i64 = 146_097;

pub const MONTHS_PER_YEAR: i64 = 12;
pub const HOURS_PER_DAY: i64 = 24;
pub const MINUTES_PER_HOUR: i64 = 60;
pub const SECONDS_PER_MINUTE: i64 = 60;
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Converts a lexical year (no year zero) to an astronomical year.
pub fn to_astronomical(year: i64) -> i64 {
    if year < 0 {
        year + 1
    } else {
        year
    }
}

/// Converts an astronomical year back to a lexical year.
pub fn from_astronomical(year: i64) -> i64 {
    if year <= 0 {
        year - 1
    } else {
        year
    }
}

/// Is the given astronomical year a leap year?
pub fn is_leap_year(year: i64) -> bool {
    year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
}

pub fn days_in_year(year: i64) -> i64 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// The number of days in a month of an astronomical year. The month must
/// be in the range 1 to 12.
pub fn days_in_month(year: i64, month: u8) -> u8 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 31,
    }
}

/// The largest day of a month, where the month may be out of range. For
/// example month 0 of 2001 is December 2000, and month 13 is January 2002.
pub fn maximum_day_in_month_for(year: i64, month: i64) -> i64 {
    let m = modulo_range(month, 1, 13);
    let y = year + f_quotient_range(month, 1, 13);
    days_in_month(y, m as u8) as i64
}

/// The number of days from a given day in the given month to the same day
/// twelve months later. This is the length of the year containing the next
/// February.
pub fn days_in_twelve_months_from(year: i64, month: u8) -> i64 {
    if month <= 2 {
        days_in_year(year)
    } else {
        days_in_year(year + 1)
    }
}

/// The number of days from a given day in the given month back to the same
/// day twelve months earlier.
pub fn days_in_twelve_months_before(year: i64, month: u8) -> i64 {
    if month <= 2 {
        days_in_year(year - 1)
    } else {
        days_in_year(year)
    }
}

/// `fQuotient(a, b)` from XML Schema: the floor of `a / b`.
pub fn f_quotient(a: i64, b: i64) -> i64 {
    a.div_euclid(b)
}

/// `modulo(a, b)` from XML Schema: the remainder with the sign of `b`.
pub fn modulo(a: i64, b: i64) -> i64 {
    a.rem_euclid(b)
}

/// `fQuotient(a, low, high)`: the quotient for a range that starts at `low`
/// rather than zero, such as months 1 to 12 (`high` is exclusive).
pub fn f_quotient_range(a: i64, low: i64, high: i64) -> i64 {
    f_quotient(a - low, high - low)
}

/// `modulo(a, low, high)`: maps `a` into the range `low..high`.
pub fn modulo_range(a: i64, low: i64, high: i64) -> i64 {
    modulo(a - low, high - low) + low
}
