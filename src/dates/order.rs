//! The XML Schema order relations for date-times and durations. Both are
//! partial orders: some pairs of values are indeterminate.

use crate::dates::datetime::{DateTimeFields, PartialDateTime, MAX_TIMEZONE_MINUTES};
use crate::dates::duration::Duration;
use crate::dates::Comparison;
use crate::core::qm::Error;

/// The largest duration field the duration comparator accepts. The
/// reference instants plus a duration within this limit stay well within
/// 64 bit arithmetic.
pub const MAX_COMPARABLE_FIELD: i64 = i32::max_value() as i64;

lazy_static! {
    /// The four instants at which two durations are compared. They start in
    /// months of 28, 30 and 31 days, and the years after them include both
    /// common and leap years.
    static ref REFERENCE_INSTANTS: [PartialDateTime; 4] = [
        utc_midnight(1696, 9, 1),
        utc_midnight(1697, 2, 1),
        utc_midnight(1903, 3, 1),
        utc_midnight(1903, 7, 1),
    ];
}

fn utc_midnight(year: i64, month: u8, day: u8) -> PartialDateTime {
    PartialDateTime::from_valid_fields(DateTimeFields {
        year: Some(year),
        month: Some(month),
        day: Some(day),
        hour: Some(0),
        minute: Some(0),
        second: Some(0),
        timezone: Some(0),
        ..Default::default()
    })
}

/// The reference instants used by `compare_durations`.
pub fn reference_instants() -> &'static [PartialDateTime; 4] {
    &REFERENCE_INSTANTS
}

impl PartialDateTime {
    /// Compares two date-times under the XML Schema order relation.
    ///
    /// Values in the same timezone (or both without one) are compared field
    /// by field, and a field defined in one but not the other makes them
    /// indeterminate. Values in different timezones are compared in UTC. If
    /// only one has a timezone, the other could be anywhere from -14:00 to
    /// +14:00, so the result is only decisive if it holds at both extremes.
    ///
    /// Fails if a value needs converting to UTC but has no time of day.
    pub fn compare(&self, other: &PartialDateTime) -> Result<Comparison, Error> {
        compare_date_times(self, other)
    }
}

pub fn compare_date_times(p: &PartialDateTime, q: &PartialDateTime) -> Result<Comparison, Error> {
    match (p.timezone(), q.timezone()) {
        (a, b) if a == b => Ok(compare_fields(&p.overflow_rolled()?, &q.overflow_rolled()?)),
        (Some(_), Some(_)) => Ok(compare_fields(&p.normalize()?, &q.normalize()?)),
        (Some(_), None) => bracket(p, q),
        (None, _) => Ok(bracket(q, p)?.reverse()),
    }
}

/// Compares a value with a timezone against one without, by placing the
/// latter at the earliest (+14:00) and latest (-14:00) instants it could
/// stand for.
fn bracket(zoned: &PartialDateTime, local: &PartialDateTime) -> Result<Comparison, Error> {
    let zoned = zoned.normalize()?;
    let earliest = local.with_timezone(Some(MAX_TIMEZONE_MINUTES))?.normalize()?;
    let latest = local.with_timezone(Some(-MAX_TIMEZONE_MINUTES))?.normalize()?;

    let against_earliest = compare_fields(&zoned, &earliest);
    let against_latest = compare_fields(&zoned, &latest);
    trace!(
        "{:?} against {:?}: {} at +14:00, {} at -14:00",
        zoned,
        local,
        against_earliest,
        against_latest
    );
    Ok(match (against_earliest, against_latest) {
        (Comparison::Less, Comparison::Less) => Comparison::Less,
        (Comparison::Greater, Comparison::Greater) => Comparison::Greater,
        _ => Comparison::Indeterminate,
    })
}

/// Compares two values in the same timezone, most significant field first.
fn compare_fields(p: &PartialDateTime, q: &PartialDateTime) -> Comparison {
    let (p, q) = (p.fields(), q.fields());
    compare_field(p.year, q.year)
        .or_else(|| compare_field(p.month, q.month))
        .or_else(|| compare_field(p.day, q.day))
        .or_else(|| compare_field(p.hour, q.hour))
        .or_else(|| compare_field(p.minute, q.minute))
        .or_else(|| compare_field(p.second, q.second))
        // a missing fraction is a fraction of zero
        .or_else(|| compare_field(Some(p.fraction.unwrap_or(0)), Some(q.fraction.unwrap_or(0))))
        .unwrap_or(Comparison::Equal)
}

/// Returns None if the comparison should move on to the next field.
fn compare_field<T: Ord>(p: Option<T>, q: Option<T>) -> Option<Comparison> {
    match (p, q) {
        (Some(p), Some(q)) if p == q => None,
        (Some(p), Some(q)) => Some(p.cmp(&q).into()),
        (None, None) => None,
        _ => Some(Comparison::Indeterminate),
    }
}

/// Compares two durations by adding each to the four reference instants
/// and comparing the results. The answer is decisive only if all four
/// comparisons give the same answer.
pub fn compare_durations(a: &Duration, b: &Duration) -> Result<Comparison, Error> {
    check_comparable(a)?;
    check_comparable(b)?;

    // the only shortcut: P1M and P31D agree from January but not February
    if a == b {
        return Ok(Comparison::Equal);
    }

    let mut result = None;
    for reference in REFERENCE_INSTANTS.iter() {
        let end_a = reference.add_duration(a)?;
        let end_b = reference.add_duration(b)?;
        let comparison = compare_date_times(&end_a, &end_b)?;
        trace!("from {:?}: {} against {} is {}", reference, a, b, comparison);

        if comparison == Comparison::Indeterminate {
            return Ok(comparison);
        }
        match result {
            None => result = Some(comparison),
            Some(previous) if previous != comparison => {
                debug!("{} against {} is indeterminate", a, b);
                return Ok(Comparison::Indeterminate);
            }
            Some(_) => {}
        }
    }
    Ok(result.unwrap_or(Comparison::Equal))
}

fn check_comparable(duration: &Duration) -> Result<(), Error> {
    let fields = [
        duration.years(),
        duration.months(),
        duration.days(),
        duration.hours(),
        duration.minutes(),
        duration.seconds(),
    ];
    if fields.iter().any(|&field| field > MAX_COMPARABLE_FIELD) {
        warn!("refusing to compare {}: field too large", duration);
        return Err(Error::Unsupported(format!(
            "cannot compare durations with fields larger than {}",
            MAX_COMPARABLE_FIELD
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::duration::Signum;
    use crate::dates::Field;

    fn dt(text: &str) -> PartialDateTime {
        text.parse().unwrap()
    }

    fn d(text: &str) -> Duration {
        text.parse().unwrap()
    }

    fn cmp_dt(a: &str, b: &str) -> Comparison {
        dt(a).compare(&dt(b)).unwrap()
    }

    fn cmp_d(a: &str, b: &str) -> Comparison {
        d(a).compare(&d(b)).unwrap()
    }

    #[test]
    fn reference_instants_are_utc_midnights() {
        let instants = reference_instants();
        assert_eq!(instants[0], dt("1696-09-01T00:00:00Z"));
        assert_eq!(instants[1], dt("1697-02-01T00:00:00Z"));
        assert_eq!(instants[2], dt("1903-03-01T00:00:00Z"));
        assert_eq!(instants[3], dt("1903-07-01T00:00:00Z"));
    }

    #[test]
    fn same_timezone_compares_fields() {
        assert_eq!(cmp_dt("2000-01-15", "2000-01-16"), Comparison::Less);
        assert_eq!(cmp_dt("2000-01-16Z", "2000-01-15Z"), Comparison::Greater);
        assert_eq!(
            cmp_dt("2000-01-15T10:00:00+05:00", "2000-01-15T10:00:00+05:00"),
            Comparison::Equal
        );
        assert_eq!(cmp_dt("-0001-01-01", "0001-01-01"), Comparison::Less);
        assert_eq!(cmp_dt("--12-25", "--12-24"), Comparison::Greater);
    }

    #[test]
    fn mismatched_fields_are_indeterminate() {
        assert_eq!(cmp_dt("2000-01", "2000-01-15"), Comparison::Indeterminate);
        // an earlier field that differs decides before the mismatch
        assert_eq!(cmp_dt("2000-01", "2000-02-15"), Comparison::Less);
        assert_eq!(cmp_dt("2000", "12:00:00"), Comparison::Indeterminate);
    }

    #[test]
    fn fractions() {
        assert_eq!(cmp_dt("00:00:00", "00:00:00.0"), Comparison::Equal);
        assert_eq!(cmp_dt("00:00:00", "00:00:00.5"), Comparison::Less);
        assert_eq!(cmp_dt("00:00:00.25", "00:00:00.125"), Comparison::Greater);
    }

    #[test]
    fn end_of_day_equals_next_midnight() {
        assert_eq!(
            cmp_dt("2000-01-01T24:00:00", "2000-01-02T00:00:00"),
            Comparison::Equal
        );
    }

    #[test]
    fn neither_timezone_defined() {
        assert_eq!(cmp_dt("12:00:00", "12:00:01"), Comparison::Less);
        assert_eq!(cmp_dt("2000-01-15T12:00:00", "2000-01-15T12:00:00"), Comparison::Equal);
    }

    #[test]
    fn leap_second_orders_the_same_in_any_timezone() {
        let leap = "1998-12-31T23:59:60Z";
        let midnight_utc = "1999-01-01T00:00:00Z";
        let one_am_paris = "1999-01-01T01:00:00+01:00";
        assert_eq!(cmp_dt(leap, midnight_utc), Comparison::Equal);
        assert_eq!(cmp_dt(leap, one_am_paris), Comparison::Equal);
        assert_eq!(cmp_dt(midnight_utc, one_am_paris), Comparison::Equal);
        assert_eq!(cmp_dt(leap, "1998-12-31T23:59:59Z"), Comparison::Greater);
        assert_eq!(
            cmp_dt("1998-12-31T23:59:60", "1999-01-01T00:00:00.5"),
            Comparison::Less
        );
    }

    #[test]
    fn different_timezones_compare_in_utc() {
        assert_eq!(
            cmp_dt("2000-01-01T01:00:00+01:00", "2000-01-01T00:00:00Z"),
            Comparison::Equal
        );
        assert_eq!(
            cmp_dt("2000-01-01T12:00:00-05:00", "2000-01-01T12:00:00Z"),
            Comparison::Greater
        );
        assert_eq!(
            cmp_dt("2000-03-04T23:00:00+03:00", "2000-03-04T20:00:00Z"),
            Comparison::Equal
        );
    }

    #[test]
    fn one_timezone_brackets_the_other() {
        // examples from XML Schema Part 2, section 3.2.7.4
        assert_eq!(
            cmp_dt("2000-01-15T00:00:00", "2000-02-15T00:00:00Z"),
            Comparison::Less
        );
        assert_eq!(
            cmp_dt("2000-01-01T12:00:00", "1999-12-31T23:00:00Z"),
            Comparison::Indeterminate
        );
        assert_eq!(
            cmp_dt("2000-01-16T12:00:00", "2000-01-16T12:00:00Z"),
            Comparison::Indeterminate
        );
        assert_eq!(
            cmp_dt("2000-01-16T00:00:00", "2000-01-16T12:00:00Z"),
            Comparison::Indeterminate
        );
        assert_eq!(
            cmp_dt("2000-01-15T12:00:00", "2000-01-16T12:00:00Z"),
            Comparison::Less
        );
        assert_eq!(
            cmp_dt("2000-01-16T12:00:00Z", "2000-01-15T12:00:00"),
            Comparison::Greater
        );
        // exactly 14 hours apart is still ambiguous
        assert_eq!(
            cmp_dt("2000-01-01T14:00:00Z", "2000-01-01T00:00:00"),
            Comparison::Indeterminate
        );
    }

    #[test]
    fn converting_to_utc_needs_a_time() {
        assert_eq!(
            dt("2000-01-01+01:00").compare(&dt("2000-01-01Z")),
            Err(Error::FieldRequired(Field::Hour))
        );
    }

    #[test]
    fn durations_with_months_and_days() {
        assert_eq!(cmp_d("P1M", "P30D"), Comparison::Indeterminate);
        assert_eq!(cmp_d("P1Y", "P365D"), Comparison::Indeterminate);
        assert_eq!(cmp_d("P1D", "PT24H"), Comparison::Equal);
        assert_eq!(cmp_d("P1Y", "P364D"), Comparison::Greater);
        assert_eq!(cmp_d("P1Y", "P366D"), Comparison::Indeterminate);
        assert_eq!(cmp_d("P1Y", "P367D"), Comparison::Less);
        assert_eq!(cmp_d("P1M", "P27D"), Comparison::Greater);
        assert_eq!(cmp_d("P1M", "P28D"), Comparison::Indeterminate);
        assert_eq!(cmp_d("P1M", "P32D"), Comparison::Less);
        assert_eq!(cmp_d("P5M", "P153D"), Comparison::Indeterminate);
    }

    #[test]
    fn epoch_coincidence_is_not_equality() {
        // from 1970-01-01 both land on 1970-02-01, but not from February
        assert_eq!(cmp_d("P1M", "P31D"), Comparison::Indeterminate);
    }

    #[test]
    fn durations_with_fixed_lengths() {
        assert_eq!(cmp_d("P1Y", "P12M"), Comparison::Equal);
        assert_eq!(cmp_d("PT1H", "PT61M"), Comparison::Less);
        assert_eq!(cmp_d("PT60M", "PT3600S"), Comparison::Equal);
        assert_eq!(cmp_d("-P1D", "PT0S"), Comparison::Less);
        assert_eq!(cmp_d("-P1D", "-PT23H"), Comparison::Less);
        assert_eq!(cmp_d("PT0.5S", "PT0S"), Comparison::Greater);
        assert_eq!(cmp_d("P2Y6M", "P2Y6M"), Comparison::Equal);
    }

    #[test]
    fn huge_durations_are_unsupported() {
        let huge = Duration::new(Signum::Positive, MAX_COMPARABLE_FIELD + 1, 0, 0, 0, 0, 0, 0).unwrap();
        match huge.compare(&d("P1Y")) {
            Err(Error::Unsupported(_)) => {}
            other => panic!("expected unsupported, got {:?}", other),
        }
        let large = Duration::new(Signum::Positive, 0, 0, MAX_COMPARABLE_FIELD, 0, 0, 0, 0).unwrap();
        assert_eq!(large.compare(&d("P1D")).unwrap(), Comparison::Greater);
    }
}
