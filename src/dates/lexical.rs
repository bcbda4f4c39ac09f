//! The canonical lexical forms of XML Schema durations and date-times.

use crate::dates::datetime::{PartialDateTime, XsdKind};
use crate::dates::duration::{Duration, Signum};
use crate::dates::pattern::{fraction_digits, Pattern, Scanner};
use crate::core::qm::Error;
use std::fmt;
use std::fmt::Write;

lazy_static! {
    /// The lexical pattern of each kind of date-time, in the order they are
    /// tried when parsing. Earlier patterns win where two could match, so
    /// that for example `2000-05` is a year and month rather than a year
    /// with a timezone.
    static ref LEXICAL_PATTERNS: Vec<(XsdKind, Pattern)> = vec![
        (XsdKind::DateTime, Pattern::fixed("%Y-%M-%DT%h:%m:%s%z")),
        (XsdKind::Date, Pattern::fixed("%Y-%M-%D%z")),
        (XsdKind::GYearMonth, Pattern::fixed("%Y-%M%z")),
        (XsdKind::GYear, Pattern::fixed("%Y%z")),
        (XsdKind::Time, Pattern::fixed("%h:%m:%s%z")),
        (XsdKind::GMonthDay, Pattern::fixed("--%M-%D%z")),
        (XsdKind::GMonth, Pattern::fixed("--%M%z")),
        (XsdKind::GDay, Pattern::fixed("---%D%z")),
    ];
}

/// The lexical pattern for a kind of date-time.
pub fn pattern_for(kind: XsdKind) -> &'static Pattern {
    // every kind has an entry
    let index = LEXICAL_PATTERNS
        .iter()
        .position(|(k, _)| *k == kind)
        .unwrap_or(0);
    &LEXICAL_PATTERNS[index].1
}

/// Parses any of the XML Schema date and time forms, for example
/// `2001-10-26T21:32:52.5+02:00`, `2001-10`, `--12-25` or `13:20:00Z`.
///
/// If no form matches, the error is one where the text matched a form but
/// a field was out of range, or failing that the syntax error that got
/// furthest into the text.
pub fn parse_date_time(text: &str) -> Result<PartialDateTime, Error> {
    let mut syntax_error: Option<Error> = None;
    let mut range_error: Option<Error> = None;

    for (kind, pattern) in LEXICAL_PATTERNS.iter() {
        match pattern.parse_fields(text) {
            Ok(parsed) => match parsed.validate() {
                Ok(value) => {
                    trace!("parsed {} as {:?}", text, kind);
                    return Ok(value);
                }
                Err(e) => {
                    range_error = range_error.or(Some(e));
                }
            },
            Err(e) => {
                let further = match &syntax_error {
                    Some(previous) => e.offset() > previous.offset(),
                    None => true,
                };
                if further {
                    syntax_error = Some(e);
                }
            }
        }
    }

    let error = range_error
        .or(syntax_error)
        .unwrap_or_else(|| Error::parse(0, "not a date or time"));
    debug!("cannot parse date-time {:?}: {}", text, error);
    Err(error)
}

/// Writes a date-time in the canonical form for its kind. Values whose
/// defined fields do not form one of the XML Schema types cannot be written.
pub fn format_date_time(value: &PartialDateTime) -> Result<String, Error> {
    let kind = value.kind().ok_or_else(|| {
        Error::InvalidArgument(format!(
            "fields {:?} do not form an XML Schema date or time",
            value.fields()
        ))
    })?;
    pattern_for(kind).format(value)
}

/// A number with a designator letter in a duration, such as `3D` or `1.5S`.
struct Chunk<'a> {
    digits: &'a str,
    digits_offset: usize,
    /// Nanoseconds, and the offset of the `.`
    fraction: Option<(u32, usize)>,
    designator: u8,
    designator_offset: usize,
}

/// Parses a duration such as `-P1Y2M3DT4H5M6.7S`. Errors give the byte
/// offset of the offending character.
///
/// The text is read in two passes: first it is split into numbers with
/// their designators, then each designator is assigned to its field, working
/// from the end so that fields out of order or repeated are caught.
pub fn parse_duration(text: &str) -> Result<Duration, Error> {
    let mut scanner = Scanner { text, pos: 0 };
    let negative = scanner.peek() == Some(b'-');
    if negative {
        scanner.pos += 1;
    }
    scanner.expect('P')?;
    let after_p = scanner.pos;

    let (date_end, time_start) = match text[after_p..].find('T') {
        Some(t) => (after_p + t, Some(after_p + t + 1)),
        None => (text.len(), None),
    };

    let date_chunks = chunks(text, after_p, date_end)?;
    let time_chunks = match time_start {
        Some(start) => {
            let found = chunks(text, start, text.len())?;
            if found.is_empty() {
                return Err(Error::parse(start, "expected a time field after 'T'"));
            }
            found
        }
        None => Vec::new(),
    };
    if date_chunks.is_empty() && time_chunks.is_empty() {
        return Err(Error::parse(after_p, "expected at least one field"));
    }

    let [years, months, days] = assign(&date_chunks, b"YMD")?;
    let [hours, minutes, seconds] = assign(&time_chunks, b"HMS")?;

    let nanos = seconds
        .and_then(|chunk| chunk.fraction)
        .map(|(nanos, _)| nanos)
        .unwrap_or(0);
    let signum = if negative {
        Signum::Negative
    } else {
        Signum::Positive
    };
    Duration::new(
        signum,
        value(years)?,
        value(months)?,
        value(days)?,
        value(hours)?,
        value(minutes)?,
        value(seconds)?,
        nanos,
    )
}

/// Splits `text[start..end]` into numbers with designators.
fn chunks(text: &str, start: usize, end: usize) -> Result<Vec<Chunk>, Error> {
    let mut scanner = Scanner { text: &text[..end], pos: start };
    let mut found = Vec::new();
    while !scanner.at_end() {
        let digits_offset = scanner.pos;
        let digits = scanner.digits();
        if digits.is_empty() {
            return Err(Error::parse(scanner.pos, "expected digits"));
        }
        let dot_offset = scanner.pos;
        let fraction = scanner.fraction()?.map(|nanos| (nanos, dot_offset));
        let designator_offset = scanner.pos;
        let designator = match scanner.peek() {
            Some(b) if b.is_ascii_alphabetic() => b,
            Some(_) => return Err(Error::parse(designator_offset, "unexpected character")),
            None => return Err(Error::parse(designator_offset, "expected a field designator")),
        };
        scanner.pos += 1;
        found.push(Chunk {
            digits,
            digits_offset,
            fraction,
            designator,
            designator_offset,
        });
    }
    Ok(found)
}

/// Assigns each chunk to the field its designator names. Designators must
/// appear in the given order, each at most once, and only seconds may have a
/// fraction.
fn assign<'c, 'a>(chunks: &'c [Chunk<'a>], designators: &[u8; 3]) -> Result<[Option<&'c Chunk<'a>>; 3], Error> {
    let mut slots = [None, None, None];
    let mut limit = designators.len();
    for chunk in chunks.iter().rev() {
        match designators[..limit].iter().rposition(|d| *d == chunk.designator) {
            Some(i) => {
                slots[i] = Some(chunk);
                limit = i;
            }
            None if designators.contains(&chunk.designator) => {
                return Err(Error::parse(chunk.designator_offset, "field out of order or repeated"));
            }
            None => {
                return Err(Error::parse(chunk.designator_offset, "unexpected field designator"));
            }
        }
    }

    // only the last slot of the time part takes a fraction
    for (i, slot) in slots.iter().enumerate() {
        if let Some(chunk) = slot {
            if let Some((_, offset)) = chunk.fraction {
                if !(i == 2 && designators == b"HMS") {
                    return Err(Error::parse(offset, "only seconds may have a fraction"));
                }
            }
        }
    }
    Ok(slots)
}

fn value(chunk: Option<&Chunk>) -> Result<i64, Error> {
    match chunk {
        None => Ok(0),
        Some(chunk) => chunk
            .digits
            .parse()
            .map_err(|_| Error::parse(chunk.digits_offset, "number too large")),
    }
}

/// Writes a duration in canonical form: zero fields are left out, the zero
/// duration is `PT0S`, and fractions of a second have no trailing zeros.
pub fn format_duration(duration: &Duration) -> String {
    duration.to_string()
}

/// Writes the canonical form of a duration, as `format_duration`.
pub fn write_duration<W: Write>(out: &mut W, d: &Duration) -> fmt::Result {
    if d.is_zero() {
        return out.write_str("PT0S");
    }
    if d.is_negative() {
        out.write_char('-')?;
    }
    out.write_char('P')?;
    for (value, designator) in [(d.years(), 'Y'), (d.months(), 'M'), (d.days(), 'D')].iter() {
        if *value != 0 {
            write!(out, "{}{}", value, designator)?;
        }
    }

    if d.hours() == 0 && d.minutes() == 0 && d.seconds() == 0 && d.nanos() == 0 {
        return Ok(());
    }
    out.write_char('T')?;
    if d.hours() != 0 {
        write!(out, "{}H", d.hours())?;
    }
    if d.minutes() != 0 {
        write!(out, "{}M", d.minutes())?;
    }
    if d.seconds() != 0 || d.nanos() != 0 {
        write!(out, "{}", d.seconds())?;
        if d.nanos() != 0 {
            write!(out, ".{}", fraction_digits(d.nanos()))?;
        }
        out.write_char('S')?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::datetime::DateTimeFields;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn duration(text: &str) -> Duration {
        parse_duration(text).unwrap()
    }

    fn error_offset(text: &str) -> Option<usize> {
        parse_duration(text).unwrap_err().offset()
    }

    #[test]
    fn parses_durations() {
        let d = duration("-P1Y2M3DT4H5M6.7S");
        assert!(d.is_negative());
        assert_eq!(d.years(), 1);
        assert_eq!(d.months(), 2);
        assert_eq!(d.days(), 3);
        assert_eq!(d.hours(), 4);
        assert_eq!(d.minutes(), 5);
        assert_eq!(d.seconds(), 6);
        assert_eq!(d.nanos(), 700_000_000);

        assert_eq!(duration("PT36H").hours(), 36);
        assert_eq!(duration("PT0.5S").nanos(), 500_000_000);
        assert!(duration("P0Y").is_zero());
        assert!(duration("-PT0S").is_zero());
        assert_eq!(duration("PT0.000000001S").nanos(), 1);
    }

    #[test]
    fn duration_errors_have_offsets() {
        assert_eq!(error_offset(""), Some(0));
        assert_eq!(error_offset("1Y"), Some(0));
        assert_eq!(error_offset("-1Y"), Some(1));
        assert_eq!(error_offset("P"), Some(1));
        assert_eq!(error_offset("-P"), Some(2));
        assert_eq!(error_offset("PT"), Some(2));
        assert_eq!(error_offset("P1YT"), Some(4));
        assert_eq!(error_offset("P1S"), Some(2));
        assert_eq!(error_offset("PT1D"), Some(3));
        assert_eq!(error_offset("P1"), Some(2));
        assert_eq!(error_offset("PY"), Some(1));
        assert_eq!(error_offset("P-1Y"), Some(1));
        assert_eq!(error_offset("P1Y "), Some(3));
        assert_eq!(error_offset("P1.5Y"), Some(2));
        assert_eq!(error_offset("PT1.5M"), Some(3));
        assert_eq!(error_offset("PT1.S"), Some(4));
        assert_eq!(error_offset("PT1.1234567891S"), Some(13));
        assert_eq!(error_offset("P1.1234567891Y"), Some(12));
    }

    #[test]
    fn duration_fields_must_be_in_order() {
        // the earlier of the two clashing designators is reported
        assert_eq!(error_offset("P1D1Y"), Some(2));
        assert_eq!(error_offset("P1Y1Y"), Some(2));
        assert_eq!(error_offset("PT1S2H"), Some(3));
        assert_eq!(error_offset("P1DT1H1D"), Some(7));
    }

    #[test]
    fn duration_numbers_may_overflow() {
        let text = "P99999999999999999999D";
        assert_eq!(error_offset(text), Some(1));
        assert_eq!(duration("P9223372036854775807D").days(), i64::MAX);
    }

    #[test]
    fn formats_canonical_durations() {
        assert_eq!(format_duration(&duration("P0Y")), "PT0S");
        assert_eq!(format_duration(&duration("P1Y0M")), "P1Y");
        assert_eq!(format_duration(&duration("PT1.500S")), "PT1.5S");
        assert_eq!(format_duration(&duration("PT0.5S")), "PT0.5S");
        assert_eq!(format_duration(&duration("-P1DT2M")), "-P1DT2M");
        assert_eq!(format_duration(&duration("P1YT0H")), "P1Y");
        assert_eq!(
            format_duration(&duration("-P1Y2M3DT4H5M6.7S")),
            "-P1Y2M3DT4H5M6.7S"
        );
    }

    #[test]
    fn writes_durations_into_any_writer() {
        let mut out = String::from("length ");
        write_duration(&mut out, &duration("PT90M")).unwrap();
        assert_eq!(out, "length PT90M");
        assert_eq!(format!("{}", Duration::zero()), "PT0S");
        assert_eq!(format!("{}", duration("-PT0.010S")), "-PT0.01S");
    }

    #[test]
    fn random_durations_survive_formatting() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let signum = if rng.gen::<bool>() {
                Signum::Negative
            } else {
                Signum::Positive
            };
            let mut field = || if rng.gen_range(0..3) == 0 { 0 } else { rng.gen_range(0..1000) };
            let (y, mo, d, h, mi, s) = (field(), field(), field(), field(), field(), field());
            let nanos = if rng.gen::<bool>() {
                0
            } else {
                rng.gen_range(0..1_000_000_000u32)
            };
            let original = Duration::new(signum, y, mo, d, h, mi, s, nanos).unwrap();
            let text = format_duration(&original);
            assert_eq!(parse_duration(&text).unwrap(), original, "{}", text);
        }
    }

    fn date_time(text: &str) -> PartialDateTime {
        parse_date_time(text).unwrap()
    }

    #[test]
    fn parses_every_kind() {
        let cases = [
            ("2001-10-26T21:32:52", XsdKind::DateTime),
            ("2001-10-26T21:32:52.12679+02:00", XsdKind::DateTime),
            ("2001-10-26", XsdKind::Date),
            ("2001-10", XsdKind::GYearMonth),
            ("2001", XsdKind::GYear),
            ("-0044Z", XsdKind::GYear),
            ("13:20:00-05:00", XsdKind::Time),
            ("--12-25", XsdKind::GMonthDay),
            ("--12", XsdKind::GMonth),
            ("---25Z", XsdKind::GDay),
        ];
        for (text, kind) in cases.iter() {
            let value = date_time(text);
            assert_eq!(value.kind(), Some(*kind), "{}", text);
            assert_eq!(&format_date_time(&value).unwrap(), text);
        }
    }

    #[test]
    fn year_month_wins_over_year_with_timezone() {
        let value = date_time("2000-05");
        assert_eq!(value.month(), Some(5));
        assert_eq!(value.timezone(), None);
    }

    #[test]
    fn date_time_fields() {
        let value = date_time("2001-10-26T21:32:52.5+02:30");
        assert_eq!(value.year(), Some(2001));
        assert_eq!(value.day(), Some(26));
        assert_eq!(value.second(), Some(52));
        assert_eq!(value.fraction(), Some(500_000_000));
        assert_eq!(value.timezone(), Some(150));

        assert_eq!(date_time("2001-10-26T21:32:52+00:00").timezone(), Some(0));
        assert_eq!(
            format_date_time(&date_time("2001-10-26T21:32:52+00:00")).unwrap(),
            "2001-10-26T21:32:52Z"
        );
        assert_eq!(date_time("2001-10-26T24:00:00").hour(), Some(24));
        assert_eq!(date_time("1999-12-31T23:59:60Z").second(), Some(60));
        assert_eq!(date_time("-12345-01-01").year(), Some(-12345));
    }

    #[test]
    fn date_time_errors() {
        // out of range fields are reported where they start
        assert_eq!(parse_date_time("2001-13-01").unwrap_err().offset(), Some(5));
        assert_eq!(parse_date_time("2001-02-29").unwrap_err().offset(), Some(8));
        assert_eq!(parse_date_time("24:00:01").unwrap_err().offset(), Some(0));
        assert_eq!(parse_date_time("0000-01-01").unwrap_err().offset(), Some(0));
        assert_eq!(parse_date_time("2001-10-26T21:32").unwrap_err().offset(), Some(16));
        assert_eq!(parse_date_time("2001-10-26T21:32:52+15:00").unwrap_err().offset(), Some(19));
        assert_eq!(parse_date_time("2001-10-26 21:32:52").unwrap_err().offset(), Some(10));
        assert!(parse_date_time("").is_err());
        assert!(parse_date_time("01-10-26").is_err());
    }

    #[test]
    fn format_needs_a_kind() {
        let year_and_day = PartialDateTime::from_fields(DateTimeFields {
            year: Some(2000),
            day: Some(3),
            ..Default::default()
        })
        .unwrap();
        assert!(format_date_time(&year_and_day).is_err());
    }

    #[test]
    fn random_date_times_survive_formatting() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let year = loop {
                let year = rng.gen_range(-20_000i64..20_000);
                if year != 0 {
                    break year;
                }
            };
            let fields = DateTimeFields {
                year: Some(year),
                month: Some(rng.gen_range(1..13)),
                day: Some(rng.gen_range(1..29)),
                hour: Some(rng.gen_range(0..24)),
                minute: Some(rng.gen_range(0..60)),
                second: Some(rng.gen_range(0..60)),
                fraction: if rng.gen::<bool>() {
                    Some(rng.gen_range(1..1_000_000_000))
                } else {
                    None
                },
                timezone: if rng.gen::<bool>() {
                    Some(rng.gen_range(-840..841))
                } else {
                    None
                },
                ..Default::default()
            };
            let original = PartialDateTime::from_fields(fields).unwrap();
            let text = format_date_time(&original).unwrap();
            let parsed = parse_date_time(&text).unwrap();
            // the fraction is compared as a number, so trailing zeros do not matter
            assert_eq!(parsed, original, "{}", text);
        }
    }
}
