use crate::dates::datetime::{DateTimeFields, Era, PartialDateTime, MAX_TIMEZONE_MINUTES};
use crate::dates::Field;
use crate::core::qm::Error;
use std::fmt;
use std::fmt::Write;
use std::str::FromStr;

/// A format pattern for partial date-times, for layers that let users choose
/// their own date formats. Each token reads or writes one field:
///
/// * `%Y` year, signed, at least four digits
/// * `%M`, `%D` month and day, two digits
/// * `%h`, `%m` hour and minute, two digits
/// * `%s` second, two digits, with an optional `.fraction`
/// * `%z` timezone as `Z`, `+hh:mm` or `-hh:mm` (`±hh` is also read); this
///   one is optional, both when reading and writing
/// * `%G` era as `BC` or `AD`, in which case `%Y` is the unsigned year of
///   the era
/// * `%%` a literal percent sign
///
/// Any other character stands for itself. Parsing only defines the fields
/// that appear in the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
    has_era: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    Era,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Timezone,
}

impl Token {
    fn field(self) -> Option<Field> {
        match self {
            Token::Literal(_) => None,
            Token::Era => Some(Field::Era),
            Token::Year => Some(Field::Year),
            Token::Month => Some(Field::Month),
            Token::Day => Some(Field::Day),
            Token::Hour => Some(Field::Hour),
            Token::Minute => Some(Field::Minute),
            Token::Second => Some(Field::Second),
            Token::Timezone => Some(Field::Timezone),
        }
    }
}

/// The fields read by a pattern, with the offset each one started at so that
/// range errors found later can point at the right place.
pub(crate) struct ParsedFields {
    pub fields: DateTimeFields,
    offsets: Vec<(Field, usize)>,
}

impl ParsedFields {
    /// Validates the fields, reporting range errors at the offset of the
    /// offending field.
    pub fn validate(self) -> Result<PartialDateTime, Error> {
        let offsets = self.offsets;
        PartialDateTime::from_fields(self.fields).map_err(|e| match e {
            Error::OutOfRange(field) => {
                let offset = offsets
                    .iter()
                    .find(|(f, _)| *f == field)
                    .map(|(_, offset)| *offset)
                    .unwrap_or(0);
                Error::parse(offset, &format!("{} out of range", field))
            }
            other => other,
        })
    }
}

impl Pattern {
    /// Compiles a pattern. Fails on an unknown or repeated token, at the
    /// offset of its `%`.
    pub fn compile(pattern: &str) -> Result<Pattern, Error> {
        let (compiled, error) = Pattern::tokenize(pattern);
        match error {
            Some(error) => Err(error),
            None => Ok(compiled),
        }
    }

    /// Compiles one of this crate's own fixed patterns.
    pub(crate) fn fixed(pattern: &str) -> Pattern {
        let (compiled, error) = Pattern::tokenize(pattern);
        debug_assert!(error.is_none(), "bad pattern {}: {:?}", pattern, error);
        compiled
    }

    /// Splits the pattern into tokens, returning the first error alongside
    /// whatever could be tokenized.
    fn tokenize(pattern: &str) -> (Pattern, Option<Error>) {
        let mut tokens: Vec<Token> = Vec::new();
        let mut error = None;
        let mut chars = pattern.char_indices();
        while let Some((offset, c)) = chars.next() {
            if c != '%' {
                tokens.push(Token::Literal(c));
                continue;
            }
            let token = match chars.next() {
                Some((_, 'Y')) => Token::Year,
                Some((_, 'M')) => Token::Month,
                Some((_, 'D')) => Token::Day,
                Some((_, 'h')) => Token::Hour,
                Some((_, 'm')) => Token::Minute,
                Some((_, 's')) => Token::Second,
                Some((_, 'z')) => Token::Timezone,
                Some((_, 'G')) => Token::Era,
                Some((_, '%')) => Token::Literal('%'),
                _ => {
                    error = error.or_else(|| Some(Error::parse(offset, "unknown pattern token")));
                    continue;
                }
            };
            if token.field().is_some() && tokens.contains(&token) {
                error = error.or_else(|| Some(Error::parse(offset, "repeated pattern token")));
                continue;
            }
            tokens.push(token);
        }

        let has_era = tokens.contains(&Token::Era);
        let compiled = Pattern {
            source: pattern.to_string(),
            tokens,
            has_era,
        };
        (compiled, error)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Writes a value using this pattern. Every field named by the pattern
    /// must be defined, apart from the timezone, which is left out if it is
    /// undefined.
    pub fn format(&self, value: &PartialDateTime) -> Result<String, Error> {
        let f = value.fields();
        let mut out = String::new();
        for token in self.tokens.iter() {
            match *token {
                Token::Literal(c) => out.write_char(c)?,
                Token::Era => {
                    let era = f.era.or_else(|| f.year.map(Era::of_year));
                    let era = era.ok_or(Error::FieldRequired(Field::Era))?;
                    out.write_str(match era {
                        Era::BeforeCommonEra => "BC",
                        Era::CommonEra => "AD",
                    })?
                }
                Token::Year => {
                    let year = f.year.ok_or(Error::FieldRequired(Field::Year))?;
                    if year < 0 && !self.has_era {
                        out.push('-');
                    }
                    // i64::MIN has no positive counterpart, so go via u64
                    write!(out, "{:04}", (year as i128).abs() as u64)?
                }
                Token::Month => two_digits(&mut out, f.month, Field::Month)?,
                Token::Day => two_digits(&mut out, f.day, Field::Day)?,
                Token::Hour => two_digits(&mut out, f.hour, Field::Hour)?,
                Token::Minute => two_digits(&mut out, f.minute, Field::Minute)?,
                Token::Second => {
                    two_digits(&mut out, f.second, Field::Second)?;
                    if let Some(nanos) = f.fraction {
                        write!(out, ".{}", fraction_digits(nanos))?;
                    }
                }
                Token::Timezone => match f.timezone {
                    None => {}
                    Some(0) => out.write_str("Z")?,
                    Some(minutes) => {
                        let sign = if minutes < 0 { '-' } else { '+' };
                        let minutes = minutes.abs();
                        write!(out, "{}{:02}:{:02}", sign, minutes / 60, minutes % 60)?
                    }
                },
            }
        }
        Ok(out)
    }

    /// Reads a value using this pattern. The whole text must match. Errors
    /// give the byte offset of the offending character.
    pub fn parse(&self, text: &str) -> Result<PartialDateTime, Error> {
        self.parse_fields(text)?.validate()
    }

    /// Reads the fields without validating their ranges against each other.
    pub(crate) fn parse_fields(&self, text: &str) -> Result<ParsedFields, Error> {
        let mut scanner = Scanner { text, pos: 0 };
        let mut fields = DateTimeFields::default();
        let mut offsets = Vec::new();
        let mut year_offset = 0;

        for token in self.tokens.iter() {
            let start = scanner.pos;
            if let Some(field) = token.field() {
                offsets.push((field, start));
            }
            match *token {
                Token::Literal(c) => scanner.expect(c)?,
                Token::Era => {
                    fields.era = Some(if scanner.eat_str("BC") {
                        Era::BeforeCommonEra
                    } else if scanner.eat_str("AD") {
                        Era::CommonEra
                    } else {
                        return Err(Error::parse(start, "expected BC or AD"));
                    })
                }
                Token::Year => {
                    year_offset = start;
                    fields.year = Some(scanner.year(!self.has_era)?);
                }
                Token::Month => fields.month = Some(scanner.two_digits()?),
                Token::Day => fields.day = Some(scanner.two_digits()?),
                Token::Hour => fields.hour = Some(scanner.two_digits()?),
                Token::Minute => fields.minute = Some(scanner.two_digits()?),
                Token::Second => {
                    fields.second = Some(scanner.two_digits()?);
                    fields.fraction = scanner.fraction()?;
                }
                Token::Timezone => fields.timezone = scanner.timezone()?,
            }
        }
        if scanner.pos != text.len() {
            return Err(Error::parse(scanner.pos, "unexpected trailing characters"));
        }

        // with an era, the year counts backwards before the common era
        if fields.era == Some(Era::BeforeCommonEra) {
            fields.year = match fields.year {
                Some(year) => Some(
                    year.checked_neg()
                        .ok_or_else(|| Error::parse(year_offset, "year too large"))?,
                ),
                None => None,
            };
        }
        Ok(ParsedFields { fields, offsets })
    }
}

fn two_digits(out: &mut String, value: Option<u8>, field: Field) -> Result<(), Error> {
    let value = value.ok_or(Error::FieldRequired(field))?;
    write!(out, "{:02}", value)?;
    Ok(())
}

/// The digits of a fraction of a second, without trailing zeros but with at
/// least one digit.
pub(crate) fn fraction_digits(nanos: u32) -> String {
    let digits = format!("{:09}", nanos);
    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A cursor over the text being parsed.
pub(crate) struct Scanner<'a> {
    pub text: &'a str,
    pub pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).cloned()
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn expect(&mut self, c: char) -> Result<(), Error> {
        if self.text[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else if self.at_end() {
            Err(Error::parse(self.pos, &format!("expected '{}' but the text ended", c)))
        } else {
            Err(Error::parse(self.pos, &format!("expected '{}'", c)))
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.text[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consumes a run of ASCII digits, returning them.
    pub fn digits(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn two_digits(&mut self) -> Result<u8, Error> {
        let start = self.pos;
        let bytes = self.text.as_bytes();
        for i in 0..2 {
            match bytes.get(start + i) {
                Some(b'0'..=b'9') => {}
                _ => return Err(Error::parse(start + i, "expected a digit")),
            }
        }
        self.pos += 2;
        Ok((bytes[start] - b'0') * 10 + (bytes[start + 1] - b'0'))
    }

    /// A year of at least four digits, with no leading zeros beyond four
    /// digits, and optionally a minus sign. Year zero is left for validation
    /// to reject.
    fn year(&mut self, signed: bool) -> Result<i64, Error> {
        let start = self.pos;
        let negative = signed && self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let digits_start = self.pos;
        let digits = self.digits();
        if digits.len() < 4 {
            return Err(Error::parse(self.pos, "expected at least four digits of year"));
        }
        if digits.len() > 4 && digits.starts_with('0') {
            return Err(Error::parse(digits_start, "leading zero in year"));
        }
        let magnitude: i64 = digits
            .parse()
            .map_err(|_| Error::parse(start, "year too large"))?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// An optional `.` and up to nine digits, as nanoseconds.
    pub fn fraction(&mut self) -> Result<Option<u32>, Error> {
        if self.peek() != Some(b'.') {
            return Ok(None);
        }
        self.pos += 1;
        let start = self.pos;
        let digits = self.digits();
        if digits.is_empty() {
            return Err(Error::parse(start, "expected digits after '.'"));
        }
        if digits.len() > 9 {
            return Err(Error::parse(start + 9, "fraction finer than a nanosecond"));
        }
        let mut nanos: u32 = 0;
        for b in digits.bytes().chain(std::iter::repeat(b'0')).take(9) {
            nanos = nanos * 10 + (b - b'0') as u32;
        }
        Ok(Some(nanos))
    }

    /// An optional timezone: `Z`, `±hh:mm` or `±hh`.
    fn timezone(&mut self) -> Result<Option<i16>, Error> {
        let start = self.pos;
        let sign = match self.peek() {
            Some(b'Z') => {
                self.pos += 1;
                return Ok(Some(0));
            }
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return Ok(None),
        };
        self.pos += 1;
        let hours = self.two_digits()? as i16;
        let minutes = if self.peek() == Some(b':') {
            self.pos += 1;
            let minutes_start = self.pos;
            let minutes = self.two_digits()? as i16;
            if minutes > 59 {
                return Err(Error::parse(minutes_start, "timezone minutes out of range"));
            }
            minutes
        } else {
            0
        };
        let total = hours * 60 + minutes;
        if total > MAX_TIMEZONE_MINUTES {
            return Err(Error::parse(start, "timezone out of range"));
        }
        Ok(Some(sign * total))
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::compile(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_rejects_bad_tokens() {
        assert_eq!(Pattern::compile("%Y-%Q").unwrap_err().offset(), Some(3));
        assert_eq!(Pattern::compile("%Y%").unwrap_err().offset(), Some(2));
        assert_eq!(Pattern::compile("%Y/%Y").unwrap_err().offset(), Some(3));
        assert!(Pattern::compile("100%% %Y").is_ok());
    }

    #[test]
    fn formats_user_patterns() {
        let pattern = Pattern::compile("%D/%M/%Y %h.%m").unwrap();
        let value = PartialDateTime::date_time(2003, 2, 8, 9, 5, 0, None).unwrap();
        assert_eq!(pattern.format(&value).unwrap(), "08/02/2003 09.05");

        let percent = Pattern::compile("%Y%%").unwrap();
        assert_eq!(percent.format(&value).unwrap(), "2003%");
    }

    #[test]
    fn format_needs_fields_except_timezone() {
        let pattern = Pattern::compile("%Y-%M-%D%z").unwrap();
        let date = PartialDateTime::date(2003, 2, 8, None).unwrap();
        assert_eq!(pattern.format(&date).unwrap(), "2003-02-08");
        let zoned = PartialDateTime::date(2003, 2, 8, Some(-90)).unwrap();
        assert_eq!(pattern.format(&zoned).unwrap(), "2003-02-08-01:30");

        let time = Pattern::compile("%h:%m").unwrap();
        assert_eq!(time.format(&date), Err(Error::FieldRequired(Field::Hour)));
    }

    #[test]
    fn parses_user_patterns() {
        let pattern = Pattern::compile("%D/%M/%Y").unwrap();
        let value = pattern.parse("08/02/2003").unwrap();
        assert_eq!(value, PartialDateTime::date(2003, 2, 8, None).unwrap());
        assert_eq!(value.hour(), None);
    }

    #[test]
    fn parse_errors_have_offsets() {
        let pattern = Pattern::compile("%D/%M/%Y").unwrap();
        assert_eq!(pattern.parse("08-02-2003").unwrap_err().offset(), Some(2));
        assert_eq!(pattern.parse("08/2/2003").unwrap_err().offset(), Some(4));
        assert_eq!(pattern.parse("08/02/203").unwrap_err().offset(), Some(9));
        assert_eq!(pattern.parse("08/02/2003x").unwrap_err().offset(), Some(10));
        // range errors point at the field
        assert_eq!(pattern.parse("30/02/2003").unwrap_err().offset(), Some(0));
        assert_eq!(pattern.parse("08/13/2003").unwrap_err().offset(), Some(3));
        assert_eq!(pattern.parse("08/02/0000").unwrap_err().offset(), Some(6));
        assert_eq!(pattern.parse("08/02/02003").unwrap_err().offset(), Some(6));
    }

    #[test]
    fn seconds_and_fractions() {
        let pattern = Pattern::compile("%h:%m:%s").unwrap();
        let value = pattern.parse("10:20:30.125").unwrap();
        assert_eq!(value.second(), Some(30));
        assert_eq!(value.fraction(), Some(125_000_000));
        assert_eq!(pattern.format(&value).unwrap(), "10:20:30.125");

        let value = pattern.parse("10:20:30.0").unwrap();
        assert_eq!(value.fraction(), Some(0));
        assert_eq!(pattern.format(&value).unwrap(), "10:20:30.0");

        assert_eq!(pattern.parse("10:20:30.").unwrap_err().offset(), Some(9));
        assert_eq!(
            pattern.parse("10:20:30.1234567891").unwrap_err().offset(),
            Some(18)
        );
        assert_eq!(pattern.parse("10:20:30.123456789").unwrap().fraction(), Some(123_456_789));
    }

    #[test]
    fn timezones() {
        let pattern = Pattern::compile("%h:%m%z").unwrap();
        assert_eq!(pattern.parse("10:20").unwrap().timezone(), None);
        assert_eq!(pattern.parse("10:20Z").unwrap().timezone(), Some(0));
        assert_eq!(pattern.parse("10:20+05:30").unwrap().timezone(), Some(330));
        assert_eq!(pattern.parse("10:20-05").unwrap().timezone(), Some(-300));
        assert_eq!(pattern.parse("10:20+14:01").unwrap_err().offset(), Some(5));
        assert_eq!(pattern.parse("10:20+10:60").unwrap_err().offset(), Some(9));
        assert_eq!(pattern.parse("10:20+1").unwrap_err().offset(), Some(7));
    }

    #[test]
    fn eras() {
        let pattern = Pattern::compile("%Y %G").unwrap();
        let value = pattern.parse("0044 BC").unwrap();
        assert_eq!(value.year(), Some(-44));
        assert_eq!(value.era(), Some(Era::BeforeCommonEra));
        assert_eq!(pattern.format(&value).unwrap(), "0044 BC");

        let common = PartialDateTime::date(1066, 10, 14, None).unwrap();
        assert_eq!(pattern.format(&common).unwrap(), "1066 AD");

        // the sign belongs to the era, not the year
        assert!(pattern.parse("-0044 BC").is_err());
        assert_eq!(pattern.parse("0044 XX").unwrap_err().offset(), Some(5));
    }

    #[test]
    fn signed_years() {
        let pattern = Pattern::compile("%Y").unwrap();
        assert_eq!(pattern.parse("-0044").unwrap().year(), Some(-44));
        assert_eq!(pattern.parse("123456").unwrap().year(), Some(123_456));
        let value = pattern.parse("-0044").unwrap();
        assert_eq!(pattern.format(&value).unwrap(), "-0044");
    }

    #[test]
    fn fraction_digit_trimming() {
        assert_eq!(fraction_digits(0), "0");
        assert_eq!(fraction_digits(500_000_000), "5");
        assert_eq!(fraction_digits(1), "000000001");
        assert_eq!(fraction_digits(120_000_000), "12");
    }
}
