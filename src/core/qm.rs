use crate::dates::Field;
use derive_more::Display;
use std::error;
use std::fmt;

/// The error type for everything in this crate.
///
/// Note that an indeterminate comparison is not an error. Comparators return
/// `Comparison::Indeterminate` for pairs of values that have no order, and
/// only fail for genuine problems such as missing fields or magnitudes too
/// large to compare.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Error {
    /// The text could not be parsed. The offset is a byte offset into the
    /// input, pointing at the offending character (or at the end of the
    /// input if it ended too early).
    #[display(fmt = "parse error at offset {}: {}", offset, message)]
    Parse { offset: usize, message: String },

    /// A field value lies outside its legal range.
    #[display(fmt = "{} is out of range", _0)]
    OutOfRange(Field),

    /// An operation needed a field that is undefined.
    #[display(fmt = "{} is required", _0)]
    FieldRequired(Field),

    /// The operation would have to convert between months and days, which
    /// has no fixed ratio.
    #[display(fmt = "incommensurable duration")]
    IncommensurableDuration,

    /// The values are too large for the comparison algorithms.
    #[display(fmt = "unsupported: {}", _0)]
    Unsupported(String),

    /// 64 bit arithmetic overflowed.
    #[display(fmt = "arithmetic overflow")]
    Overflow,

    #[display(fmt = "invalid argument: {}", _0)]
    InvalidArgument(String),

    /// Writing formatted text failed.
    #[display(fmt = "formatting failed")]
    Format,
}

impl Error {
    pub fn parse(offset: usize, message: &str) -> Error {
        Error::Parse {
            offset,
            message: message.to_string(),
        }
    }

    /// The character offset of a parse failure, if this is one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Parse { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl error::Error for Error {}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Error {
        Error::Format
    }
}

/// Turns a missing value from a checked integer operation into an overflow.
pub fn checked<T>(value: Option<T>) -> Result<T, Error> {
    value.ok_or(Error::Overflow)
}
