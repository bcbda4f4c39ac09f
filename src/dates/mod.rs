pub mod arithmetic;
pub mod calendar;
pub mod datetime;
pub mod duration;
pub mod lexical;
pub mod order;
pub mod pattern;

use derive_more::Display;
use std::cmp::Ordering;

/// The outcome of comparing two values under a partial order.
///
/// Durations and date-times without timezones are only partially ordered.
/// For example, one month is neither shorter nor longer than 30 days, since
/// it depends on which month. Such pairs compare as `Indeterminate`, which
/// is a normal result rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Comparison {
    #[display(fmt = "less")]
    Less,
    #[display(fmt = "equal")]
    Equal,
    #[display(fmt = "greater")]
    Greater,
    #[display(fmt = "indeterminate")]
    Indeterminate,
}

impl Comparison {
    /// Converts to a total-order result, if the comparison was decisive.
    pub fn to_ordering(self) -> Option<Ordering> {
        match self {
            Comparison::Less => Some(Ordering::Less),
            Comparison::Equal => Some(Ordering::Equal),
            Comparison::Greater => Some(Ordering::Greater),
            Comparison::Indeterminate => None,
        }
    }

    /// The result of the comparison with the operands swapped.
    pub fn reverse(self) -> Comparison {
        match self {
            Comparison::Less => Comparison::Greater,
            Comparison::Greater => Comparison::Less,
            other => other,
        }
    }

    pub fn is_determinate(self) -> bool {
        self != Comparison::Indeterminate
    }
}

impl From<Ordering> for Comparison {
    fn from(ordering: Ordering) -> Comparison {
        match ordering {
            Ordering::Less => Comparison::Less,
            Ordering::Equal => Comparison::Equal,
            Ordering::Greater => Comparison::Greater,
        }
    }
}

/// Names the fields of a partial date-time, for use in errors and patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Field {
    #[display(fmt = "era")]
    Era,
    #[display(fmt = "year")]
    Year,
    #[display(fmt = "month")]
    Month,
    #[display(fmt = "day")]
    Day,
    #[display(fmt = "hour")]
    Hour,
    #[display(fmt = "minute")]
    Minute,
    #[display(fmt = "second")]
    Second,
    #[display(fmt = "fractional second")]
    FractionalSecond,
    #[display(fmt = "timezone")]
    Timezone,
}
