//! Durations and partial date-times following the W3C XML Schema `duration`
//! and `dateTime` value spaces.
//!
//! The two value types are [`Duration`](dates::duration::Duration) and
//! [`PartialDateTime`](dates::datetime::PartialDateTime). Both parse from and
//! format to their ISO 8601 lexical forms, support the XML Schema addition
//! algorithm, and compare under the XML Schema partial order, where some
//! pairs of values are neither less, equal nor greater but
//! [`Indeterminate`](dates::Comparison::Indeterminate).

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;

pub mod core;
pub mod dates;

pub use dates::datetime::{DateTimeFields, Era, PartialDateTime, XsdKind};
pub use dates::duration::{Duration, Signum};
pub use dates::pattern::Pattern;
pub use dates::{Comparison, Field};
pub use crate::core::qm::Error;
