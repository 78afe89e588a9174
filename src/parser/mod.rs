//! Line parser for game log text.
//!
//! Maps raw lines onto typed [`Event`]s using a configurable pattern table.
//! Lines that match no pattern are not an error; they are simply skipped.

mod event;
mod line;
mod patterns;

pub use event::{Event, MissionOutcome, TransactionKind};
pub use line::{parse_timestamp, LineParser};
pub use patterns::{
    LinePattern, PatternError, PatternKind, PatternSpec, PatternTable, QuantityUnit,
};
