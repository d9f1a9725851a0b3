//! Persistence of harness output.
//!
//! The CSV result table is the contract with downstream plotting; the JSON
//! Lines repetition log is an optional audit trail.

pub mod csv;
pub mod jsonl;

pub use self::csv::{CSV_HEADERS, ResultSink};
pub use jsonl::RepetitionLog;
