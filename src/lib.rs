//! txscan - suspicious transaction scanner
//!
//! Rule views flag transactions independently; the scanner merges their
//! verdicts into one reason-annotated record per transaction and user.

pub mod pipeline;
pub mod scanner_core;
pub mod sqlite_pragma;
