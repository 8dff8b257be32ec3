//! Types and traits for recording training metrics.
//!
//! A [`Record`] is a container of key-value pairs produced during training
//! and evaluation: the trainer merges the per-iteration statistics with the
//! diagnostics emitted by the agent's optimization step, then hands the
//! record to a [`Recorder`] sink.
//!
//! Two sinks are provided: [`NullRecorder`] discards everything (useful in
//! tests) and [`CsvRecorder`] appends one row per iteration to a CSV file.
mod base;
mod csv_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use csv_recorder::CsvRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
