//! Result sinks

pub mod writer;

pub use writer::{OutputWriter, ResultSink};
