//! CloudWatch Logs destination for relayed records.
//!
//! `CloudWatchSink` implements `LogSink` by issuing one `PutLogEvents`
//! call per record, so call order is delivery order.

pub mod errors;
pub mod sink;

pub use sink::{CloudWatchSink, MAX_MESSAGE_BYTES, SinkOptions};
