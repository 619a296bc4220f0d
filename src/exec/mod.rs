//! External command execution.
//!
//! This module provides the line-streaming executor used to drive render
//! steps and version control commands:
//! - Immutable command templates with per-invocation argument extension
//! - Incremental delivery of combined stdout/stderr lines to a sink
//! - Cancellation tokens and deadlines for bounded-time runs

mod cancel;
mod command;
mod stream;

pub use cancel::{CancellationReason, CancellationSource, CancellationToken};
pub use command::{CommandTemplate, Invocation};
pub use stream::LineExecutor;
