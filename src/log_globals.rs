//! Global log stream instances.
//!
//! One stream per execution context: the UART interrupt and the runner task
//! never share a producer slot sequence, and the drain prefers the ISR side.

use crate::logging::LogStream;

/// Interrupt-side stream: pool exhaustion, dropped bytes.
pub static ISR_LOG_STREAM: LogStream = LogStream::new();

/// Task-side stream: session switches, uploads, boot autorun, TX stalls.
pub static TASK_LOG_STREAM: LogStream = LogStream::new();
