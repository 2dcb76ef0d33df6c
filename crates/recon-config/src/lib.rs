//! Process-level configuration shared by the spiral-recon crates.
//!
//! Nothing in here is read from files: every knob is an environment variable
//! so that library code stays free of I/O.

pub mod determinism;
pub mod tracing;
