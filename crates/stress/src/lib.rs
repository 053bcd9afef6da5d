//! Shared pieces for the synthetic load worker binaries
//!
//! The workers are independent executables launched by the optimizer:
//! `cpu-stress` spins worker threads, `memory-stress` holds resident
//! memory, and `disk-stress` keeps a randomized temp file around for a
//! bounded time.

pub mod size;

pub use size::{parse_size, parse_size_arg, SizeError, GIB, MIB};
