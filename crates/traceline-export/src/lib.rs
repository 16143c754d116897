//! Reporter implementations.
//!
//! The core hands finished PDUs to a [`traceline_core::Reporter`]; these are
//! the bundled destinations. Real deployments put a partitioned message
//! stream behind the same two-method interface.

pub mod file;
pub mod memory;

pub use file::{FileReporter, FileReporterConfig};
pub use memory::{Delivery, MemoryReporter};
