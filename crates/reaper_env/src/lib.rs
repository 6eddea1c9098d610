//! Reaper Environment
//!
//! Host queries that degrade to `None` instead of failing when a platform
//! cannot answer.

pub mod memory;

pub use memory::{process_memory, total_ram, ProcessMemory};
