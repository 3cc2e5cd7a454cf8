// impl RegionAllocator
pub mod allocator;

// types
pub mod types;

pub use types::{AllocError, MemStats, Owner, ProcessId, Region, RegionAllocator, Result};
