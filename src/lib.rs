pub mod region;
pub mod shell;

pub use region::Result as RegionResult;
pub use region::{AllocError, MemStats, Owner, ProcessId, Region, RegionAllocator};
pub use shell::{Command, Flow, ParseError, Session};
