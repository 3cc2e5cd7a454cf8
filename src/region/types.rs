use std::fmt;

/// Id reserved for display of unowned memory, never accepted as a process id.
pub(super) const RESERVED_ID: &str = "free";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    InvalidSize,
    InvalidId,
    AlreadyAllocated,
    OutOfSpace {
        requested: u32,
        free: u32,
        largest: u32,
    },
    NotFound,
}

impl AllocError {
    /// Whether an `OutOfSpace` failure happened with enough total free memory, i.e. no single
    /// free region was big enough.
    pub fn is_fragmentation(&self) -> bool {
        match self {
            AllocError::OutOfSpace {
                requested, free, ..
            } => free >= requested,
            _ => false,
        }
    }
}

impl std::error::Error for AllocError {}

pub type Result<T> = std::result::Result<T, AllocError>;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AllocError::InvalidSize => write!(f, "size must be a positive integer"),
            AllocError::InvalidId => write!(
                f,
                "process id must be non-empty and must not be `{RESERVED_ID}`"
            ),
            AllocError::AlreadyAllocated => {
                write!(f, "this process id already owns a memory region")
            }
            AllocError::OutOfSpace {
                requested,
                largest,
                ..
            } => {
                write!(
                    f,
                    "not enough space for {requested} units (largest free region is {largest})"
                )?;
                if self.is_fragmentation() {
                    write!(f, " (external fragmentation may exist)")?;
                }
                Ok(())
            }
            AllocError::NotFound => write!(f, "no region is owned by the given process id"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessId(String);

impl ProcessId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.trim().is_empty() || id.eq_ignore_ascii_case(RESERVED_ID) {
            return Err(AllocError::InvalidId);
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Free,
    Allocated(ProcessId),
}

impl Owner {
    pub fn is_free(&self) -> bool {
        matches!(self, Owner::Free)
    }

    pub fn is(&self, process_id: &ProcessId) -> bool {
        matches!(self, Owner::Allocated(owner) if owner == process_id)
    }
}

/// A maximal contiguous span of the address space with uniform ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub owner: Owner,
    pub start: u32,
    pub size: u32,
}

impl Region {
    pub fn new(owner: Owner, start: u32, size: u32) -> Self {
        Self { owner, start, size }
    }

    pub fn free(start: u32, size: u32) -> Self {
        Self::new(Owner::Free, start, size)
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u32 {
        self.start + self.size
    }

    /// Inclusive last offset, as shown in the status table.
    pub fn last(&self) -> u32 {
        self.end() - 1
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_free()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} - {}] ", self.start, self.last())?;
        match &self.owner {
            Owner::Free => write!(f, "Free")?,
            Owner::Allocated(id) => write!(f, "Process {id}")?,
        }
        write!(f, " ({})", self.size)
    }
}

/// Occupancy tallies over the region list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemStats {
    pub total: u32,
    pub used: u32,
    pub free: u32,
    pub largest_free: u32,
    pub allocated_regions: usize,
    pub free_regions: usize,
}

impl MemStats {
    /// Free memory is split over more than one region.
    pub fn fragmented(&self) -> bool {
        self.free_regions > 1
    }
}

impl fmt::Display for MemStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "used {}/{} in {} region(s), free {} in {} region(s), largest free {}",
            self.used,
            self.total,
            self.allocated_regions,
            self.free,
            self.free_regions,
            self.largest_free
        )
    }
}

#[derive(Debug, Clone)]
pub struct RegionAllocator {
    // sorted by start, covering 0..total_size without gaps
    pub(super) regions: Vec<Region>,
    pub(super) total_size: u32,
}
