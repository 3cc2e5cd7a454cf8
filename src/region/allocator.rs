use std::mem;

use log::{debug, trace, warn};

use super::{AllocError, MemStats, Owner, ProcessId, Region, RegionAllocator, Result};

impl RegionAllocator {
    /// Create a new `RegionAllocator` whose whole address space `0..total_size` is one free
    /// region.
    ///
    /// It errors with `AllocError::InvalidSize` if `total_size` is zero.
    pub fn new(total_size: u32) -> Result<Self> {
        if total_size == 0 {
            return Err(AllocError::InvalidSize);
        }

        debug!("new address space of {total_size} units");
        Ok(Self {
            regions: vec![Region::free(0, total_size)],
            total_size,
        })
    }

    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Number of regions, free ones included.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The current region list in ascending start order.
    pub fn snapshot(&self) -> &[Region] {
        &self.regions
    }

    pub fn find(&self, process_id: &ProcessId) -> Option<&Region> {
        self.regions.iter().find(|x| x.owner.is(process_id))
    }

    pub fn stats(&self) -> MemStats {
        let mut stats = MemStats {
            total: self.total_size,
            ..MemStats::default()
        };

        for region in &self.regions {
            if region.is_free() {
                stats.free += region.size;
                stats.free_regions += 1;
                stats.largest_free = stats.largest_free.max(region.size);
            } else {
                stats.used += region.size;
                stats.allocated_regions += 1;
            }
        }

        stats
    }

    // index of the first free region by start that can hold `size`
    fn first_fit(&self, size: u32) -> Option<usize> {
        self.regions.iter().position(|region| {
            if !region.is_free() {
                return false;
            }
            if region.size < size {
                trace!("skipping free region {region}, too small for {size}");
                return false;
            }
            true
        })
    }

    /// Allocates `size` units under `process_id` in the first free region (lowest start) that is
    /// large enough, splitting off the unused tail as a new free region.
    ///
    /// It errors with `AllocError::InvalidSize` for a zero size, `AllocError::AlreadyAllocated`
    /// if the process already owns a region and `AllocError::OutOfSpace` if no free region is
    /// large enough. The region list is untouched on error.
    pub fn allocate(&mut self, process_id: &ProcessId, size: u32) -> Result<()> {
        if size == 0 {
            return Err(AllocError::InvalidSize);
        }

        if self.find(process_id).is_some() {
            return Err(AllocError::AlreadyAllocated);
        }

        let Some(idx) = self.first_fit(size) else {
            let stats = self.stats();
            warn!(
                "no free region for {process_id} ({size} requested, {} free, largest {})",
                stats.free, stats.largest_free
            );
            return Err(AllocError::OutOfSpace {
                requested: size,
                free: stats.free,
                largest: stats.largest_free,
            });
        };

        let start = self.regions[idx].start;
        let rest = self.regions[idx].size - size;
        if rest != 0 {
            debug!("splitting region at {start}: {size} to {process_id}, {rest} left free");
            self.regions.insert(idx + 1, Region::free(start + size, rest));
        }

        self.regions[idx] = Region::new(Owner::Allocated(process_id.clone()), start, size);

        debug_assert_eq!(self.check_invariants(), Ok(()));
        Ok(())
    }

    /// Releases every region owned by `process_id` and coalesces neighbouring free regions,
    /// returning how many regions were released.
    ///
    /// It errors with `AllocError::NotFound` if the process owns nothing.
    pub fn free(&mut self, process_id: &ProcessId) -> Result<usize> {
        let mut released = 0;
        for region in self.regions.iter_mut().filter(|x| x.owner.is(process_id)) {
            region.owner = Owner::Free;
            released += 1;
        }

        if released == 0 {
            warn!("free of unknown process {process_id}");
            return Err(AllocError::NotFound);
        }

        self.merge_free();

        debug_assert_eq!(self.check_invariants(), Ok(()));
        Ok(released)
    }

    // one left to right pass, folding each free region into a free predecessor
    fn merge_free(&mut self) {
        let mut merged: Vec<Region> = Vec::with_capacity(self.regions.len());

        for region in mem::take(&mut self.regions) {
            match merged.last_mut() {
                Some(prev) if prev.is_free() && region.is_free() => {
                    debug!("merging free region {region} into {prev}");
                    prev.size += region.size;
                }
                _ => merged.push(region),
            }
        }

        self.regions = merged;
    }

    /// Moves every allocated region to the front of the address space, keeping their order, and
    /// leaves one free region at the end (none if memory is full).
    ///
    /// Starts of allocated regions may change; query `snapshot()` or `find()` again afterwards.
    pub fn compact(&mut self) {
        let mut packed = Vec::with_capacity(self.regions.len());
        let mut cursor = 0;

        for region in mem::take(&mut self.regions) {
            if region.is_free() {
                continue;
            }

            if region.start != cursor {
                debug!("relocating {region} to {cursor}");
            }

            let size = region.size;
            packed.push(Region {
                start: cursor,
                ..region
            });
            cursor += size;
        }

        if cursor < self.total_size {
            packed.push(Region::free(cursor, self.total_size - cursor));
        }

        self.regions = packed;

        debug_assert_eq!(self.check_invariants(), Ok(()));
    }

    /// Checks the structural invariants of the region list, describing the first violation.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let Some(first) = self.regions.first() else {
            return Err("region list is empty".to_string());
        };
        if first.start != 0 {
            return Err(format!("first region starts at {}", first.start));
        }

        let mut owners: Vec<&ProcessId> = Vec::new();
        for (idx, region) in self.regions.iter().enumerate() {
            if region.size == 0 {
                return Err(format!("region {idx} has zero size"));
            }

            if let Owner::Allocated(id) = &region.owner {
                if owners.contains(&id) {
                    return Err(format!("process {id} owns more than one region"));
                }
                owners.push(id);
            }

            if let Some(next) = self.regions.get(idx + 1) {
                if region.end() != next.start {
                    return Err(format!(
                        "region {idx} ends at {} but the next starts at {}",
                        region.end(),
                        next.start
                    ));
                }
                if region.is_free() && next.is_free() {
                    return Err(format!("regions {idx} and {} are both free", idx + 1));
                }
            }
        }

        let end = self.regions[self.regions.len() - 1].end();
        if end != self.total_size {
            return Err(format!(
                "regions end at {end}, address space is {}",
                self.total_size
            ));
        }

        Ok(())
    }
}
