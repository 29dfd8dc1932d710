//! Address-range validation for protected mode.
//!
//! A validator answers one question: may `[start, end)` be touched? The stream
//! asks it once per transfer, before any command is sent.

use std::fmt;

pub trait AddressValidator {
    /// True when every address in `[start, end)` is safe to access
    fn is_valid_address_range(&self, start: i64, end: i64) -> bool;
}

impl<F> AddressValidator for F
where
    F: Fn(i64, i64) -> bool,
{
    fn is_valid_address_range(&self, start: i64, end: i64) -> bool {
        self(start, end)
    }
}

/// Accepts every range
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AddressValidator for AllowAll {
    fn is_valid_address_range(&self, _start: i64, _end: i64) -> bool {
        true
    }
}

/// A mapped span of remote memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: i64,
    pub size: u64,
}

impl MemoryRegion {
    pub fn new(base: i64, size: u64) -> Self {
        Self { base, size }
    }

    /// One past the last address, saturating at `i64::MAX`
    pub fn end(&self) -> i64 {
        let size = i64::try_from(self.size).unwrap_or(i64::MAX);
        self.base.saturating_add(size)
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}..{:#010x}", self.base, self.end())
    }
}

/// Set of mapped regions, kept sorted and coalesced
///
/// A range is valid when every byte falls inside some region. Ranges may span
/// regions that touch or overlap.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: Vec<MemoryRegion>,
}

impl RegionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_regions<I>(regions: I) -> Self
    where
        I: IntoIterator<Item = MemoryRegion>,
    {
        let mut map = Self::new();
        for region in regions {
            map.insert(region);
        }
        map
    }

    pub fn insert(&mut self, region: MemoryRegion) {
        if region.size == 0 {
            return;
        }

        let (mut start, mut end) = (region.base, region.end());
        // Absorb every region that overlaps or touches the new one
        self.regions.retain(|r| {
            if r.end() < start || r.base > end {
                return true;
            }
            start = start.min(r.base);
            end = end.max(r.end());
            false
        });

        let merged = MemoryRegion::new(start, (end - start) as u64);
        let at = self.regions.partition_point(|r| r.base < start);
        self.regions.insert(at, merged);
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl AddressValidator for RegionMap {
    fn is_valid_address_range(&self, start: i64, end: i64) -> bool {
        if end <= start {
            return end == start;
        }
        let at = self.regions.partition_point(|r| r.end() <= start);
        self.regions
            .get(at)
            .is_some_and(|r| r.base <= start && end <= r.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xbox_like() -> RegionMap {
        RegionMap::from_regions([
            MemoryRegion::new(0x10000, 0x1000),
            MemoryRegion::new(0x11000, 0x2000),
            MemoryRegion::new(0x8000_0000, 0x1000),
        ])
    }

    #[test]
    fn test_adjacent_regions_coalesce() {
        let map = xbox_like();
        assert_eq!(
            map.regions(),
            &[
                MemoryRegion::new(0x10000, 0x3000),
                MemoryRegion::new(0x8000_0000, 0x1000)
            ]
        );
    }

    #[test]
    fn test_range_inside_region() {
        let map = xbox_like();
        assert!(map.is_valid_address_range(0x10000, 0x10400));
        assert!(map.is_valid_address_range(0x10ff0, 0x11010));
        assert!(map.is_valid_address_range(0x8000_0000, 0x8000_1000));
    }

    #[test]
    fn test_range_crossing_gap_is_invalid() {
        let map = xbox_like();
        assert!(!map.is_valid_address_range(0x12ff0, 0x13010));
        assert!(!map.is_valid_address_range(0x0, 0x10));
        assert!(!map.is_valid_address_range(0x8000_0ff0, 0x8000_1001));
    }

    #[test]
    fn test_empty_range() {
        let map = RegionMap::new();
        assert!(map.is_valid_address_range(0x1234, 0x1234));
        assert!(!map.is_valid_address_range(0x1234, 0x1000));
    }

    #[test]
    fn test_overlapping_insert_merges() {
        let mut map = RegionMap::new();
        map.insert(MemoryRegion::new(0x2000, 0x1000));
        map.insert(MemoryRegion::new(0x0, 0x800));
        map.insert(MemoryRegion::new(0x1800, 0x1000));
        assert_eq!(
            map.regions(),
            &[
                MemoryRegion::new(0x0, 0x800),
                MemoryRegion::new(0x1800, 0x1800)
            ]
        );
    }

    #[test]
    fn test_closure_validator() {
        let below_4k = |start: i64, end: i64| start >= 0 && end <= 0x1000;
        assert!(below_4k.is_valid_address_range(0, 0x1000));
        assert!(!below_4k.is_valid_address_range(0xfff, 0x1001));
        assert!(AllowAll.is_valid_address_range(i64::MIN, i64::MAX));
    }
}
