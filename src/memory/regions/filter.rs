//! Memory region filtering functionality

use crate::core::types::{Address, MemoryRegion, RegionState, RegionType};

/// Criteria for filtering memory regions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Filter by minimum size
    pub min_size: Option<usize>,
    /// Filter by maximum size
    pub max_size: Option<usize>,
    /// Filter by state
    pub state: Option<RegionState>,
    /// Filter by type
    pub region_type: Option<RegionType>,
    /// Filter by readable regions only
    pub readable_only: bool,
    /// Filter by writable regions only
    pub writable_only: bool,
    /// Filter by executable regions only
    pub executable_only: bool,
    /// Keep regions lying entirely inside `[start, end)`
    pub address_range: Option<(Address, Address)>,
    /// Exclude guarded pages
    pub exclude_guarded: bool,
}

impl FilterCriteria {
    /// Create a new filter criteria builder
    pub fn new() -> Self {
        FilterCriteria::default()
    }

    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = Some(size);
        self
    }

    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    pub fn with_state(mut self, state: RegionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_type(mut self, region_type: RegionType) -> Self {
        self.region_type = Some(region_type);
        self
    }

    pub fn readable(mut self) -> Self {
        self.readable_only = true;
        self
    }

    pub fn writable(mut self) -> Self {
        self.writable_only = true;
        self
    }

    pub fn executable(mut self) -> Self {
        self.executable_only = true;
        self
    }

    pub fn with_address_range(mut self, start: Address, end: Address) -> Self {
        self.address_range = Some((start, end));
        self
    }

    pub fn exclude_guarded_pages(mut self) -> Self {
        self.exclude_guarded = true;
        self
    }
}

/// Filter for memory regions
#[derive(Debug, Clone)]
pub struct RegionFilter {
    criteria: FilterCriteria,
}

impl RegionFilter {
    pub fn new(criteria: FilterCriteria) -> Self {
        RegionFilter { criteria }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Apply the filter to a list of regions
    pub fn apply(&self, regions: &[MemoryRegion]) -> Vec<MemoryRegion> {
        regions
            .iter()
            .filter(|region| self.matches(region))
            .cloned()
            .collect()
    }

    /// Check if a region matches the filter criteria
    pub fn matches(&self, region: &MemoryRegion) -> bool {
        let criteria = &self.criteria;

        if criteria.min_size.map_or(false, |min| region.size < min) {
            return false;
        }
        if criteria.max_size.map_or(false, |max| region.size > max) {
            return false;
        }
        if criteria.state.map_or(false, |state| region.state != state) {
            return false;
        }
        if criteria
            .region_type
            .map_or(false, |region_type| region.region_type != region_type)
        {
            return false;
        }

        if criteria.readable_only && !region.is_readable() {
            return false;
        }
        if criteria.writable_only && !region.is_writable() {
            return false;
        }
        if criteria.executable_only && !region.is_executable() {
            return false;
        }

        if let Some((start, end)) = criteria.address_range {
            if region.base_address < start || region.end_address() > end {
                return false;
            }
        }

        !(criteria.exclude_guarded && region.is_guarded())
    }

    pub fn count(&self, regions: &[MemoryRegion]) -> usize {
        regions.iter().filter(|region| self.matches(region)).count()
    }

    /// Get total size of regions matching the filter
    pub fn total_size(&self, regions: &[MemoryRegion]) -> usize {
        regions
            .iter()
            .filter(|region| self.matches(region))
            .map(|region| region.size)
            .sum()
    }
}

/// Common filter presets
pub mod presets {
    use super::*;

    /// Committed executable code, guard pages excluded
    pub fn executable_code() -> FilterCriteria {
        FilterCriteria::new()
            .executable()
            .with_state(RegionState::Committed)
            .exclude_guarded_pages()
    }

    /// Committed, writable private memory
    pub fn heap_regions() -> FilterCriteria {
        FilterCriteria::new()
            .with_type(RegionType::Private)
            .writable()
            .with_state(RegionState::Committed)
            .exclude_guarded_pages()
    }

    /// Committed module images
    pub fn image_regions() -> FilterCriteria {
        FilterCriteria::new()
            .with_type(RegionType::Image)
            .with_state(RegionState::Committed)
    }

    /// Committed regions of at least 1 MiB
    pub fn large_regions() -> FilterCriteria {
        FilterCriteria::new()
            .with_min_size(1024 * 1024)
            .with_state(RegionState::Committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(base: usize, size: usize, protection: u32, region_type: RegionType) -> MemoryRegion {
        MemoryRegion::new(
            Address::new(base),
            size,
            protection,
            RegionState::Committed,
            region_type,
        )
    }

    #[test]
    fn test_filter_criteria_builder() {
        let criteria = FilterCriteria::new()
            .with_min_size(4096)
            .with_max_size(1024 * 1024)
            .readable()
            .writable()
            .exclude_guarded_pages();

        assert_eq!(criteria.min_size, Some(4096));
        assert_eq!(criteria.max_size, Some(1024 * 1024));
        assert!(criteria.readable_only);
        assert!(criteria.writable_only);
        assert!(criteria.exclude_guarded);
    }

    #[test]
    fn test_region_filter_matching() {
        let data = region(0x1000, 8192, 0x04, RegionType::Private);

        let filter = RegionFilter::new(
            FilterCriteria::new()
                .with_min_size(4096)
                .readable()
                .with_state(RegionState::Committed),
        );
        assert!(filter.matches(&data));

        let filter2 = RegionFilter::new(FilterCriteria::new().executable());
        assert!(!filter2.matches(&data));
    }

    #[test]
    fn test_address_range_and_guard() {
        let inside = region(0x2000, 0x1000, 0x04, RegionType::Private);
        let straddling = region(0x2800, 0x1000, 0x04, RegionType::Private);
        let guarded = region(0x2000, 0x100, 0x104, RegionType::Private);

        let filter = RegionFilter::new(
            FilterCriteria::new()
                .with_address_range(Address::new(0x2000), Address::new(0x3000))
                .exclude_guarded_pages(),
        );
        assert!(filter.matches(&inside));
        assert!(!filter.matches(&straddling));
        assert!(!filter.matches(&guarded));
    }

    #[test]
    fn test_filter_presets() {
        let regions = vec![
            region(0x1000, 0x1000, 0x20, RegionType::Image),
            region(0x2000, 0x20_0000, 0x04, RegionType::Private),
            region(0x30_0000, 0x1000, 0x02, RegionType::Mapped),
        ];

        let code = RegionFilter::new(presets::executable_code());
        assert_eq!(code.count(&regions), 1);

        let heap = RegionFilter::new(presets::heap_regions());
        assert_eq!(heap.apply(&regions)[0].base_address, Address::new(0x2000));

        let images = RegionFilter::new(presets::image_regions());
        assert_eq!(images.count(&regions), 1);

        let large = RegionFilter::new(presets::large_regions());
        assert_eq!(large.total_size(&regions), 0x20_0000);
    }
}
