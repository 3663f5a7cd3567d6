//! Region classification for an attached process
//!
//! [`RegionClassifier`] enumerates regions through the primitive layer on
//! every call, filters them by protection, commit state and module
//! membership, and answers point queries about single addresses.

pub mod filter;
pub mod protection;

pub use filter::{presets, FilterCriteria, RegionFilter};
pub use protection::ProtectionFlags;

use crate::core::types::{Address, MemoryError, MemoryRegion, MemoryRegionEx, MemoryResult, RegionState};
use crate::memory::scanner::ensure_attached;
use crate::process::ProcessMemory;
use tracing::debug;

/// Bitmask filters accepted by [`RegionClassifier::memory_regions_ex`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionListFilter {
    pub executable_only: bool,
    pub writable_only: bool,
}

/// Read-only views over the region map of an attached process
pub struct RegionClassifier<'a, P: ProcessMemory + ?Sized> {
    process: &'a P,
}

impl<'a, P: ProcessMemory + ?Sized> RegionClassifier<'a, P> {
    pub fn new(process: &'a P) -> Self {
        RegionClassifier { process }
    }

    /// Committed regions annotated with their end address and owning module
    pub fn memory_regions_ex(&self, filter: RegionListFilter) -> MemoryResult<Vec<MemoryRegionEx>> {
        ensure_attached(self.process)?;

        let regions: Vec<MemoryRegionEx> = self
            .process
            .list_regions()
            .into_iter()
            .filter(|region| region.is_committed())
            .filter(|region| !filter.executable_only || region.is_executable())
            .filter(|region| !filter.writable_only || region.is_writable())
            .map(|region| self.annotate(region))
            .collect();

        debug!(
            operation = "getMemoryRegions",
            executable_only = filter.executable_only,
            writable_only = filter.writable_only,
            count = regions.len(),
            "enumerated regions"
        );
        Ok(regions)
    }

    /// Committed regions starting inside the named module's image; `None`
    /// lists every committed region. An unknown module yields no regions.
    pub fn module_regions(&self, name: Option<&str>) -> MemoryResult<Vec<MemoryRegionEx>> {
        let all = self.memory_regions_ex(RegionListFilter::default())?;
        let Some(name) = name else {
            return Ok(all);
        };

        match self.process.find_module(name) {
            Some(module) => Ok(all
                .into_iter()
                .filter(|entry| module.contains_address(entry.region.base_address))
                .collect()),
            None => {
                debug!(module = name, "module not loaded");
                Ok(Vec::new())
            }
        }
    }

    /// Region containing `address`; free memory and unmapped gaps are
    /// `InvalidAddress`
    pub fn region_info(&self, address: Address) -> MemoryResult<MemoryRegionEx> {
        ensure_attached(self.process)?;

        let region = self
            .region_at(address)
            .filter(|region| region.state != RegionState::Free)
            .ok_or_else(|| {
                MemoryError::InvalidAddress(format!("{} is not inside a mapped region", address))
            })?;

        debug!(
            address = %address,
            base = %region.base_address,
            protection = %ProtectionFlags::from(&region),
            "region lookup"
        );
        Ok(self.annotate(region))
    }

    pub fn executable_regions(&self) -> MemoryResult<Vec<MemoryRegion>> {
        self.committed_where(MemoryRegion::is_executable)
    }

    pub fn writable_regions(&self) -> MemoryResult<Vec<MemoryRegion>> {
        self.committed_where(MemoryRegion::is_writable)
    }

    pub fn committed_regions(&self) -> MemoryResult<Vec<MemoryRegion>> {
        self.committed_where(|_| true)
    }

    /// Regions accepted by an arbitrary [`RegionFilter`]
    pub fn filtered_regions(&self, criteria: FilterCriteria) -> MemoryResult<Vec<MemoryRegion>> {
        ensure_attached(self.process)?;
        let filter = RegionFilter::new(criteria);
        Ok(filter.apply(&self.process.list_regions()))
    }

    /// Committed, not a guard page and not `PAGE_NOACCESS`
    pub fn is_valid_address(&self, address: Address) -> bool {
        self.region_at(address).map_or(false, |region| {
            region.is_committed()
                && !region.is_guarded()
                && region.protection & ProtectionFlags::PAGE_NOACCESS == 0
        })
    }

    pub fn is_executable_address(&self, address: Address) -> bool {
        self.region_at(address)
            .map_or(false, |region| region.is_committed() && region.is_executable())
    }

    pub fn is_writable_address(&self, address: Address) -> bool {
        self.region_at(address)
            .map_or(false, |region| region.is_committed() && region.is_writable())
    }

    fn region_at(&self, address: Address) -> Option<MemoryRegion> {
        self.process
            .list_regions()
            .into_iter()
            .find(|region| region.contains(address))
    }

    fn committed_where<F>(&self, keep: F) -> MemoryResult<Vec<MemoryRegion>>
    where
        F: Fn(&MemoryRegion) -> bool,
    {
        ensure_attached(self.process)?;
        Ok(self
            .process
            .list_regions()
            .into_iter()
            .filter(|region| region.is_committed() && keep(region))
            .collect())
    }

    fn annotate(&self, region: MemoryRegion) -> MemoryRegionEx {
        let module_name = self
            .process
            .module_at(region.base_address)
            .map(|module| module.name);
        MemoryRegionEx::new(region, module_name)
    }
}
