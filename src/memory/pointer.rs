//! Pointer discovery and pointer-chain resolution
//!
//! Cells are read at the target's native pointer width and only at
//! addresses that are multiples of that width.
//!
//! Chain discovery walks backwards from a final address. Level 0 collects
//! cells pointing at (or, without an offset list, shortly before) the final
//! address; each further level collects cells pointing at the cells found
//! one level earlier. Without offsets the search is heuristic: every cell
//! whose non-null value lies within `max_chain_offset` below a target is
//! accepted, so unrelated data that happens to look like a nearby address
//! shows up too.

use crate::core::types::{Address, Matches, MemoryError, MemoryResult, PointerResult, ScanStats};
use crate::memory::scanner::{collect_matches, ensure_attached, resolve_spans, ScanBounds, ScanLimits, Span};
use crate::process::ProcessMemory;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Pointer search engine bound to one process
pub struct PointerResolver<'a, P: ProcessMemory + ?Sized> {
    process: &'a P,
    limits: ScanLimits,
}

impl<'a, P: ProcessMemory + ?Sized> PointerResolver<'a, P> {
    pub fn new(process: &'a P, limits: ScanLimits) -> Self {
        PointerResolver { process, limits }
    }

    /// Aligned cells whose stored value equals `target`
    pub fn find_pointers_to(
        &self,
        target: Address,
        bounds: &ScanBounds,
    ) -> MemoryResult<Matches<PointerResult>> {
        let spans = resolve_spans(self.process, bounds, |_| true)?;
        debug!(operation = "findPointers", target = %target, "scanning");

        Ok(self.scan_cells("findPointers", &spans, self.limits.max_results, |value| {
            (value == target.as_usize()).then_some((value, 0))
        })
        .map(|(address, points_to, offset)| PointerResult {
            address,
            points_to,
            offset,
            depth: 0,
        }))
    }

    /// Discovers pointer chains ending at `final_address`.
    ///
    /// With `offsets`, level `k` looks for cells pointing at
    /// `previous - offsets[k]` and the walk stops after
    /// `min(max_depth, offsets.len())` levels. An empty slice is treated as no
    /// offsets.
    pub fn find_pointer_chain(
        &self,
        final_address: Address,
        max_depth: usize,
        offsets: Option<&[usize]>,
    ) -> MemoryResult<Matches<PointerResult>> {
        if max_depth == 0 {
            return Err(MemoryError::InvalidArgument(
                "max_depth must be at least 1".to_string(),
            ));
        }
        let offsets = offsets.filter(|offsets| !offsets.is_empty());
        let spans = resolve_spans(self.process, &ScanBounds::All, |_| true)?;
        let depth = offsets.map_or(max_depth, |offsets| max_depth.min(offsets.len()));
        debug!(
            operation = "findPointerChain",
            target = %final_address,
            depth,
            with_offsets = offsets.is_some(),
            "scanning"
        );

        let mut results: Vec<PointerResult> = Vec::new();
        let mut stats = ScanStats::default();
        let mut frontier = vec![final_address.as_usize()];

        for level in 0..depth {
            let remaining = self.limits.max_results.saturating_sub(results.len());
            if remaining == 0 {
                stats.truncated = true;
                break;
            }

            let found = match offsets {
                Some(offsets) => {
                    let offset = offsets[level];
                    let wanted: HashSet<usize> = frontier
                        .iter()
                        .filter_map(|address| address.checked_sub(offset))
                        .collect();
                    self.scan_cells("findPointerChain", &spans, remaining, |value| {
                        wanted.contains(&value).then_some((value, offset))
                    })
                }
                None => {
                    frontier.sort_unstable();
                    frontier.dedup();
                    let window = self.limits.max_chain_offset;
                    let targets = &frontier;
                    self.scan_cells("findPointerChain", &spans, remaining, |value| {
                        if value == 0 {
                            return None;
                        }
                        let at = targets.partition_point(|&target| target < value);
                        let target = *targets.get(at)?;
                        (target - value <= window).then_some((value, target - value))
                    })
                }
            };

            stats.total_scanned += found.stats.total_scanned;
            stats.successful_reads += found.stats.successful_reads;
            stats.failed_reads += found.stats.failed_reads;
            stats.truncated |= found.stats.truncated;

            if found.is_empty() {
                break;
            }

            frontier = found.matches.iter().map(|(address, _, _)| address.as_usize()).collect();
            results.extend(
                found
                    .matches
                    .into_iter()
                    .map(|(address, points_to, offset)| PointerResult {
                        address,
                        points_to,
                        offset,
                        depth: level,
                    }),
            );

            if stats.truncated {
                break;
            }
        }

        debug!(
            operation = "findPointerChain",
            results = results.len(),
            truncated = stats.truncated,
            "chain discovery finished"
        );
        Ok(Matches {
            matches: results,
            stats,
        })
    }

    /// Follows `offsets` forward from `base`: dereference `base`, then for
    /// each offset but the last add it and dereference again; the last
    /// offset is added without a final read.
    pub fn resolve_pointer_chain(&self, base: Address, offsets: &[usize]) -> MemoryResult<Address> {
        ensure_attached(self.process)?;

        let mut value = self.read_pointer(base, 0)?;
        let Some((last, inner)) = offsets.split_last() else {
            return Ok(value);
        };

        for (level, offset) in inner.iter().enumerate() {
            let next = Self::step(value, *offset, level)?;
            value = self.read_pointer(next, level + 1)?;
        }

        Self::step(value, *last, offsets.len() - 1)
    }

    /// Aligned cells in `[start, end)` holding zero
    pub fn find_null_pointers(&self, start: Address, end: Address) -> MemoryResult<Matches<Address>> {
        let spans = resolve_spans(self.process, &ScanBounds::range(start, end), |_| true)?;
        debug!(operation = "findNullPointers", start = %start, end = %end, "scanning");

        Ok(self
            .scan_cells("findNullPointers", &spans, self.limits.max_results, |value| {
                (value == 0).then_some((value, 0))
            })
            .map(|(address, _, _)| address))
    }

    fn step(value: Address, offset: usize, level: usize) -> MemoryResult<Address> {
        if value.is_null() {
            return Err(MemoryError::InvalidAddress(format!(
                "null pointer at chain level {}",
                level
            )));
        }
        value.checked_add(offset).ok_or_else(|| {
            MemoryError::InvalidAddress(format!(
                "{} + 0x{:X} overflows at chain level {}",
                value, offset, level
            ))
        })
    }

    fn read_pointer(&self, address: Address, level: usize) -> MemoryResult<Address> {
        let width = self.process.pointer_width();
        let bytes = self
            .process
            .read_bytes(address, width.bytes())
            .ok_or_else(|| {
                warn!(address = %address, level, "pointer dereference failed");
                MemoryError::pointer_chain_broken(level, format!("cannot read pointer at {}", address))
            })?;
        width
            .read_cell(&bytes)
            .map(Address::new)
            .ok_or_else(|| MemoryError::pointer_chain_broken(level, "short pointer read"))
    }

    /// Scans aligned pointer cells, keeping `(cell, value, offset)` for each
    /// value `accept` maps to `Some((_, offset))`
    fn scan_cells<F>(
        &self,
        operation: &'static str,
        spans: &[Span],
        cap: usize,
        accept: F,
    ) -> Matches<(Address, Address, usize)>
    where
        F: Fn(usize) -> Option<(usize, usize)>,
    {
        let width = self.process.pointer_width();
        let limits = ScanLimits {
            max_results: cap,
            ..self.limits
        };

        collect_matches(
            self.process,
            spans,
            &limits,
            operation,
            width.bytes(),
            width.bytes(),
            |address, window| {
                let value = width.read_cell(window)?;
                let (points_to, offset) = accept(value)?;
                Some((address, Address::new(points_to), offset))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ErrorCode, PointerWidth};
    use crate::process::SnapshotProcess;

    fn cells(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn limits() -> ScanLimits {
        ScanLimits {
            chunk_size: 16,
            ..ScanLimits::default()
        }
    }

    /// 32-bit image: 0x1000 -> 0x2000, 0x2008 -> 0x3000 (+0x10 = 0x3010)
    fn chain_process() -> SnapshotProcess {
        SnapshotProcess::new()
            .with_pointer_width(PointerWidth::Bits32)
            .with_segment(Address::new(0x1000), cells(&[0x2000, 0, 0, 0]), 0x04)
            .with_segment(Address::new(0x2000), cells(&[0, 0, 0x3000, 0]), 0x04)
            .with_segment(Address::new(0x3000), cells(&[0, 0, 0, 0, 0x1234, 0]), 0x04)
    }

    #[test]
    fn test_find_pointers_to() {
        let process = chain_process();
        let resolver = PointerResolver::new(&process, limits());

        let found = resolver
            .find_pointers_to(Address::new(0x3000), &ScanBounds::All)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.matches[0].address, Address::new(0x2008));
        assert_eq!(found.matches[0].points_to, Address::new(0x3000));
        assert_eq!(found.matches[0].depth, 0);
    }

    #[test]
    fn test_chain_with_offsets() {
        let process = chain_process();
        let resolver = PointerResolver::new(&process, limits());

        // 0x3010 <- [0x2008] + 0x10, 0x2008 <- [0x1000] + 0x8
        let found = resolver
            .find_pointer_chain(Address::new(0x3010), 5, Some(&[0x10, 0x8]))
            .unwrap();
        let chain: Vec<_> = found
            .matches
            .iter()
            .map(|r| (r.address, r.points_to, r.offset, r.depth))
            .collect();
        assert_eq!(
            chain,
            vec![
                (Address::new(0x2008), Address::new(0x3000), 0x10, 0),
                (Address::new(0x1000), Address::new(0x2000), 0x8, 1),
            ]
        );
    }

    #[test]
    fn test_chain_without_offsets() {
        let process = chain_process();
        let resolver = PointerResolver::new(&process, limits());

        let found = resolver
            .find_pointer_chain(Address::new(0x3010), 2, None)
            .unwrap();
        let level0: Vec<_> = found.matches.iter().filter(|r| r.depth == 0).collect();
        assert!(level0
            .iter()
            .any(|r| r.address == Address::new(0x2008) && r.offset == 0x10));
        assert!(found
            .matches
            .iter()
            .any(|r| r.depth == 1 && r.address == Address::new(0x1000) && r.offset == 0x8));
    }

    #[test]
    fn test_chain_rejects_zero_depth() {
        let process = chain_process();
        let resolver = PointerResolver::new(&process, limits());
        let err = resolver
            .find_pointer_chain(Address::new(0x3010), 0, None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSize);
    }

    #[test]
    fn test_resolve_pointer_chain() {
        let process = chain_process();
        let resolver = PointerResolver::new(&process, limits());

        let resolved = resolver
            .resolve_pointer_chain(Address::new(0x1000), &[0x8, 0x10])
            .unwrap();
        assert_eq!(resolved, Address::new(0x3010));

        let direct = resolver.resolve_pointer_chain(Address::new(0x1000), &[]).unwrap();
        assert_eq!(direct, Address::new(0x2000));
    }

    #[test]
    fn test_resolve_pointer_chain_failures() {
        let process = chain_process();
        let resolver = PointerResolver::new(&process, limits());

        // [0x2000 + 0x4] is null
        let null = resolver
            .resolve_pointer_chain(Address::new(0x1000), &[0x4, 0x0])
            .unwrap_err();
        assert_eq!(null.code(), ErrorCode::InvalidAddress);

        let unreadable = resolver
            .resolve_pointer_chain(Address::new(0x9000), &[0x4])
            .unwrap_err();
        assert_eq!(unreadable.code(), ErrorCode::ReadMemoryFailed);
    }

    #[test]
    fn test_find_null_pointers() {
        let process = chain_process();
        let resolver = PointerResolver::new(&process, limits());

        let found = resolver
            .find_null_pointers(Address::new(0x2000), Address::new(0x2010))
            .unwrap();
        assert_eq!(
            found.matches,
            vec![Address::new(0x2000), Address::new(0x2004), Address::new(0x200C)]
        );
    }
}
