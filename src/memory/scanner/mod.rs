//! Memory scanning over the regions of an attached process
//!
//! [`MemoryScanner`] hosts the pattern, string, regex, numeric and code
//! searches. Each one resolves its [`ScanBounds`] to a list of readable
//! spans, walks those spans in overlapping chunks and probes candidate
//! offsets inside every chunk. Chunks that cannot be read are counted and
//! skipped.

mod code;
mod numeric;
mod pattern;

pub use code::{format_address, get_alignment, FUNCTION_PROLOGS};
pub use numeric::NumericOptions;
pub use pattern::{
    bytes_to_hex_string, create_pattern, hex_string_to_bytes, parse_byte_pattern,
    parse_pattern_mask, BytePattern, PatternByte, RegexPattern, StringOptions,
};

use crate::config::{Config, CHUNK_SIZE, FLOAT_TOLERANCE, MAX_CHAIN_OFFSET, MAX_READ_SIZE, MAX_RESULTS, REGEX_WINDOW};
use crate::core::types::{Address, Matches, MemoryError, MemoryRegion, MemoryResult, ScanStats};
use crate::process::ProcessMemory;
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

/// Tunables shared by every engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanLimits {
    /// Matches collected before a scan stops and reports `truncated`
    pub max_results: usize,
    /// Bytes requested from the process per read
    pub chunk_size: usize,
    /// Overlap carried between chunks for regex scans
    pub regex_window: usize,
    /// Widest distance accepted by offset-free pointer chain discovery
    pub max_chain_offset: usize,
    /// Largest span accepted by raw reads and the differ
    pub max_read_size: usize,
    /// Default absolute tolerance for float searches
    pub float_tolerance: f64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        ScanLimits {
            max_results: MAX_RESULTS,
            chunk_size: CHUNK_SIZE,
            regex_window: REGEX_WINDOW,
            max_chain_offset: MAX_CHAIN_OFFSET,
            max_read_size: MAX_READ_SIZE,
            float_tolerance: FLOAT_TOLERANCE,
        }
    }
}

impl From<&Config> for ScanLimits {
    fn from(config: &Config) -> Self {
        ScanLimits {
            max_results: config.scanner.max_results,
            chunk_size: config.scanner.chunk_size,
            regex_window: config.scanner.regex_window,
            max_chain_offset: config.scanner.max_chain_offset,
            max_read_size: config.memory.max_read_size,
            float_tolerance: config.memory.float_tolerance,
        }
    }
}

/// Which part of the address space a scan covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScanBounds {
    /// Every committed, readable region
    #[default]
    All,
    /// Readable memory inside `[start, end)`
    Range { start: Address, end: Address },
    /// Readable memory inside the named module's image
    Module(String),
}

impl ScanBounds {
    pub fn range(start: Address, end: Address) -> Self {
        ScanBounds::Range { start, end }
    }

    pub fn module(name: impl Into<String>) -> Self {
        ScanBounds::Module(name.into())
    }
}

/// A readable `[start, end)` slice of one region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: Address,
    pub end: Address,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.as_usize() - self.start.as_usize()
    }
}

/// Fails with `ProcessNotAttached` when nothing is attached
pub(crate) fn ensure_attached<P: ProcessMemory + ?Sized>(process: &P) -> MemoryResult<()> {
    if process.is_attached() {
        Ok(())
    } else {
        Err(MemoryError::ProcessNotAttached)
    }
}

/// Resolves bounds into readable spans, keeping only regions accepted by
/// `keep`. A module that is not loaded yields no spans.
pub(crate) fn resolve_spans<P, F>(process: &P, bounds: &ScanBounds, keep: F) -> MemoryResult<Vec<Span>>
where
    P: ProcessMemory + ?Sized,
    F: Fn(&MemoryRegion) -> bool,
{
    ensure_attached(process)?;

    let (low, high) = match bounds {
        ScanBounds::All => (Address::null(), Address::new(usize::MAX)),
        ScanBounds::Range { start, end } => {
            if start >= end {
                return Err(MemoryError::InvalidAddress(format!(
                    "scan start {} is not below end {}",
                    start, end
                )));
            }
            (*start, *end)
        }
        ScanBounds::Module(name) => match process.find_module(name) {
            Some(module) => (module.base_address, module.end_address()),
            None => {
                debug!(module = %name, "module not loaded, nothing to scan");
                return Ok(Vec::new());
            }
        },
    };

    Ok(process
        .list_regions()
        .iter()
        .filter(|region| region.is_scannable() && keep(region))
        .filter_map(|region| {
            let start = region.base_address.max(low);
            let end = region.end_address().min(high);
            (start < end).then_some(Span { start, end })
        })
        .collect())
}

/// Reads every span in chunks of `chunk_size` bytes, each extended by up to
/// `overlap` bytes of the following chunk. `visit` receives the chunk base,
/// the bytes read and how many leading bytes the chunk owns; positions past
/// the owned prefix belong to the next chunk.
pub(crate) fn walk_chunks<P, F>(
    process: &P,
    spans: &[Span],
    chunk_size: usize,
    overlap: usize,
    mut visit: F,
) -> ScanStats
where
    P: ProcessMemory + ?Sized,
    F: FnMut(Address, &[u8], usize) -> ControlFlow<()>,
{
    let mut stats = ScanStats::default();
    let chunk_size = chunk_size.max(1);

    for span in spans {
        let mut cursor = span.start;
        let mut remaining = span.len();

        while remaining > 0 {
            let owned = chunk_size.min(remaining);
            let extra = overlap.min(remaining - owned);

            let data = match process.read_bytes(cursor, owned + extra) {
                Some(data) => Some(data),
                // The overlap may reach into an unreadable page; keep the
                // owned part.
                None if extra > 0 => process.read_bytes(cursor, owned),
                None => None,
            };

            match data {
                Some(data) => {
                    stats.successful_reads += 1;
                    stats.total_scanned += owned;
                    if visit(cursor, &data, owned).is_break() {
                        return stats;
                    }
                }
                None => stats.failed_reads += 1,
            }

            cursor = Address::new(cursor.as_usize() + owned);
            remaining -= owned;
        }
    }

    stats
}

/// First index `i` such that `base + i` is a multiple of `alignment`
pub(crate) fn first_aligned(base: Address, alignment: usize) -> usize {
    if alignment <= 1 {
        return 0;
    }
    (alignment - base.as_usize() % alignment) % alignment
}

/// Probes every `step`-aligned candidate of `window` bytes across `spans`,
/// collecting whatever `probe` returns until the result cap is hit
pub(crate) fn collect_matches<P, T, F>(
    process: &P,
    spans: &[Span],
    limits: &ScanLimits,
    operation: &'static str,
    window: usize,
    step: usize,
    mut probe: F,
) -> Matches<T>
where
    P: ProcessMemory + ?Sized,
    F: FnMut(Address, &[u8]) -> Option<T>,
{
    let mut found = Collector::new(limits.max_results);
    let step = step.max(1);

    let stats = walk_chunks(
        process,
        spans,
        limits.chunk_size,
        window.saturating_sub(1),
        |base, data, owned| {
            let mut i = first_aligned(base, step);
            while i < owned && i + window <= data.len() {
                if let Some(hit) = probe(Address::new(base.as_usize() + i), &data[i..i + window]) {
                    if found.push(hit).is_break() {
                        return ControlFlow::Break(());
                    }
                }
                i += step;
            }
            ControlFlow::Continue(())
        },
    );

    found.finish(operation, stats)
}

/// Accumulates matches up to a cap
pub(crate) struct Collector<T> {
    matches: Vec<T>,
    cap: usize,
    truncated: bool,
}

impl<T> Collector<T> {
    pub fn new(cap: usize) -> Self {
        Collector {
            matches: Vec::new(),
            cap,
            truncated: cap == 0,
        }
    }

    pub fn push(&mut self, item: T) -> ControlFlow<()> {
        if self.truncated {
            return ControlFlow::Break(());
        }
        self.matches.push(item);
        if self.matches.len() >= self.cap {
            self.truncated = true;
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    pub fn finish(self, operation: &'static str, mut stats: ScanStats) -> Matches<T> {
        stats.truncated = self.truncated;
        if stats.truncated {
            warn!(
                operation,
                max_results = self.cap,
                "result cap reached, scan stopped early"
            );
        }
        if stats.failed_reads > 0 {
            info!(
                operation,
                failed_reads = stats.failed_reads,
                "skipped unreadable chunks"
            );
        }
        debug!(
            operation,
            matches = self.matches.len(),
            total_scanned = stats.total_scanned,
            "scan finished"
        );
        Matches {
            matches: self.matches,
            stats,
        }
    }
}

/// Search engine for byte patterns, strings, regular expressions, numeric
/// values and code
pub struct MemoryScanner<'a, P: ProcessMemory + ?Sized> {
    process: &'a P,
    limits: ScanLimits,
}

impl<'a, P: ProcessMemory + ?Sized> MemoryScanner<'a, P> {
    /// Create a new memory scanner
    pub fn new(process: &'a P, limits: ScanLimits) -> Self {
        MemoryScanner { process, limits }
    }

    pub fn limits(&self) -> &ScanLimits {
        &self.limits
    }

    fn spans(&self, bounds: &ScanBounds) -> MemoryResult<Vec<Span>> {
        resolve_spans(self.process, bounds, |_| true)
    }
}
