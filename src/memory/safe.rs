//! Result-envelope boundary over every engine
//!
//! [`SafeOperations`] owns one primitive-layer backend and exposes each
//! engine operation as a method returning [`SafeOperationResult`]. Every
//! call clears the last-error slot, refuses to run without an attached
//! process, runs the engine and, on failure, records a classified
//! [`MemoryOperationError`] tagged with the operation name.

use crate::config::Config;
use crate::core::types::{
    Address, DataType, Matches, MemoryError, MemoryOperationError, MemoryRegion, MemoryRegionEx,
    MemoryResult, NumericMatch, NumericValue, PatternMatch, PointerResult, SafeOperationResult,
    ScanResult,
};
use crate::memory::diff::{ChangedBytes, MemoryDiff, MemoryDiffer, MemorySnapshot};
use crate::memory::pointer::PointerResolver;
use crate::memory::regions::{FilterCriteria, RegionClassifier, RegionListFilter};
use crate::memory::scanner::{
    ensure_attached, BytePattern, MemoryScanner, NumericOptions, ScanBounds, ScanLimits,
    StringOptions,
};
use crate::process::ProcessMemory;
use tracing::{trace, warn};

/// Safe front for one attached process
pub struct SafeOperations<P: ProcessMemory> {
    process: P,
    limits: ScanLimits,
    last_error: Option<MemoryOperationError>,
}

impl<P: ProcessMemory> SafeOperations<P> {
    pub fn new(process: P, limits: ScanLimits) -> Self {
        SafeOperations {
            process,
            limits,
            last_error: None,
        }
    }

    pub fn with_config(process: P, config: &Config) -> Self {
        SafeOperations::new(process, ScanLimits::from(config))
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    /// Mutable access for attach/detach on the backend
    pub fn process_mut(&mut self) -> &mut P {
        &mut self.process
    }

    pub fn into_process(self) -> P {
        self.process
    }

    pub fn limits(&self) -> &ScanLimits {
        &self.limits
    }

    /// Error recorded by the most recent call, if it failed
    pub fn last_error(&self) -> Option<&MemoryOperationError> {
        self.last_error.as_ref()
    }

    fn run<T, F>(&mut self, operation: &'static str, f: F) -> SafeOperationResult<T>
    where
        F: FnOnce(&P, ScanLimits) -> MemoryResult<T>,
    {
        self.last_error = None;
        trace!(operation, "begin");

        let result = ensure_attached(&self.process).and_then(|()| f(&self.process, self.limits));
        match result {
            Ok(data) => SafeOperationResult::Success(data),
            Err(err) => {
                let record = MemoryOperationError::new(operation, &err);
                warn!(
                    operation,
                    code = %record.error_code,
                    native_code = ?record.native_error_code,
                    error = %err,
                    "operation failed"
                );
                self.last_error = Some(record.clone());
                SafeOperationResult::Failure(record)
            }
        }
    }

    // Raw access

    pub fn read_memory(&mut self, address: Address, size: usize) -> SafeOperationResult<Vec<u8>> {
        self.run("readMemory", |process, limits| read_checked(process, &limits, address, size))
    }

    pub fn write_memory(&mut self, address: Address, data: &[u8]) -> SafeOperationResult<()> {
        self.run("writeMemory", |process, limits| write_checked(process, &limits, address, data))
    }

    // Typed access

    /// Reads one little-endian value of `data_type`
    pub fn read_value(&mut self, address: Address, data_type: DataType) -> SafeOperationResult<NumericValue> {
        self.run("readValue", |process, limits| {
            let bytes = read_checked(process, &limits, address, data_type.size())?;
            NumericValue::decode(&bytes, data_type).ok_or_else(|| {
                MemoryError::read_failed(address, format!("short read for {}", data_type))
            })
        })
    }

    pub fn write_value(&mut self, address: Address, value: NumericValue) -> SafeOperationResult<()> {
        self.run("writeValue", |process, limits| {
            write_checked(process, &limits, address, &value.to_le_bytes())
        })
    }

    /// Reads `length` bytes as UTF-8, cut at the first NUL. Invalid
    /// sequences are replaced.
    pub fn read_string(&mut self, address: Address, length: usize) -> SafeOperationResult<String> {
        self.run("readString", |process, limits| {
            let bytes = read_checked(process, &limits, address, length)?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
        })
    }

    /// Reads `length` UTF-16LE code units, cut at the first NUL unit
    pub fn read_wide_string(&mut self, address: Address, length: usize) -> SafeOperationResult<String> {
        self.run("readWideString", |process, limits| {
            let size = length.checked_mul(2).ok_or_else(|| {
                MemoryError::InvalidSize(format!("{} wide characters overflow", length))
            })?;
            let bytes = read_checked(process, &limits, address, size)?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .take_while(|&unit| unit != 0)
                .collect();
            Ok(String::from_utf16_lossy(&units))
        })
    }

    /// Writes `text` as UTF-8 followed by a NUL terminator
    pub fn write_string(&mut self, address: Address, text: &str) -> SafeOperationResult<()> {
        self.run("writeString", |process, limits| {
            let mut bytes = text.as_bytes().to_vec();
            bytes.push(0);
            write_checked(process, &limits, address, &bytes)
        })
    }

    /// Writes `text` as UTF-16LE followed by a NUL unit
    pub fn write_wide_string(&mut self, address: Address, text: &str) -> SafeOperationResult<()> {
        self.run("writeWideString", |process, limits| {
            let bytes: Vec<u8> = text
                .encode_utf16()
                .chain(std::iter::once(0))
                .flat_map(u16::to_le_bytes)
                .collect();
            write_checked(process, &limits, address, &bytes)
        })
    }

    // Pattern engine

    pub fn search_byte_pattern(
        &mut self,
        pattern: &BytePattern,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<Matches<PatternMatch>> {
        self.run("searchBytePattern", |process, limits| {
            MemoryScanner::new(process, limits).search_byte_pattern(pattern, bounds)
        })
    }

    /// Textual pattern such as `"48 8B ?? ?? 89"`
    pub fn search_byte_pattern_str(
        &mut self,
        pattern: &str,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<Matches<PatternMatch>> {
        self.run("searchBytePattern", |process, limits| {
            MemoryScanner::new(process, limits).search_byte_pattern_str(pattern, bounds)
        })
    }

    pub fn search_string(
        &mut self,
        text: &str,
        options: &StringOptions,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<Matches<PatternMatch>> {
        self.run("searchStringPattern", |process, limits| {
            MemoryScanner::new(process, limits).search_string(text, options, bounds)
        })
    }

    pub fn search_regex(
        &mut self,
        source: &str,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<Matches<PatternMatch>> {
        self.run("searchRegexPattern", |process, limits| {
            MemoryScanner::new(process, limits).search_regex(source, bounds)
        })
    }

    pub fn scan_for_pattern(
        &mut self,
        pattern: &str,
        mask: &str,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<ScanResult> {
        self.run("scanForPattern", |process, limits| {
            MemoryScanner::new(process, limits).scan_for_pattern(pattern, mask, bounds)
        })
    }

    pub fn scan_for_bytes(&mut self, bytes: &[u8], bounds: &ScanBounds) -> SafeOperationResult<ScanResult> {
        self.run("scanForBytes", |process, limits| {
            MemoryScanner::new(process, limits).scan_for_bytes(bytes, bounds)
        })
    }

    pub fn scan_for_string(
        &mut self,
        text: &str,
        case_sensitive: bool,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<ScanResult> {
        self.run("scanForString", |process, limits| {
            MemoryScanner::new(process, limits).scan_for_string(text, case_sensitive, bounds)
        })
    }

    pub fn scan_for_value(
        &mut self,
        value: &serde_json::Value,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<ScanResult> {
        self.run("scanForValue", |process, limits| {
            MemoryScanner::new(process, limits).scan_for_value(value, bounds)
        })
    }

    // Numeric engine

    pub fn search_i32(&mut self, value: i32, options: &NumericOptions) -> SafeOperationResult<Matches<NumericMatch>> {
        self.run("searchInt32", |process, limits| {
            MemoryScanner::new(process, limits).search_i32(value, options)
        })
    }

    pub fn search_i64(&mut self, value: i64, options: &NumericOptions) -> SafeOperationResult<Matches<NumericMatch>> {
        self.run("searchInt64", |process, limits| {
            MemoryScanner::new(process, limits).search_i64(value, options)
        })
    }

    pub fn search_f32(&mut self, value: f32, options: &NumericOptions) -> SafeOperationResult<Matches<NumericMatch>> {
        self.run("searchFloat", |process, limits| {
            MemoryScanner::new(process, limits).search_f32(value, options)
        })
    }

    pub fn search_f64(&mut self, value: f64, options: &NumericOptions) -> SafeOperationResult<Matches<NumericMatch>> {
        self.run("searchDouble", |process, limits| {
            MemoryScanner::new(process, limits).search_f64(value, options)
        })
    }

    pub fn search_value(
        &mut self,
        value: NumericValue,
        options: &NumericOptions,
    ) -> SafeOperationResult<Matches<NumericMatch>> {
        self.run("searchForValue", |process, limits| {
            MemoryScanner::new(process, limits).search_value(value, options)
        })
    }

    /// JSON dispatch: numbers are classified by [`NumericValue::try_from`],
    /// anything else fails with `InvalidSize`
    pub fn search_for_value(
        &mut self,
        value: &serde_json::Value,
        options: &NumericOptions,
    ) -> SafeOperationResult<Matches<NumericMatch>> {
        self.run("searchForValue", |process, limits| {
            MemoryScanner::new(process, limits).search_json_value(value, options)
        })
    }

    // Pointer resolver

    pub fn find_pointers_to(
        &mut self,
        target: Address,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<Matches<PointerResult>> {
        self.run("findPointers", |process, limits| {
            PointerResolver::new(process, limits).find_pointers_to(target, bounds)
        })
    }

    pub fn find_pointer_chain(
        &mut self,
        final_address: Address,
        max_depth: usize,
        offsets: Option<&[usize]>,
    ) -> SafeOperationResult<Matches<PointerResult>> {
        self.run("findPointerChain", |process, limits| {
            PointerResolver::new(process, limits).find_pointer_chain(final_address, max_depth, offsets)
        })
    }

    pub fn resolve_pointer_chain(&mut self, base: Address, offsets: &[usize]) -> SafeOperationResult<Address> {
        self.run("resolvePointerChain", |process, limits| {
            PointerResolver::new(process, limits).resolve_pointer_chain(base, offsets)
        })
    }

    pub fn find_null_pointers(&mut self, start: Address, end: Address) -> SafeOperationResult<Matches<Address>> {
        self.run("findNullPointers", |process, limits| {
            PointerResolver::new(process, limits).find_null_pointers(start, end)
        })
    }

    // Region classifier

    pub fn memory_regions_ex(&mut self, filter: RegionListFilter) -> SafeOperationResult<Vec<MemoryRegionEx>> {
        self.run("getMemoryRegions", |process, _| {
            RegionClassifier::new(process).memory_regions_ex(filter)
        })
    }

    pub fn module_regions(&mut self, name: Option<&str>) -> SafeOperationResult<Vec<MemoryRegionEx>> {
        self.run("getModuleRegions", |process, _| {
            RegionClassifier::new(process).module_regions(name)
        })
    }

    pub fn region_info(&mut self, address: Address) -> SafeOperationResult<MemoryRegionEx> {
        self.run("getRegionInfo", |process, _| RegionClassifier::new(process).region_info(address))
    }

    pub fn executable_regions(&mut self) -> SafeOperationResult<Vec<MemoryRegion>> {
        self.run("getExecutableRegions", |process, _| {
            RegionClassifier::new(process).executable_regions()
        })
    }

    pub fn writable_regions(&mut self) -> SafeOperationResult<Vec<MemoryRegion>> {
        self.run("getWritableRegions", |process, _| {
            RegionClassifier::new(process).writable_regions()
        })
    }

    pub fn committed_regions(&mut self) -> SafeOperationResult<Vec<MemoryRegion>> {
        self.run("getCommittedRegions", |process, _| {
            RegionClassifier::new(process).committed_regions()
        })
    }

    pub fn filtered_regions(&mut self, criteria: FilterCriteria) -> SafeOperationResult<Vec<MemoryRegion>> {
        self.run("getFilteredRegions", |process, _| {
            RegionClassifier::new(process).filtered_regions(criteria)
        })
    }

    pub fn is_valid_address(&mut self, address: Address) -> SafeOperationResult<bool> {
        self.run("isValidAddress", |process, _| {
            Ok(RegionClassifier::new(process).is_valid_address(address))
        })
    }

    pub fn is_executable_address(&mut self, address: Address) -> SafeOperationResult<bool> {
        self.run("isExecutableAddress", |process, _| {
            Ok(RegionClassifier::new(process).is_executable_address(address))
        })
    }

    pub fn is_writable_address(&mut self, address: Address) -> SafeOperationResult<bool> {
        self.run("isWritableAddress", |process, _| {
            Ok(RegionClassifier::new(process).is_writable_address(address))
        })
    }

    // Differ

    pub fn compare_memory_regions(
        &mut self,
        first: Address,
        second: Address,
        size: usize,
    ) -> SafeOperationResult<MemoryDiff> {
        self.run("compareMemoryRegions", |process, limits| {
            MemoryDiffer::new(process, limits).compare_memory_regions(first, second, size)
        })
    }

    pub fn find_changed_bytes(&mut self, address: Address, original: &[u8]) -> SafeOperationResult<ChangedBytes> {
        self.run("findChangedBytes", |process, limits| {
            MemoryDiffer::new(process, limits).find_changed_bytes(address, original)
        })
    }

    pub fn capture(&mut self, address: Address, size: usize) -> SafeOperationResult<MemorySnapshot> {
        self.run("captureSnapshot", |process, limits| {
            MemoryDiffer::new(process, limits).capture(address, size)
        })
    }

    pub fn changed_since(&mut self, snapshot: &MemorySnapshot) -> SafeOperationResult<ChangedBytes> {
        self.run("findChangedBytes", |process, limits| {
            MemoryDiffer::new(process, limits).changed_since(snapshot)
        })
    }

    // Code scanner

    pub fn scan_for_code(&mut self, opcodes: &[u8], bounds: &ScanBounds) -> SafeOperationResult<Matches<PatternMatch>> {
        self.run("scanForCode", |process, limits| {
            MemoryScanner::new(process, limits).scan_for_code(opcodes, bounds)
        })
    }

    pub fn find_function_prologs(&mut self, bounds: &ScanBounds) -> SafeOperationResult<Matches<Address>> {
        self.run("findFunctionPrologs", |process, limits| {
            MemoryScanner::new(process, limits).find_function_prologs(bounds)
        })
    }

    pub fn find_call_instructions(
        &mut self,
        target: Address,
        bounds: &ScanBounds,
    ) -> SafeOperationResult<Matches<Address>> {
        self.run("findCallInstructions", |process, limits| {
            MemoryScanner::new(process, limits).find_call_instructions(target, bounds)
        })
    }

    pub fn is_valid_code_address(&mut self, address: Address) -> SafeOperationResult<bool> {
        self.run("isValidCodeAddress", |process, limits| {
            Ok(MemoryScanner::new(process, limits).is_valid_code_address(address))
        })
    }
}

fn read_checked<P: ProcessMemory>(
    process: &P,
    limits: &ScanLimits,
    address: Address,
    size: usize,
) -> MemoryResult<Vec<u8>> {
    if size == 0 {
        return Err(MemoryError::InvalidSize("Size cannot be zero".to_string()));
    }
    if size > limits.max_read_size {
        return Err(MemoryError::InvalidSize(format!(
            "Read size {} exceeds maximum {}",
            size, limits.max_read_size
        )));
    }
    process
        .read_bytes(address, size)
        .ok_or_else(|| MemoryError::read_failed(address, format!("cannot read {} bytes", size)))
}

fn write_checked<P: ProcessMemory>(
    process: &P,
    limits: &ScanLimits,
    address: Address,
    data: &[u8],
) -> MemoryResult<()> {
    if data.is_empty() {
        return Err(MemoryError::InvalidSize("Size cannot be zero".to_string()));
    }
    if data.len() > limits.max_read_size {
        return Err(MemoryError::InvalidSize(format!(
            "Write size {} exceeds maximum {}",
            data.len(),
            limits.max_read_size
        )));
    }
    if process.write_bytes(address, data) {
        Ok(())
    } else {
        Err(MemoryError::write_failed(
            address,
            format!("cannot write {} bytes", data.len()),
        ))
    }
}
