//! Machine-code scanning for x86 and x64 targets

use super::{collect_matches, resolve_spans, walk_chunks, BytePattern, Collector, MemoryScanner, ScanBounds};
use crate::core::types::{Address, Matches, MemoryResult, PatternMatch, PointerWidth};
use crate::process::ProcessMemory;
use std::ops::ControlFlow;
use tracing::debug;

/// Common function entry sequences
pub const FUNCTION_PROLOGS: [&[u8]; 4] = [
    // push ebp; mov ebp, esp
    &[0x55, 0x8B, 0xEC],
    // mov [rsp+imm8], rbx
    &[0x48, 0x89, 0x5C, 0x24],
    // sub rsp, imm8
    &[0x48, 0x83, 0xEC],
    // push rbp; mov rbp, rsp
    &[0x55, 0x48, 0x89, 0xE5],
];

const CALL_REL32: u8 = 0xE8;
const CALL_REL32_LEN: usize = 5;
const MAX_REPORTED_ALIGNMENT: u32 = 12;

/// Largest power of two, up to 4096, that divides `address`; 0 for null
pub fn get_alignment(address: Address) -> usize {
    if address.is_null() {
        return 0;
    }
    1usize << address.as_usize().trailing_zeros().min(MAX_REPORTED_ALIGNMENT)
}

/// Upper-case hex padded to the full pointer width, e.g. `0x00401000` for a
/// 32-bit target
pub fn format_address(address: Address, width: PointerWidth, with_prefix: bool) -> String {
    let digits = width.bytes() * 2;
    if with_prefix {
        format!("0x{:0width$X}", address.as_usize(), width = digits)
    } else {
        format!("{:0width$X}", address.as_usize(), width = digits)
    }
}

impl<'a, P: ProcessMemory + ?Sized> MemoryScanner<'a, P> {
    /// Exact opcode search
    pub fn scan_for_code(
        &self,
        opcodes: &[u8],
        bounds: &ScanBounds,
    ) -> MemoryResult<Matches<PatternMatch>> {
        let pattern = BytePattern::exact(opcodes)?;
        let spans = self.spans(bounds)?;
        debug!(operation = "scanForCode", len = opcodes.len(), "scanning");
        Ok(self.run_pattern("scanForCode", &pattern, &spans))
    }

    /// Addresses where one of [`FUNCTION_PROLOGS`] starts, ascending and
    /// without duplicates
    pub fn find_function_prologs(&self, bounds: &ScanBounds) -> MemoryResult<Matches<Address>> {
        let spans = self.spans(bounds)?;
        let longest = FUNCTION_PROLOGS.iter().map(|p| p.len()).max().unwrap_or(1);
        debug!(operation = "findFunctionPrologs", spans = spans.len(), "scanning");

        let mut found = Collector::new(self.limits.max_results);
        let stats = walk_chunks(
            self.process,
            &spans,
            self.limits.chunk_size,
            longest - 1,
            |base, data, owned| {
                for i in 0..owned {
                    let tail = &data[i..];
                    if FUNCTION_PROLOGS.iter().any(|prolog| tail.starts_with(prolog))
                        && found
                            .push(Address::new(base.as_usize() + i))
                            .is_break()
                    {
                        return ControlFlow::Break(());
                    }
                }
                ControlFlow::Continue(())
            },
        );

        Ok(found.finish("findFunctionPrologs", stats))
    }

    /// Relative `call` instructions in executable memory whose destination
    /// is `target`
    pub fn find_call_instructions(
        &self,
        target: Address,
        bounds: &ScanBounds,
    ) -> MemoryResult<Matches<Address>> {
        let spans = resolve_spans(self.process, bounds, |region| region.is_executable())?;
        debug!(
            operation = "findCallInstructions",
            target = %target,
            spans = spans.len(),
            "scanning"
        );

        Ok(collect_matches(
            self.process,
            &spans,
            &self.limits,
            "findCallInstructions",
            CALL_REL32_LEN,
            1,
            |address, window| {
                if window[0] != CALL_REL32 {
                    return None;
                }
                let rel = i32::from_le_bytes([window[1], window[2], window[3], window[4]]);
                let destination = address
                    .as_usize()
                    .wrapping_add(CALL_REL32_LEN)
                    .wrapping_add_signed(rel as isize);
                (destination == target.as_usize()).then_some(address)
            },
        ))
    }

    /// True when `address` lies in committed, executable memory
    pub fn is_valid_code_address(&self, address: Address) -> bool {
        self.process
            .list_regions()
            .iter()
            .find(|region| region.contains(address))
            .map_or(false, |region| region.is_committed() && region.is_executable())
    }
}
