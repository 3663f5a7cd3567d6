//! Byte, string and regular-expression patterns

use super::{collect_matches, walk_chunks, Collector, MemoryScanner, ScanBounds};
use crate::core::types::{
    Address, Matches, MemoryError, MemoryResult, NumericValue, PatternMatch, ScanResult,
};
use crate::process::ProcessMemory;
use regex::bytes::{Regex, RegexBuilder};
use std::ops::ControlFlow;
use tracing::debug;

/// One position of a compiled pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternByte {
    /// Must equal this byte
    Exact(u8),
    /// Must equal this byte after ASCII lower-casing
    AnyCase(u8),
    /// Matches any byte
    Any,
}

impl PatternByte {
    #[inline]
    pub fn matches(&self, byte: u8) -> bool {
        match *self {
            PatternByte::Exact(expected) => byte == expected,
            PatternByte::AnyCase(expected) => byte.to_ascii_lowercase() == expected,
            PatternByte::Any => true,
        }
    }
}

/// A compiled byte pattern with optional wildcard positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytePattern {
    bytes: Vec<PatternByte>,
    alignment: usize,
}

impl BytePattern {
    /// Builds a pattern from bytes and a parallel mask; `false` positions
    /// match any byte
    pub fn new(bytes: &[u8], mask: &[bool]) -> MemoryResult<Self> {
        if bytes.len() != mask.len() {
            return Err(MemoryError::InvalidPattern(format!(
                "pattern has {} bytes but mask has {} entries",
                bytes.len(),
                mask.len()
            )));
        }
        Self::from_parts(
            bytes
                .iter()
                .zip(mask)
                .map(|(&byte, &check)| {
                    if check {
                        PatternByte::Exact(byte)
                    } else {
                        PatternByte::Any
                    }
                })
                .collect(),
        )
    }

    /// Pattern where every byte must match
    pub fn exact(bytes: &[u8]) -> MemoryResult<Self> {
        Self::from_parts(bytes.iter().copied().map(PatternByte::Exact).collect())
    }

    /// Parses the textual form, e.g. `"48 8B ?? ?? 89"`
    pub fn from_hex_string(pattern: &str) -> MemoryResult<Self> {
        let bytes = parse_byte_pattern(pattern)?;
        let mask = parse_pattern_mask(pattern)?;
        Self::new(&bytes, &mask)
    }

    /// Parses a hex pattern paired with an `x`/`?` mask string, e.g.
    /// `"4D 5A 00"` with `"xx?"`
    pub fn with_mask_string(pattern: &str, mask: &str) -> MemoryResult<Self> {
        let bytes = parse_byte_pattern(pattern)?;
        let mask = mask
            .chars()
            .map(|c| match c {
                'x' | 'X' => Ok(true),
                '?' => Ok(false),
                other => Err(MemoryError::InvalidPattern(format!(
                    "invalid mask character '{}'",
                    other
                ))),
            })
            .collect::<MemoryResult<Vec<_>>>()?;
        Self::new(&bytes, &mask)
    }

    /// Encodes text as a pattern
    pub fn string(text: &str, options: &StringOptions) -> MemoryResult<Self> {
        if text.is_empty() {
            return Err(MemoryError::InvalidPattern("empty search string".to_string()));
        }

        let mut encoded: Vec<u8> = if options.wide {
            text.encode_utf16().flat_map(u16::to_le_bytes).collect()
        } else {
            text.as_bytes().to_vec()
        };
        if options.null_terminated {
            encoded.extend(std::iter::repeat(0).take(if options.wide { 2 } else { 1 }));
        }

        let parts = encoded
            .into_iter()
            .map(|byte| {
                if !options.case_sensitive && byte.is_ascii_alphabetic() {
                    PatternByte::AnyCase(byte.to_ascii_lowercase())
                } else {
                    PatternByte::Exact(byte)
                }
            })
            .collect();

        let pattern = Self::from_parts(parts)?;
        Ok(if options.wide {
            pattern.with_alignment(2)
        } else {
            pattern
        })
    }

    fn from_parts(bytes: Vec<PatternByte>) -> MemoryResult<Self> {
        if bytes.is_empty() {
            return Err(MemoryError::InvalidPattern("Empty pattern".to_string()));
        }
        Ok(BytePattern {
            bytes,
            alignment: 1,
        })
    }

    /// Restricts candidate addresses to multiples of `alignment`
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn parts(&self) -> &[PatternByte] {
        &self.bytes
    }

    /// Checks the pattern against the start of `data`
    pub fn matches_at(&self, data: &[u8]) -> bool {
        data.len() >= self.bytes.len()
            && self
                .bytes
                .iter()
                .zip(data)
                .all(|(part, &byte)| part.matches(byte))
    }
}

/// How text is encoded for a string search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringOptions {
    pub case_sensitive: bool,
    /// UTF-16LE instead of UTF-8
    pub wide: bool,
    /// Require the terminating NUL
    pub null_terminated: bool,
}

impl Default for StringOptions {
    fn default() -> Self {
        StringOptions {
            case_sensitive: true,
            wide: false,
            null_terminated: false,
        }
    }
}

/// A regular expression matched against raw bytes
#[derive(Debug, Clone)]
pub struct RegexPattern {
    regex: Regex,
}

impl RegexPattern {
    /// Compiles `source` with Unicode mode off so `.` and `\xNN` operate on
    /// single bytes
    pub fn new(source: &str) -> MemoryResult<Self> {
        let regex = RegexBuilder::new(source)
            .unicode(false)
            .build()
            .map_err(|e| MemoryError::InvalidPattern(format!("invalid regex: {}", e)))?;
        Ok(RegexPattern { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Parses hex tokens, treating `?` and `??` as wildcards that decode to 0
pub fn parse_byte_pattern(pattern: &str) -> MemoryResult<Vec<u8>> {
    let tokens: Vec<&str> = pattern.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(MemoryError::InvalidPattern("Empty pattern".to_string()));
    }

    tokens
        .into_iter()
        .map(|token| match token {
            "?" | "??" => Ok(0),
            hex if hex.len() == 2 => u8::from_str_radix(hex, 16)
                .map_err(|_| MemoryError::InvalidPattern(format!("Invalid hex: {}", hex))),
            other => Err(MemoryError::InvalidPattern(format!(
                "Invalid hex byte '{}': must be 2 digits",
                other
            ))),
        })
        .collect()
}

/// Mask for a textual pattern: `false` at `?`/`??` tokens
pub fn parse_pattern_mask(pattern: &str) -> MemoryResult<Vec<bool>> {
    let mask: Vec<bool> = pattern
        .split_whitespace()
        .map(|token| !matches!(token, "?" | "??"))
        .collect();
    if mask.is_empty() {
        return Err(MemoryError::InvalidPattern("Empty pattern".to_string()));
    }
    Ok(mask)
}

/// `[0x4D, 0x5A]` becomes `"4D 5A"`
pub fn bytes_to_hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decodes hex text, ignoring whitespace between digits
pub fn hex_string_to_bytes(text: &str) -> MemoryResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|e| MemoryError::InvalidPattern(format!("{}: {}", text, e)))
}

/// Builds the textual pattern and `x`/`?` mask for `bytes`, marking
/// positions flagged in `wildcards` as `??`
pub fn create_pattern(bytes: &[u8], wildcards: &[bool]) -> (String, String) {
    let mut tokens = Vec::with_capacity(bytes.len());
    let mut mask = String::with_capacity(bytes.len());

    for (i, byte) in bytes.iter().enumerate() {
        if wildcards.get(i).copied().unwrap_or(false) {
            tokens.push("??".to_string());
            mask.push('?');
        } else {
            tokens.push(hex::encode_upper([*byte]));
            mask.push('x');
        }
    }

    (tokens.join(" "), mask)
}

impl<'a, P: ProcessMemory + ?Sized> MemoryScanner<'a, P> {
    /// Finds every location matching `pattern`
    pub fn search_byte_pattern(
        &self,
        pattern: &BytePattern,
        bounds: &ScanBounds,
    ) -> MemoryResult<Matches<PatternMatch>> {
        let spans = self.spans(bounds)?;
        debug!(
            operation = "searchBytePattern",
            len = pattern.len(),
            spans = spans.len(),
            "scanning"
        );
        Ok(self.run_pattern("searchBytePattern", pattern, &spans))
    }

    /// Parses a textual pattern such as `"48 8B ?? ?? 89"` and searches it
    pub fn search_byte_pattern_str(
        &self,
        pattern: &str,
        bounds: &ScanBounds,
    ) -> MemoryResult<Matches<PatternMatch>> {
        let pattern = BytePattern::from_hex_string(pattern)?;
        self.search_byte_pattern(&pattern, bounds)
    }

    /// Finds every occurrence of `text`
    pub fn search_string(
        &self,
        text: &str,
        options: &StringOptions,
        bounds: &ScanBounds,
    ) -> MemoryResult<Matches<PatternMatch>> {
        let pattern = BytePattern::string(text, options)?;
        let spans = self.spans(bounds)?;
        debug!(
            operation = "searchStringPattern",
            len = pattern.len(),
            wide = options.wide,
            case_sensitive = options.case_sensitive,
            "scanning"
        );
        Ok(self.run_pattern("searchStringPattern", &pattern, &spans))
    }

    /// Finds non-empty, non-overlapping regex matches. Chunks overlap by the
    /// configured regex window, so a match longer than the window may be cut
    /// at a chunk boundary. A chunk resumes after the last match reported by
    /// the chunk before it.
    pub fn search_regex(
        &self,
        source: &str,
        bounds: &ScanBounds,
    ) -> MemoryResult<Matches<PatternMatch>> {
        let pattern = RegexPattern::new(source)?;
        let spans = self.spans(bounds)?;
        debug!(operation = "searchRegexPattern", regex = source, "scanning");

        let mut found = Collector::new(self.limits.max_results);
        // Where the next chunk continues its span, and the absolute end of
        // the last match reported in that span
        let mut next_base = None;
        let mut covered = 0usize;
        let stats = walk_chunks(
            self.process,
            &spans,
            self.limits.chunk_size,
            self.limits.regex_window,
            |base, data, owned| {
                if next_base != Some(base.as_usize()) {
                    covered = base.as_usize();
                }
                next_base = Some(base.as_usize() + owned);

                let mut at = covered.saturating_sub(base.as_usize()).min(data.len());
                while let Some(hit) = pattern.regex.find_at(data, at) {
                    if hit.start() >= owned {
                        break;
                    }
                    if hit.is_empty() {
                        at = hit.end() + 1;
                        if at > data.len() {
                            break;
                        }
                        continue;
                    }
                    at = hit.end();
                    covered = base.as_usize() + hit.end();
                    let record = PatternMatch {
                        address: Address::new(base.as_usize() + hit.start()),
                        size: hit.len(),
                        data: hit.as_bytes().to_vec(),
                    };
                    if found.push(record).is_break() {
                        return ControlFlow::Break(());
                    }
                }
                ControlFlow::Continue(())
            },
        );

        Ok(found.finish("searchRegexPattern", stats))
    }

    /// Hex pattern plus `x`/`?` mask, reported as addresses
    pub fn scan_for_pattern(
        &self,
        pattern: &str,
        mask: &str,
        bounds: &ScanBounds,
    ) -> MemoryResult<ScanResult> {
        let pattern = BytePattern::with_mask_string(pattern, mask)?;
        self.search_byte_pattern(&pattern, bounds).map(ScanResult::from)
    }

    /// Exact byte sequence, reported as addresses
    pub fn scan_for_bytes(&self, bytes: &[u8], bounds: &ScanBounds) -> MemoryResult<ScanResult> {
        let pattern = BytePattern::exact(bytes)?;
        self.search_byte_pattern(&pattern, bounds).map(ScanResult::from)
    }

    /// Single-byte text, reported as addresses
    pub fn scan_for_string(
        &self,
        text: &str,
        case_sensitive: bool,
        bounds: &ScanBounds,
    ) -> MemoryResult<ScanResult> {
        let options = StringOptions {
            case_sensitive,
            ..StringOptions::default()
        };
        self.search_string(text, &options, bounds).map(ScanResult::from)
    }

    /// Text is searched as a case-sensitive string, numbers as their
    /// little-endian encoding (see [`NumericValue::try_from`])
    pub fn scan_for_value(
        &self,
        value: &serde_json::Value,
        bounds: &ScanBounds,
    ) -> MemoryResult<ScanResult> {
        match value {
            serde_json::Value::String(text) => self.scan_for_string(text, true, bounds),
            other => {
                let value = NumericValue::try_from(other)?;
                self.scan_for_bytes(&value.to_le_bytes(), bounds)
            }
        }
    }

    pub(crate) fn run_pattern(
        &self,
        operation: &'static str,
        pattern: &BytePattern,
        spans: &[super::Span],
    ) -> Matches<PatternMatch> {
        collect_matches(
            self.process,
            spans,
            &self.limits,
            operation,
            pattern.len(),
            pattern.alignment(),
            |address, window| {
                pattern.matches_at(window).then(|| PatternMatch {
                    address,
                    size: window.len(),
                    data: window.to_vec(),
                })
            },
        )
    }
}
