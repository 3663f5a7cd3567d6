//! Integer and floating-point value searches

use super::{collect_matches, MemoryScanner, ScanBounds};
use crate::core::types::{DataType, Matches, MemoryError, MemoryResult, NumericMatch, NumericValue};
use crate::process::ProcessMemory;
use tracing::debug;

/// Options shared by the numeric searches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericOptions {
    pub bounds: ScanBounds,
    /// Only consider naturally aligned addresses. Float searches are always
    /// aligned.
    pub aligned: bool,
    /// Absolute tolerance for float searches; `None` uses the configured
    /// default
    pub tolerance: Option<f64>,
}

impl NumericOptions {
    pub fn aligned() -> Self {
        NumericOptions {
            aligned: true,
            ..NumericOptions::default()
        }
    }

    pub fn with_bounds(mut self, bounds: ScanBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
}

fn within_tolerance(stored: f64, target: f64, tolerance: f64) -> bool {
    stored == target || (stored - target).abs() <= tolerance
}

impl<'a, P: ProcessMemory + ?Sized> MemoryScanner<'a, P> {
    pub fn search_i32(
        &self,
        value: i32,
        options: &NumericOptions,
    ) -> MemoryResult<Matches<NumericMatch>> {
        let target = value.to_le_bytes();
        self.search_exact(DataType::Int32, &target, options)
    }

    pub fn search_i64(
        &self,
        value: i64,
        options: &NumericOptions,
    ) -> MemoryResult<Matches<NumericMatch>> {
        let target = value.to_le_bytes();
        self.search_exact(DataType::Int64, &target, options)
    }

    /// Stored floats within the tolerance of `value`; NaN only ever matches
    /// by bit-identical equality, which `==` rules out
    pub fn search_f32(
        &self,
        value: f32,
        options: &NumericOptions,
    ) -> MemoryResult<Matches<NumericMatch>> {
        let tolerance = self.tolerance(options)?;
        let target = f64::from(value);
        self.search_float(DataType::Float, options, |bytes| {
            let stored = f32::from_le_bytes(bytes.try_into().ok()?);
            Some(within_tolerance(f64::from(stored), target, tolerance))
        })
    }

    pub fn search_f64(
        &self,
        value: f64,
        options: &NumericOptions,
    ) -> MemoryResult<Matches<NumericMatch>> {
        let tolerance = self.tolerance(options)?;
        self.search_float(DataType::Double, options, |bytes| {
            let stored = f64::from_le_bytes(bytes.try_into().ok()?);
            Some(within_tolerance(stored, value, tolerance))
        })
    }

    /// Routes a typed value to the matching search
    pub fn search_value(
        &self,
        value: NumericValue,
        options: &NumericOptions,
    ) -> MemoryResult<Matches<NumericMatch>> {
        match value {
            NumericValue::I32(v) => self.search_i32(v, options),
            NumericValue::I64(v) => self.search_i64(v, options),
            NumericValue::F32(v) => self.search_f32(v, options),
            NumericValue::F64(v) => self.search_f64(v, options),
        }
    }

    /// Classifies a JSON number (see [`NumericValue::try_from`]) and searches
    /// for it. Anything but a number fails before scanning.
    pub fn search_json_value(
        &self,
        value: &serde_json::Value,
        options: &NumericOptions,
    ) -> MemoryResult<Matches<NumericMatch>> {
        let value = NumericValue::try_from(value)?;
        self.search_value(value, options)
    }

    fn tolerance(&self, options: &NumericOptions) -> MemoryResult<f64> {
        let tolerance = options.tolerance.unwrap_or(self.limits.float_tolerance);
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(MemoryError::InvalidArgument(format!(
                "tolerance must be a finite, non-negative number, got {}",
                tolerance
            )));
        }
        Ok(tolerance)
    }

    fn search_exact(
        &self,
        data_type: DataType,
        target: &[u8],
        options: &NumericOptions,
    ) -> MemoryResult<Matches<NumericMatch>> {
        let spans = self.spans(&options.bounds)?;
        let size = data_type.size();
        let step = if options.aligned { size } else { 1 };
        debug!(
            operation = "searchForValue",
            data_type = data_type.name(),
            aligned = options.aligned,
            spans = spans.len(),
            "scanning"
        );

        Ok(collect_matches(
            self.process,
            &spans,
            &self.limits,
            "searchForValue",
            size,
            step,
            |address, window| {
                (window == target).then(|| NumericMatch {
                    address,
                    data_type,
                    raw_data: window.to_vec(),
                })
            },
        ))
    }

    fn search_float<F>(
        &self,
        data_type: DataType,
        options: &NumericOptions,
        accept: F,
    ) -> MemoryResult<Matches<NumericMatch>>
    where
        F: Fn(&[u8]) -> Option<bool>,
    {
        let spans = self.spans(&options.bounds)?;
        let size = data_type.size();
        debug!(
            operation = "searchForValue",
            data_type = data_type.name(),
            spans = spans.len(),
            "scanning"
        );

        Ok(collect_matches(
            self.process,
            &spans,
            &self.limits,
            "searchForValue",
            size,
            size,
            |address, window| {
                accept(window)
                    .unwrap_or(false)
                    .then(|| NumericMatch {
                        address,
                        data_type,
                        raw_data: window.to_vec(),
                    })
            },
        ))
    }
}
