//! IBT file format structures and parsing
//!
//! ## IBT File Structure
//!
//! 1. **Main Header** (112 bytes) - `irsdk_header` compatible structure
//! 2. **Disk Sub-Header** (32 bytes at offset 112) - recording start date and record count
//! 3. **Variable Headers** - array of 144-byte channel descriptors
//! 4. **Session Info** - YAML-ish metadata text block
//! 5. **Sample Data** - fixed-stride telemetry samples up to end of file
//!
//! All integers are little-endian. Every read is bounds checked and reported as
//! [`TelemetryError::MalformedCapture`] rather than decoding past the buffer.

use crate::{Result, TelemetryError, VariableDescriptor, VariableSchema, VariableType};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Bytes needed to read every header field we use (sample offset ends at 56).
pub const IRSDK_HEADER_MIN_SIZE: usize = 56;
const IRSDK_DISK_SUBHEADER_OFFSET: usize = 112;
const IRSDK_DISK_SUBHEADER_SIZE: usize = 32;
pub const IRSDK_VAR_HEADER_SIZE: usize = 144;
const IRSDK_VAR_NAME_OFFSET: usize = 16;
const IRSDK_VAR_NAME_SIZE: usize = 32;
const IRSDK_EXPECTED_VERSION: i32 = 2;

/// Capture header fields (subset of `irsdk_header`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureHeader {
    pub version: i32,
    pub tick_rate: i32,
    pub session_info_len: i32,
    pub session_info_offset: i32,
    pub num_vars: i32,
    pub var_header_offset: i32,
    pub buf_len: i32,
    pub buf_offset: i32,
}

/// IBT disk sub-header
/// struct irsdk_diskSubHeader {
///   time_t sessionStartDate;   // 8 bytes (i64)
///   double sessionStartTime;   // 8 bytes (f64)
///   double sessionEndTime;     // 8 bytes (f64)
///   int sessionLapCount;       // 4 bytes (i32)
///   int sessionRecordCount;    // 4 bytes (i32)
/// }
#[derive(Debug, Clone, PartialEq)]
pub struct DiskSubHeader {
    pub start_date: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub lap_count: i32,
    pub record_count: i32,
}

impl CaptureHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        trace!("Reading capture header ({} bytes available)", data.len());
        if data.len() < IRSDK_HEADER_MIN_SIZE {
            return Err(TelemetryError::malformed(
                "Capture header",
                format!(
                    "Need at least {} header bytes, have {}",
                    IRSDK_HEADER_MIN_SIZE,
                    data.len()
                ),
            ));
        }

        // struct irsdk_header {
        //   int ver;                    // offset 0
        //   int status;                 // offset 4
        //   int tickRate;               // offset 8
        //   int sessionInfoUpdate;      // offset 12
        //   int sessionInfoLen;         // offset 16
        //   int sessionInfoOffset;      // offset 20
        //   int numVars;                // offset 24
        //   int varHeaderOffset;        // offset 28
        //   int numBuf;                 // offset 32
        //   int bufLen;                 // offset 36
        //   int pad1[2];                // offset 40
        //   irsdk_varBuf varBuf[4];     // offset 48, varBuf[0].bufOffset at 52
        // }
        let header = Self {
            version: parse_i32_le(data, 0)?,
            tick_rate: parse_i32_le(data, 8)?,
            session_info_len: parse_i32_le(data, 16)?,
            session_info_offset: parse_i32_le(data, 20)?,
            num_vars: parse_i32_le(data, 24)?,
            var_header_offset: parse_i32_le(data, 28)?,
            buf_len: parse_i32_le(data, 36)?,
            buf_offset: parse_i32_le(data, 52)?,
        };

        debug!(
            version = header.version,
            tick_rate = header.tick_rate,
            num_vars = header.num_vars,
            buf_len = header.buf_len,
            buf_offset = header.buf_offset,
            "Parsed capture header"
        );

        if header.version != IRSDK_EXPECTED_VERSION {
            warn!(
                "Unexpected capture version {} (expected {}), decoding anyway",
                header.version, IRSDK_EXPECTED_VERSION
            );
        }

        Ok(header)
    }

    /// Check header fields that do not depend on the buffer length.
    pub fn validate(&self) -> Result<()> {
        if self.buf_len <= 0 {
            return Err(TelemetryError::malformed(
                "Header validation",
                format!("Sample stride must be positive, found {}", self.buf_len),
            ));
        }

        for (field, value) in [
            ("tick rate", self.tick_rate),
            ("session info length", self.session_info_len),
            ("session info offset", self.session_info_offset),
            ("variable count", self.num_vars),
            ("variable header offset", self.var_header_offset),
            ("sample offset", self.buf_offset),
        ] {
            if value < 0 {
                return Err(TelemetryError::malformed(
                    "Header validation",
                    format!("{} cannot be negative ({})", field, value),
                ));
            }
        }

        Ok(())
    }

    /// Samples per second, or `None` when the header carries no usable rate.
    pub fn tick_rate_hz(&self) -> Option<f64> {
        (self.tick_rate > 0).then_some(self.tick_rate as f64)
    }

    /// Sample stride in bytes. Only meaningful after [`validate`](Self::validate).
    pub fn sample_stride(&self) -> usize {
        self.buf_len.max(0) as usize
    }

    /// Byte offset of the first sample.
    pub fn sample_offset(&self) -> usize {
        self.buf_offset.max(0) as usize
    }

    /// Whole samples contained in a file of `total_len` bytes.
    pub fn sample_count_for(&self, total_len: u64) -> u64 {
        let stride = self.sample_stride() as u64;
        if stride == 0 {
            return 0;
        }
        total_len.saturating_sub(self.sample_offset() as u64) / stride
    }

    /// Duration covered by `samples` at the header tick rate; 0 without a tick rate.
    pub fn duration_seconds(&self, samples: u64) -> f64 {
        match self.tick_rate_hz() {
            Some(rate) => samples as f64 / rate,
            None => 0.0,
        }
    }

    /// Byte range of the metadata block, checked against `available` bytes.
    pub fn session_info_range(&self, available: usize) -> Result<std::ops::Range<usize>> {
        let start = self.session_info_offset.max(0) as usize;
        let end = start.checked_add(self.session_info_len.max(0) as usize).ok_or_else(|| {
            TelemetryError::malformed("Session info", "Offset + length overflowed")
        })?;
        if end > available {
            return Err(TelemetryError::malformed(
                "Session info",
                format!(
                    "Block extends beyond buffer bounds: offset={}, len={}, buffer_size={}",
                    start, self.session_info_len, available
                ),
            ));
        }
        Ok(start..end)
    }
}

impl DiskSubHeader {
    /// Parse the disk sub-header when the buffer is long enough to contain it.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let end = IRSDK_DISK_SUBHEADER_OFFSET + IRSDK_DISK_SUBHEADER_SIZE;
        let bytes = data.get(IRSDK_DISK_SUBHEADER_OFFSET..end)?;
        Some(Self {
            start_date: parse_i64_le(bytes, 0).ok()?,
            start_time: parse_f64_le(bytes, 8).ok()?,
            end_time: parse_f64_le(bytes, 16).ok()?,
            lap_count: parse_i32_le(bytes, 24).ok()?,
            record_count: parse_i32_le(bytes, 28).ok()?,
        })
    }
}

/// Decode the variable descriptor table referenced by `header`.
pub fn extract_variable_schema(data: &[u8], header: &CaptureHeader) -> Result<VariableSchema> {
    debug!("Extracting variable schema for {} variables", header.num_vars);

    let num_vars = header.num_vars.max(0) as usize;
    let table_start = header.var_header_offset.max(0) as usize;
    let table_end = num_vars
        .checked_mul(IRSDK_VAR_HEADER_SIZE)
        .and_then(|size| size.checked_add(table_start))
        .ok_or_else(|| {
            TelemetryError::malformed("Variable headers", "Table size calculation overflowed")
        })?;

    if table_end > data.len() {
        return Err(TelemetryError::malformed(
            "Variable headers",
            format!(
                "Table for {} variables ends at {} beyond buffer size {}",
                num_vars,
                table_end,
                data.len()
            ),
        ));
    }

    let mut variables = HashMap::with_capacity(num_vars);

    for (i, record) in data[table_start..table_end].chunks_exact(IRSDK_VAR_HEADER_SIZE).enumerate()
    {
        let var_type = parse_i32_le(record, 0)?;
        let offset = parse_i32_le(record, 4)?;
        let name = extract_null_terminated_string(
            &record[IRSDK_VAR_NAME_OFFSET..IRSDK_VAR_NAME_OFFSET + IRSDK_VAR_NAME_SIZE],
        );

        if name.is_empty() || offset < 0 {
            trace!("Skipping variable header {} (name='{}', offset={})", i, name, offset);
            continue;
        }

        let Some(data_type) = VariableType::from_tag(var_type) else {
            debug!("Skipping variable '{}' with unsupported type {}", name, var_type);
            continue;
        };

        variables.insert(name.clone(), VariableDescriptor::new(name, data_type, offset as usize));
    }

    debug!("Extracted {} variables with sample stride {}", variables.len(), header.buf_len);
    Ok(VariableSchema::new(variables, header.sample_stride()))
}

fn parse_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    let bytes = data.get(offset..offset + 4).ok_or_else(|| {
        TelemetryError::malformed(
            "Integer parsing",
            format!("Insufficient data for i32 at offset {} (have {} bytes)", offset, data.len()),
        )
    })?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn parse_i64_le(data: &[u8], offset: usize) -> Result<i64> {
    let bytes = data.get(offset..offset + 8).ok_or_else(|| {
        TelemetryError::malformed(
            "Long integer parsing",
            format!("Insufficient data for i64 at offset {} (have {} bytes)", offset, data.len()),
        )
    })?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(i64::from_le_bytes(raw))
}

fn parse_f64_le(data: &[u8], offset: usize) -> Result<f64> {
    let bytes = data.get(offset..offset + 8).ok_or_else(|| {
        TelemetryError::malformed(
            "Double precision float parsing",
            format!("Insufficient data for f64 at offset {} (have {} bytes)", offset, data.len()),
        )
    })?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(f64::from_le_bytes(raw))
}

/// Extract null-terminated string from byte slice
fn extract_null_terminated_string(bytes: &[u8]) -> String {
    let null_pos = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..null_pos]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CaptureBuilder;
    use anyhow::{Result, ensure};
    use proptest::prelude::*;

    #[test]
    fn test_header_fields_at_fixed_offsets() -> Result<()> {
        let capture = CaptureBuilder::timing().tick_rate(60).build();
        let header = CaptureHeader::parse(&capture)?;
        header.validate()?;

        assert_eq!(header.version, 2);
        assert_eq!(header.tick_rate, 60);
        assert_eq!(header.var_header_offset, 144);
        assert_eq!(header.num_vars, 6);
        ensure!(header.buf_len > 0, "stride should be positive");
        ensure!(
            header.buf_offset as usize >= header.session_info_offset as usize,
            "samples follow the metadata block"
        );
        Ok(())
    }

    #[test]
    fn test_variable_table_decodes_names_types_offsets() -> Result<()> {
        let capture = CaptureBuilder::timing().build();
        let header = CaptureHeader::parse(&capture)?;
        let schema = extract_variable_schema(&capture, &header)?;

        assert_eq!(schema.variable_count(), 6);
        let lap = schema.require("Lap")?;
        assert_eq!(lap.data_type, VariableType::Int32);
        assert_eq!(lap.offset, 0);
        let pct = schema.require("LapDistPct")?;
        assert_eq!(pct.data_type, VariableType::Float32);
        let current = schema.require("LapCurrentLapTime")?;
        assert_eq!(current.data_type, VariableType::Float32);
        assert!(schema.has_variable("PlayerCarMyIncidentCount"));
        Ok(())
    }

    #[test]
    fn test_unsupported_types_are_skipped() -> Result<()> {
        let capture = CaptureBuilder::timing().extra_variable("OnPitRoad", 1, 40).build();
        let header = CaptureHeader::parse(&capture)?;
        let schema = extract_variable_schema(&capture, &header)?;
        assert!(!schema.has_variable("OnPitRoad"));
        assert_eq!(schema.variable_count(), 6);
        Ok(())
    }

    #[test]
    fn test_truncated_header_is_malformed() {
        let result = CaptureHeader::parse(&[0u8; 10]);
        assert!(matches!(result, Err(TelemetryError::MalformedCapture { .. })));
    }

    #[test]
    fn test_zero_stride_is_malformed() -> Result<()> {
        let mut capture = CaptureBuilder::timing().build();
        capture[36..40].copy_from_slice(&0i32.to_le_bytes());
        let header = CaptureHeader::parse(&capture)?;
        assert!(header.validate().unwrap_err().is_malformed());
        Ok(())
    }

    #[test]
    fn test_variable_table_beyond_buffer_is_malformed() -> Result<()> {
        let mut capture = CaptureBuilder::timing().build();
        capture[24..28].copy_from_slice(&100_000i32.to_le_bytes());
        let header = CaptureHeader::parse(&capture)?;
        let result = extract_variable_schema(&capture, &header);
        assert!(result.unwrap_err().is_malformed());
        Ok(())
    }

    #[test]
    fn test_session_info_range_bounds() -> Result<()> {
        let capture = CaptureBuilder::timing().build();
        let header = CaptureHeader::parse(&capture)?;
        let range = header.session_info_range(capture.len())?;
        assert_eq!(range.start, header.session_info_offset as usize);
        assert!(header.session_info_range(range.end - 1).is_err());
        Ok(())
    }

    #[test]
    fn test_zero_tick_rate_reports_zero_duration() {
        let header = CaptureHeader {
            version: 2,
            tick_rate: 0,
            session_info_len: 0,
            session_info_offset: 0,
            num_vars: 0,
            var_header_offset: 0,
            buf_len: 16,
            buf_offset: 64,
        };
        assert_eq!(header.duration_seconds(1_000), 0.0);
        assert_eq!(header.sample_count_for(64 + 16 * 10 + 5), 10);
        assert_eq!(header.sample_count_for(10), 0);
    }

    #[test]
    fn test_disk_sub_header_requires_full_record() {
        assert!(DiskSubHeader::parse(&[0u8; 140]).is_none());
        let mut data = vec![0u8; 144];
        data[112..120].copy_from_slice(&1_726_227_023i64.to_le_bytes());
        data[140..144].copy_from_slice(&42i32.to_le_bytes());
        let disk = DiskSubHeader::parse(&data).expect("sub-header present");
        assert_eq!(disk.start_date, 1_726_227_023);
        assert_eq!(disk.record_count, 42);
    }

    proptest! {
        #[test]
        fn prop_duration_is_finite_and_non_negative(
            tick_rate in 1..1000i32,
            stride in 1..4096i32,
            offset in 0..100_000i32,
            total_len in 0..u32::MAX as u64,
        ) {
            let header = CaptureHeader {
                version: 2,
                tick_rate,
                session_info_len: 0,
                session_info_offset: 0,
                num_vars: 0,
                var_header_offset: 0,
                buf_len: stride,
                buf_offset: offset,
            };
            let samples = header.sample_count_for(total_len);
            let duration = header.duration_seconds(samples);
            prop_assert!(duration.is_finite());
            prop_assert!(duration >= 0.0);
            prop_assert!((duration - samples as f64 / tick_rate as f64).abs() < 1e-9);
        }
    }
}
