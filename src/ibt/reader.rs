//! IBT capture reader
//!
//! Loads a capture into memory, validates the header against the buffer and
//! exposes the descriptor table, the metadata block and a [`SampleAccessor`]
//! over the sample table.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pitlog::ibt::CaptureReader;
//!
//! fn inspect() -> pitlog::Result<()> {
//!     let reader = CaptureReader::open("session.ibt")?;
//!     println!("{} samples at {:?} Hz", reader.total_samples(), reader.header().tick_rate_hz());
//!
//!     let accessor = reader.accessor();
//!     if let Some(lap) = reader.variables().get_variable("Lap") {
//!         println!("first lap value: {:?}", accessor.read(lap, 0));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Oversized files go through [`CaptureReader::open_prefix`], which reads only
//! a bounded prefix and estimates the sample count from the file size.

use super::format::{CaptureHeader, DiskSubHeader, extract_variable_schema};
use crate::{Result, SampleAccessor, TelemetryError, VariableSchema, yaml_utils};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fully loaded capture.
pub struct CaptureReader {
    data: Vec<u8>,
    path: PathBuf,
    header: CaptureHeader,
    disk_header: Option<DiskSubHeader>,
    variable_schema: VariableSchema,
    total_samples: usize,
}

/// Header and metadata decoded from the start of a capture too large to load.
#[derive(Debug, Clone)]
pub struct CapturePrefix {
    path: PathBuf,
    header: CaptureHeader,
    disk_header: Option<DiskSubHeader>,
    metadata: Option<String>,
    file_len: u64,
}

impl CaptureReader {
    /// Open and fully load a capture file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).map_err(|e| TelemetryError::file_error(path.clone(), e))?;
        Self::from_vec(data, path)
    }

    /// Create a reader over in-memory bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_vec(data.to_vec(), PathBuf::from("<memory>"))
    }

    /// Create a reader taking ownership of the bytes, with path context
    pub fn from_vec(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        let header = CaptureHeader::parse(&data)?;
        header.validate()?;
        header.session_info_range(data.len())?;

        let disk_header = DiskSubHeader::parse(&data);
        let variable_schema = extract_variable_schema(&data, &header)?;

        let sample_offset = header.sample_offset();
        if sample_offset > data.len() {
            return Err(TelemetryError::malformed(
                "Sample table",
                format!(
                    "First sample offset {} exceeds file size {}",
                    sample_offset,
                    data.len()
                ),
            ));
        }

        let total_samples = header.sample_count_for(data.len() as u64) as usize;

        if let Some(disk) = &disk_header {
            if disk.record_count > 0 && disk.record_count as usize != total_samples {
                warn!(
                    "Sample count mismatch in {}: disk header reports {} records, calculated {} from file size",
                    path.display(),
                    disk.record_count,
                    total_samples
                );
            }
        }

        debug!(
            path = %path.display(),
            total_samples,
            variables = variable_schema.variable_count(),
            "Loaded capture"
        );

        Ok(Self { data, path, header, disk_header, variable_schema, total_samples })
    }

    /// Read only the first `prefix_bytes` of a capture and describe it.
    pub fn open_prefix<P: AsRef<Path>>(path: P, prefix_bytes: usize) -> Result<CapturePrefix> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| TelemetryError::file_error(path.clone(), e))?;
        let file_len =
            file.metadata().map_err(|e| TelemetryError::file_error(path.clone(), e))?.len();

        let mut prefix = Vec::with_capacity(prefix_bytes);
        file.take(prefix_bytes as u64)
            .read_to_end(&mut prefix)
            .map_err(|e| TelemetryError::file_error(path.clone(), e))?;

        CapturePrefix::from_prefix(&prefix, file_len, path)
    }

    /// Cleaned metadata text, or `None` when the capture carries no block
    pub fn session_metadata(&self) -> Result<Option<String>> {
        metadata_text(&self.data, &self.header)
    }

    /// Get the variable schema for this capture
    pub fn variables(&self) -> &VariableSchema {
        &self.variable_schema
    }

    /// Accessor over the sample table
    pub fn accessor(&self) -> SampleAccessor<'_> {
        SampleAccessor::new(
            &self.data,
            self.header.sample_offset(),
            self.header.sample_stride(),
            self.total_samples,
        )
    }

    /// Get total number of whole samples in the file
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// Recorded duration in seconds, 0 when the tick rate is unusable
    pub fn duration_seconds(&self) -> f64 {
        self.header.duration_seconds(self.total_samples as u64)
    }

    /// Get the file path this reader was opened from
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Disk sub-header, when present
    pub fn disk_header(&self) -> Option<&DiskSubHeader> {
        self.disk_header.as_ref()
    }

    /// Get the capture header
    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }
}

impl CapturePrefix {
    /// Decode header and metadata from a prefix of a file whose full size is `file_len`.
    pub fn from_prefix(prefix: &[u8], file_len: u64, path: PathBuf) -> Result<Self> {
        let header = CaptureHeader::parse(prefix)?;
        header.validate()?;

        if header.sample_offset() as u64 > file_len {
            return Err(TelemetryError::malformed(
                "Sample table",
                format!(
                    "First sample offset {} exceeds file size {}",
                    header.sample_offset(),
                    file_len
                ),
            ));
        }

        let disk_header = DiskSubHeader::parse(prefix);
        let metadata = truncated_metadata_text(prefix, &header);

        debug!(
            path = %path.display(),
            file_len,
            prefix_len = prefix.len(),
            "Decoded capture prefix"
        );

        Ok(Self { path, header, disk_header, metadata, file_len })
    }

    /// Samples implied by the file size and stride.
    pub fn estimated_samples(&self) -> u64 {
        self.header.sample_count_for(self.file_len)
    }

    /// Duration implied by the estimated sample count.
    pub fn estimated_duration_seconds(&self) -> f64 {
        self.header.duration_seconds(self.estimated_samples())
    }

    pub fn session_metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    pub fn disk_header(&self) -> Option<&DiskSubHeader> {
        self.disk_header.as_ref()
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }
}

fn metadata_text(data: &[u8], header: &CaptureHeader) -> Result<Option<String>> {
    if header.session_info_len <= 0 {
        return Ok(None);
    }

    let range = header.session_info_range(data.len())?;
    Ok(clean_metadata(&data[range]))
}

/// Metadata from a prefix, cut at the prefix end when the block runs past it.
fn truncated_metadata_text(prefix: &[u8], header: &CaptureHeader) -> Option<String> {
    if header.session_info_len <= 0 {
        return None;
    }

    let start = (header.session_info_offset.max(0) as usize).min(prefix.len());
    let end = start.saturating_add(header.session_info_len as usize).min(prefix.len());
    if end - start < header.session_info_len as usize {
        debug!(
            available = end - start,
            expected = header.session_info_len,
            "Metadata block truncated at prefix end"
        );
    }
    clean_metadata(&prefix[start..end])
}

fn clean_metadata(block: &[u8]) -> Option<String> {
    let raw = yaml_utils::extract_text_block(block);
    if raw.trim().is_empty() {
        return None;
    }
    Some(yaml_utils::strip_control_characters(&raw))
}
