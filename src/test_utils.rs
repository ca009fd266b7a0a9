//! Synthetic capture construction for tests and benchmarks
//!
//! [`CaptureBuilder`] writes byte-exact IBT captures with the timing channels
//! the analysis reads, so tests can script laps, sector crossings and
//! incidents without shipping recorded telemetry.
//!
//! ```rust,ignore
//! let mut builder = CaptureBuilder::timing().tick_rate(60);
//! builder.lap(1, &[30.0, 30.1, 30.1]);
//! builder.lap(2, &[29.8, 30.0, 30.0]);
//! builder.finish();
//! let bytes = builder.build();
//! ```

#![cfg(any(test, feature = "benchmark"))]

use std::path::{Path, PathBuf};

/// Bytes per synthetic sample.
pub const TIMING_STRIDE: usize = 48;

const HEADER_AND_SUBHEADER: usize = 144;
const VAR_HEADER_SIZE: usize = 144;

/// The timing channels, their type tags and sample offsets.
const TIMING_VARIABLES: [(&str, i32, i32); 6] = [
    ("Lap", 2, 0),
    ("LapDistPct", 4, 4),
    ("LapCurrentLapTime", 4, 8),
    ("LapLastLapTime", 4, 12),
    ("LapBestLapTime", 4, 16),
    ("PlayerCarMyIncidentCount", 2, 20),
];

/// One row of the sample table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSample {
    pub lap: i32,
    pub dist_pct: f32,
    pub current_lap_time: f32,
    pub last_lap_time: f32,
    pub best_lap_time: f32,
    pub incidents: i32,
}

impl TimingSample {
    fn encode(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.lap.to_le_bytes());
        out.extend_from_slice(&self.dist_pct.to_le_bytes());
        out.extend_from_slice(&self.current_lap_time.to_le_bytes());
        out.extend_from_slice(&self.last_lap_time.to_le_bytes());
        out.extend_from_slice(&self.best_lap_time.to_le_bytes());
        out.extend_from_slice(&self.incidents.to_le_bytes());
        out.resize(start + TIMING_STRIDE, 0);
    }
}

/// Builder for synthetic IBT captures.
#[derive(Debug, Clone)]
pub struct CaptureBuilder {
    tick_rate: i32,
    variables: Vec<(String, i32, i32)>,
    track: String,
    track_short: String,
    car: String,
    driver: String,
    skies: String,
    precipitation: i32,
    sector_starts: Vec<f64>,
    metadata_override: Option<String>,
    start_date: i64,
    samples: Vec<TimingSample>,
    current_lap: i32,
    last_lap_time: f32,
    best_lap_time: f32,
    incidents: i32,
}

impl CaptureBuilder {
    /// A capture carrying all six timing channels, three sectors, dry weather.
    pub fn timing() -> Self {
        Self {
            tick_rate: 60,
            variables: TIMING_VARIABLES
                .iter()
                .map(|(name, tag, offset)| (name.to_string(), *tag, *offset))
                .collect(),
            track: "Autodromo Nazionale Monza".to_string(),
            track_short: "Monza Full".to_string(),
            car: "Ferrari 296 GT3".to_string(),
            driver: "Test Driver".to_string(),
            skies: "Partly Cloudy".to_string(),
            precipitation: 0,
            sector_starts: vec![0.0, 0.33, 0.66],
            metadata_override: None,
            start_date: 0,
            samples: Vec::new(),
            current_lap: 0,
            last_lap_time: 0.0,
            best_lap_time: 0.0,
            incidents: 0,
        }
    }

    pub fn tick_rate(mut self, tick_rate: i32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Add a descriptor that the sample rows do not populate.
    pub fn extra_variable(mut self, name: &str, tag: i32, offset: i32) -> Self {
        self.variables.push((name.to_string(), tag, offset));
        self
    }

    /// Drop a timing channel from the descriptor table.
    pub fn without_variable(mut self, name: &str) -> Self {
        self.variables.retain(|(existing, _, _)| existing != name);
        self
    }

    pub fn track(mut self, display: &str, short: &str) -> Self {
        self.track = display.to_string();
        self.track_short = short.to_string();
        self
    }

    pub fn car(mut self, car: &str) -> Self {
        self.car = car.to_string();
        self
    }

    pub fn precipitation(mut self, percent: i32) -> Self {
        self.precipitation = percent;
        self
    }

    pub fn sector_starts(mut self, starts: &[f64]) -> Self {
        self.sector_starts = starts.to_vec();
        self
    }

    /// Replace the generated metadata block verbatim.
    pub fn metadata_text(mut self, text: &str) -> Self {
        self.metadata_override = Some(text.to_string());
        self
    }

    /// Unix seconds written to the disk sub-header.
    pub fn start_date(mut self, unix_seconds: i64) -> Self {
        self.start_date = unix_seconds;
        self
    }

    /// Append a raw sample row.
    pub fn push(&mut self, sample: TimingSample) -> &mut Self {
        self.samples.push(sample);
        self
    }

    /// Append a sample carrying the builder's last/best/incident state.
    pub fn sample(&mut self, lap: i32, dist_pct: f64, current_lap_time: f64) -> &mut Self {
        self.current_lap = lap;
        let sample = TimingSample {
            lap,
            dist_pct: dist_pct as f32,
            current_lap_time: current_lap_time as f32,
            last_lap_time: self.last_lap_time,
            best_lap_time: self.best_lap_time,
            incidents: self.incidents,
        };
        self.push(sample)
    }

    /// Raise the incident counter for all following samples.
    pub fn incident(&mut self) -> &mut Self {
        self.incidents += 1;
        self
    }

    /// Script a clean lap with the given sector durations.
    pub fn lap(&mut self, lap: i32, sector_durations: &[f64]) -> &mut Self {
        self.scripted_lap(lap, sector_durations, None)
    }

    /// Script a lap with an incident recorded midway through `sector`.
    pub fn lap_with_incident(
        &mut self,
        lap: i32,
        sector_durations: &[f64],
        sector: usize,
    ) -> &mut Self {
        self.scripted_lap(lap, sector_durations, Some(sector))
    }

    /// Open the next lap so the last scripted lap closes.
    pub fn finish(&mut self) -> &mut Self {
        let next = self.current_lap + 1;
        self.sample(next, 0.004, 0.05)
    }

    pub fn sample_len(&self) -> usize {
        self.samples.len()
    }

    /// Metadata text as it will be written.
    pub fn metadata(&self) -> String {
        if let Some(text) = &self.metadata_override {
            return text.clone();
        }

        let mut yaml = format!(
            "---\nWeekendInfo:\n TrackName: {}\n TrackDisplayName: {}\n TrackDisplayShortName: {}\n \
             TrackSkies: {}\n TrackPrecipitation: {} %\n\
             DriverInfo:\n DriverCarIdx: 0\n Drivers:\n - CarIdx: 0\n   UserName: {}\n   CarScreenName: {}\n\n\
             SplitTimeInfo:\n Sectors:\n",
            self.track.to_lowercase(),
            self.track,
            self.track_short,
            self.skies,
            self.precipitation,
            self.driver,
            self.car,
        );
        for (num, start) in self.sector_starts.iter().enumerate() {
            yaml.push_str(&format!(" - SectorNum: {}\n   SectorStartPct: {:.6}\n", num, start));
        }
        yaml.push_str("\n...\n");
        yaml
    }

    /// Serialize the capture.
    pub fn build(&self) -> Vec<u8> {
        let mut metadata = self.metadata().into_bytes();
        metadata.push(0);

        let var_header_offset = HEADER_AND_SUBHEADER;
        let metadata_offset = var_header_offset + self.variables.len() * VAR_HEADER_SIZE;
        let sample_offset = metadata_offset + metadata.len();

        let mut out = vec![0u8; HEADER_AND_SUBHEADER];
        write_i32(&mut out, 0, 2);
        write_i32(&mut out, 4, 1);
        write_i32(&mut out, 8, self.tick_rate);
        write_i32(&mut out, 16, metadata.len() as i32);
        write_i32(&mut out, 20, metadata_offset as i32);
        write_i32(&mut out, 24, self.variables.len() as i32);
        write_i32(&mut out, 28, var_header_offset as i32);
        write_i32(&mut out, 32, 1);
        write_i32(&mut out, 36, TIMING_STRIDE as i32);
        write_i32(&mut out, 52, sample_offset as i32);

        out[112..120].copy_from_slice(&self.start_date.to_le_bytes());
        let laps = self.samples.last().map_or(0, |s| s.lap);
        write_i32(&mut out, 136, laps);
        write_i32(&mut out, 140, self.samples.len() as i32);

        for (name, tag, offset) in &self.variables {
            let mut record = vec![0u8; VAR_HEADER_SIZE];
            write_i32(&mut record, 0, *tag);
            write_i32(&mut record, 4, *offset);
            write_i32(&mut record, 8, 1);
            let name_bytes = name.as_bytes();
            let len = name_bytes.len().min(31);
            record[16..16 + len].copy_from_slice(&name_bytes[..len]);
            out.extend_from_slice(&record);
        }

        out.extend_from_slice(&metadata);
        for sample in &self.samples {
            sample.encode(&mut out);
        }
        out
    }

    /// Write the capture into `dir` and return its path.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> std::io::Result<PathBuf> {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build())?;
        Ok(path)
    }

    fn sector_span(&self, sector: usize, count: usize) -> (f64, f64) {
        if self.sector_starts.len() == count {
            let start = self.sector_starts[sector];
            let end = self.sector_starts.get(sector + 1).copied().unwrap_or(1.0);
            (start, end)
        } else {
            (sector as f64 / count as f64, (sector + 1) as f64 / count as f64)
        }
    }

    fn scripted_lap(
        &mut self,
        lap: i32,
        sector_durations: &[f64],
        incident_sector: Option<usize>,
    ) -> &mut Self {
        let count = sector_durations.len();
        self.sample(lap, 0.004, 0.05);

        let mut elapsed = 0.0;
        for (sector, duration) in sector_durations.iter().enumerate() {
            let (start, end) = self.sector_span(sector, count);
            if sector > 0 {
                self.sample(lap, start + 0.002, elapsed);
            }
            let mid = (start + end) / 2.0;
            self.sample(lap, mid, elapsed + duration / 2.0);
            if incident_sector == Some(sector) {
                self.incident();
                self.sample(lap, mid + 0.001, elapsed + duration / 2.0 + 0.1);
            }
            elapsed += duration;
        }

        self.sample(lap, 0.999, elapsed - 0.05);
        self.sample(lap, 0.001, elapsed);

        let lap_time = elapsed as f32;
        self.last_lap_time = lap_time;
        if self.best_lap_time <= 0.0 || lap_time < self.best_lap_time {
            self.best_lap_time = lap_time;
        }
        self
    }
}

fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
