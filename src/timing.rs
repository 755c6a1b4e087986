//! Per-level generation timing, persisted to an append-only log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::Error;

/// One timing measurement: which level, how long its generation step took,
/// and how many pixels it holds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimingRecord {
    pub level: u32,
    pub elapsed_ms: f64,
    pub pixel_count: u64,
}

impl TimingRecord {
    /// The persisted line format: `<level> <elapsed_ms:.6> <pixel_count>`.
    pub fn to_line(&self) -> String {
        format!("{} {:.6} {}", self.level, self.elapsed_ms, self.pixel_count)
    }
}

/// Append-only timing log. Entries from successive runs accumulate; the file
/// is never truncated or rotated.
#[derive(Debug)]
pub struct TimingLog {
    path: PathBuf,
    file: File,
}

impl TimingLog {
    /// Open the log at `path` for appending, creating the file and its
    /// parent directories if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::timing_io(&path, e))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::timing_io(&path, e))?;
        Ok(TimingLog { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Timing is a diagnostic side channel: callers treat
    /// a failure here as a warning, not as a generation failure.
    pub fn append(&mut self, record: &TimingRecord) -> Result<(), Error> {
        log::info!(
            "level {} generated in {:.6} ms ({} pixels)",
            record.level,
            record.elapsed_ms,
            record.pixel_count
        );
        writeln!(self.file, "{}", record.to_line()).map_err(|e| Error::timing_io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format_has_six_decimal_digits() {
        let record = TimingRecord {
            level: 3,
            elapsed_ms: 0.1234567,
            pixel_count: 32 * 32,
        };
        assert_eq!(record.to_line(), "3 0.123457 1024");
    }

    #[test]
    fn open_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("timings.txt");
        let log = TimingLog::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(log.path(), path.as_path());
    }

    #[test]
    fn append_accumulates_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timings.txt");
        {
            let mut log = TimingLog::open(&path).unwrap();
            log.append(&TimingRecord {
                level: 0,
                elapsed_ms: 1.5,
                pixel_count: 65536,
            })
            .unwrap();
        }
        {
            // Reopening must not truncate the first run's entries.
            let mut log = TimingLog::open(&path).unwrap();
            log.append(&TimingRecord {
                level: 1,
                elapsed_ms: 0.25,
                pixel_count: 16384,
            })
            .unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, ["0 1.500000 65536", "1 0.250000 16384"]);
    }

    #[test]
    fn lines_parse_back_into_fields() {
        let record = TimingRecord {
            level: 7,
            elapsed_ms: 12.0,
            pixel_count: 4,
        };
        let line = record.to_line();
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].parse::<u32>().unwrap(), 7);
        assert!((fields[1].parse::<f64>().unwrap() - 12.0).abs() < 1e-9);
        assert_eq!(fields[2].parse::<u64>().unwrap(), 4);
    }

    #[test]
    fn unwritable_path_surfaces_timing_io() {
        // A directory path cannot be opened as an append-mode file.
        let dir = tempfile::tempdir().unwrap();
        let err = TimingLog::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::TimingIo { .. }));
    }
}
