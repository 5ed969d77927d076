//! Per-dataset row log streams.
//!
//! Three append-mode files per dataset - malformed, invalid, unavailable -
//! each echoing the original raw row so it can be replayed manually. Together
//! with the status file they are the system of record for what was and was
//! not migrated.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;

pub struct RowLogs {
    malformed: LineLog,
    invalid: LineLog,
    unavailable: LineLog,
    pub malformed_rows: u64,
    pub invalid_rows: u64,
    pub unavailable_rows: u64,
}

impl RowLogs {
    /// Open the three log streams for one dataset under `dir`.
    pub fn create(dir: &Path, key: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            malformed: LineLog::open(dir.join(format!("{}_malformed.log", key)))?,
            invalid: LineLog::open(dir.join(format!("{}_invalid.log", key)))?,
            unavailable: LineLog::open(dir.join(format!("{}_unavailable.log", key)))?,
            malformed_rows: 0,
            invalid_rows: 0,
            unavailable_rows: 0,
        })
    }

    /// Row had more fields than the header; it is still processed.
    pub fn malformed(&mut self, raw: &str) {
        self.malformed_rows += 1;
        self.malformed.write_line(raw);
    }

    /// Row failed the completeness check (or the store rejected it); the
    /// rendered statement rides along for diagnosis.
    pub fn invalid(&mut self, raw: &str, detail: &str) {
        self.invalid_rows += 1;
        self.invalid.write_line(&format!("{}\t{}", raw, detail));
    }

    /// Row was in a sub-batch the store could not take; kept for replay.
    pub fn unavailable(&mut self, raw: &str) {
        self.unavailable_rows += 1;
        self.unavailable.write_line(raw);
    }

    pub fn flush(&mut self) {
        self.malformed.flush();
        self.invalid.flush();
        self.unavailable.flush();
    }
}

struct LineLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LineLog {
    fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.writer, "{}", line) {
            warn!("cannot write to {}: {}", self.path.display(), e);
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("cannot flush {}: {}", self.path.display(), e);
        }
    }
}
