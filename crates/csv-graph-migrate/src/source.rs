//! Row source: header plus a lazy, offset-restartable sequence of raw lines.
//!
//! Files are read line by line so the original raw row is available for the
//! per-dataset log streams; individual lines are tokenized with the `csv`
//! crate, honoring RFC4180 quoting and the configured delimiter. Plain and
//! gzip-compressed files are supported.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{MigrateError, Result};

/// Parsed header line with name-to-index lookup.
#[derive(Debug, Clone)]
pub struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Streams raw data rows from one file.
pub struct RowSource {
    reader: Box<dyn BufRead + Send>,
    header: Header,
    separator: u8,
}

impl std::fmt::Debug for RowSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSource")
            .field("header", &self.header)
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

impl RowSource {
    /// Open a data file and consume its header line. `.gz` paths are
    /// decompressed on the fly.
    pub fn open(path: &Path, separator: u8) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| MigrateError::Source(format!("cannot open {}: {}", path.display(), e)))?;

        let reader: Box<dyn BufRead + Send> =
            if path.extension().is_some_and(|ext| ext == "gz") {
                Box::new(BufReader::new(GzDecoder::new(BufReader::new(file))))
            } else {
                Box::new(BufReader::new(file))
            };

        let mut source = Self {
            reader,
            header: Header::new(Vec::new()),
            separator,
        };

        let header_line = source.next_line()?.ok_or_else(|| {
            MigrateError::Source(format!("{}: no header line", path.display()))
        })?;
        source.header = Header::new(tokenize(&header_line, separator));
        Ok(source)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Skip `n` data rows (already-migrated rows on resume). Returns how many
    /// were actually skipped; fewer means EOF.
    pub fn skip(&mut self, n: u64) -> Result<u64> {
        let mut skipped = 0;
        while skipped < n {
            if self.next_row()?.is_none() {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Next raw data row, skipping blank lines. None at EOF.
    pub fn next_row(&mut self) -> Result<Option<String>> {
        loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(Some(line)),
            }
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Tokenize one raw row with this source's separator.
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        tokenize(line, self.separator)
    }
}

/// Split one raw line into fields, honoring RFC4180 quoting.
pub fn tokenize(line: &str, separator: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(|s| s.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Read just the header of a data file (pre-flight column checks).
pub fn read_header(path: &Path, separator: u8) -> Result<Header> {
    Ok(RowSource::open(path, separator)?.header.clone())
}
