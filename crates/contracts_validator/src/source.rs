//! Chunked data sources.
//!
//! A [`ChunkSource`] yields a dataset as a sequence of bounded chunks so that
//! validation memory stays proportional to the chunk size, not the data size.

use crate::{row_from_json, DataRow, DataSet, DataValue, Result, ValidationError};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Iterator over the chunks of a source.
pub type ChunkIter<'a> = Box<dyn Iterator<Item = Result<DataSet>> + 'a>;

/// A dataset that can be read in bounded chunks.
///
/// `iter_chunks` may be called more than once; every call starts a fresh pass
/// over the data, which the outlier pass relies on.
pub trait ChunkSource {
    /// Starts a pass over the source in chunks of at most `chunk_size` rows.
    fn iter_chunks(&self, chunk_size: usize) -> Result<ChunkIter<'_>>;

    /// Loads the whole source into memory.
    fn load(&self) -> Result<DataSet>;

    /// Returns true if the source can be read chunk by chunk without
    /// materializing it first.
    fn supports_chunking(&self) -> bool {
        true
    }
}

impl ChunkSource for DataSet {
    fn iter_chunks(&self, chunk_size: usize) -> Result<ChunkIter<'_>> {
        Ok(Box::new(self.chunks(chunk_size).map(Ok)))
    }

    fn load(&self) -> Result<DataSet> {
        Ok(self.clone())
    }

    fn supports_chunking(&self) -> bool {
        false
    }
}

/// Newline-delimited JSON file, one object per line.
///
/// Blank lines are skipped. A line that is not a JSON object fails the pass
/// with its line number.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    /// Creates a source reading from `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChunkSource for JsonLinesSource {
    fn iter_chunks(&self, chunk_size: usize) -> Result<ChunkIter<'_>> {
        let file = File::open(&self.path)?;
        debug!(
            "Reading {} in chunks of {} rows",
            self.path.display(),
            chunk_size
        );
        Ok(Box::new(JsonLinesChunks {
            path: self.path.display().to_string(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            chunk_size: chunk_size.max(1),
            done: false,
        }))
    }

    fn load(&self) -> Result<DataSet> {
        let mut rows = Vec::new();
        for chunk in self.iter_chunks(usize::MAX)? {
            rows.extend(chunk?.into_rows());
        }
        Ok(DataSet::from_rows(rows))
    }
}

struct JsonLinesChunks {
    path: String,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    chunk_size: usize,
    done: bool,
}

impl JsonLinesChunks {
    fn parse_line(&self, line: &str) -> Result<DataRow> {
        let location = format!("{}:{}", self.path, self.line_no);
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(serde_json::Value::Object(object)) => Ok(row_from_json(object)),
            Ok(other) => Err(ValidationError::unreadable(
                location,
                format!("expected a JSON object, found {}", json_kind(&other)),
            )),
            Err(e) => Err(ValidationError::unreadable(location, e.to_string())),
        }
    }
}

impl Iterator for JsonLinesChunks {
    type Item = Result<DataSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut rows = Vec::new();
        while rows.len() < self.chunk_size {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    break;
                }
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            match self.parse_line(&line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        if rows.is_empty() {
            None
        } else {
            Some(Ok(DataSet::from_rows(rows)))
        }
    }
}

/// Comma-separated file with a header row.
///
/// Header names become column names. Empty cells read as null, and cells
/// that parse as integers or floats become numbers; everything else stays a
/// string. A malformed record fails the pass with its line number.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSource {
    /// Creates a source reading from `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
        }
    }

    /// Sets the field delimiter, e.g. `b'\t'` for TSV files.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn location(&self, position: Option<&csv::Position>) -> String {
        match position {
            Some(pos) => format!("{}:{}", self.path.display(), pos.line()),
            None => self.path.display().to_string(),
        }
    }
}

impl ChunkSource for CsvSource {
    fn iter_chunks(&self, chunk_size: usize) -> Result<ChunkIter<'_>> {
        let file = File::open(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(BufReader::new(file));
        let headers = reader
            .headers()
            .map_err(|e| ValidationError::unreadable(self.location(e.position()), e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        debug!(
            "Reading {} in chunks of {} rows",
            self.path.display(),
            chunk_size
        );
        Ok(Box::new(CsvChunks {
            source: self,
            reader,
            headers,
            chunk_size: chunk_size.max(1),
            done: false,
        }))
    }

    fn load(&self) -> Result<DataSet> {
        let mut rows = Vec::new();
        for chunk in self.iter_chunks(usize::MAX)? {
            rows.extend(chunk?.into_rows());
        }
        Ok(DataSet::from_rows(rows))
    }
}

struct CsvChunks<'a> {
    source: &'a CsvSource,
    reader: csv::Reader<BufReader<File>>,
    headers: Vec<String>,
    chunk_size: usize,
    done: bool,
}

impl Iterator for CsvChunks<'_> {
    type Item = Result<DataSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut rows = Vec::new();
        let mut record = csv::StringRecord::new();
        while rows.len() < self.chunk_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    let row = self
                        .headers
                        .iter()
                        .zip(record.iter())
                        .map(|(name, cell)| (name.clone(), csv_value(cell)))
                        .collect();
                    rows.push(row);
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    let location = self.source.location(e.position());
                    return Some(Err(ValidationError::unreadable(location, e.to_string())));
                }
            }
        }

        if rows.is_empty() {
            None
        } else {
            Some(Ok(DataSet::from_rows(rows)))
        }
    }
}

fn csv_value(cell: &str) -> DataValue {
    let cell = cell.trim();
    if cell.is_empty() {
        DataValue::Null
    } else if let Ok(i) = cell.parse::<i64>() {
        DataValue::Int(i)
    } else if let Ok(f) = cell.parse::<f64>() {
        DataValue::Float(f)
    } else {
        DataValue::String(cell.to_string())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
