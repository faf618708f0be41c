//! Pipe-delimited record reader
//!
//! Wraps a `csv` reader configured for `|`-separated files without a header
//! row. Values are matched to field names by position and deserialized into
//! the record type with serde; empty values become `None` for optional
//! fields. Reading is lazy: one line is parsed per `next()` call.

use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::{ImportError, Result};
use crate::models::SourceRecord;

/// Field separator of every source file
pub const DELIMITER: u8 = b'|';

/// Lazy, typed reader over one source file.
///
/// Any malformed line ends the sequence with an error; the file is assumed to
/// be structurally sound, so nothing after a bad line is read.
pub struct DelimitedReader<T> {
    path: PathBuf,
    headers: StringRecord,
    inner: csv::Reader<File>,
    buffer: StringRecord,
    read_count: u64,
    failed: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: SourceRecord> DelimitedReader<T> {
    /// Open `path` using the record type's declared field layout
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_fields(path, T::FIELD_NAMES)
    }

    /// Open `path` with an explicit ordered list of field names
    pub fn with_fields(path: impl AsRef<Path>, names: &[&str]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|source| ImportError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            headers: StringRecord::from(names.to_vec()),
            inner,
            buffer: StringRecord::new(),
            read_count: 0,
            failed: false,
            _record: PhantomData,
        })
    }

    /// Records successfully parsed so far
    pub fn read_count(&self) -> u64 {
        self.read_count
    }

    fn line(&self) -> u64 {
        self.buffer.position().map(|p| p.line()).unwrap_or(0)
    }

    fn parse_current(&self) -> Result<T> {
        if self.buffer.len() != self.headers.len() {
            return Err(ImportError::FieldCount {
                path: self.path.clone(),
                line: self.line(),
                expected: self.headers.len(),
                found: self.buffer.len(),
            });
        }

        self.buffer
            .deserialize(Some(&self.headers))
            .map_err(|source| ImportError::Read {
                path: self.path.clone(),
                line: self.line(),
                source,
            })
    }
}

impl<T: SourceRecord> Iterator for DelimitedReader<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            match self.inner.read_record(&mut self.buffer) {
                Ok(false) => return None,
                Ok(true) => {
                    let blank = self.buffer.len() == 1
                        && self.buffer.get(0).is_some_and(|v| v.trim().is_empty());
                    if blank {
                        continue;
                    }

                    let parsed = self.parse_current();
                    match parsed {
                        Ok(_) => self.read_count += 1,
                        Err(_) => self.failed = true,
                    }
                    return Some(parsed);
                },
                Err(source) => {
                    self.failed = true;
                    let line = source.position().map(|p| p.line()).unwrap_or(0);
                    return Some(Err(ImportError::Read {
                        path: self.path.clone(),
                        line,
                        source,
                    }));
                },
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{CategoryRecord, FormDataRecord, FormRecord};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_category_positionally() {
        let file = source("CAT01|Category One|ACTIVE\nCAT02|Category Two|INACTIVE\n");
        let records: Vec<CategoryRecord> = DelimitedReader::open(file.path())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            records[0],
            CategoryRecord {
                code: "CAT01".to_string(),
                name: Some("Category One".to_string()),
                status: Some("ACTIVE".to_string()),
            }
        );
        assert_eq!(records[1].code, "CAT02");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_empty_values_become_none() {
        let file = source("P-1|42||2024-01-01 10:00:00|||\n");
        let mut reader = DelimitedReader::<FormDataRecord>::open(file.path()).unwrap();
        let record = reader.next().unwrap().unwrap();

        assert_eq!(record.product_id.as_deref(), Some("P-1"));
        assert_eq!(record.form_id, 42);
        assert!(record.base64_form_data.is_none());
        assert!(record.form_data.is_none());
        assert_eq!(record.create_date.as_deref(), Some("2024-01-01 10:00:00"));
        assert!(record.update_user_id.is_none());
        assert!(reader.next().is_none());
        assert_eq!(reader.read_count(), 1);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let file = source("CAT01|One|ACTIVE\n\nCAT02|Two|ACTIVE\n");
        let reader = DelimitedReader::<CategoryRecord>::open(file.path()).unwrap();
        assert_eq!(reader.filter(|r| r.is_ok()).count(), 2);
    }

    #[test]
    fn test_type_mismatch_is_a_read_failure_with_line() {
        let file = source("1|CAT01|Form A|||||\nnot-a-number|CAT01|Form B|||||\n3|CAT01|Form C|||||\n");
        let mut reader = DelimitedReader::<FormRecord>::open(file.path()).unwrap();

        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(ImportError::Read { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected read failure, got {:?}", other),
        }
        // nothing is read past a malformed line
        assert!(reader.next().is_none());
        assert_eq!(reader.read_count(), 1);
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        let file = source("CAT01|Category One\n");
        let mut reader = DelimitedReader::<CategoryRecord>::open(file.path()).unwrap();

        match reader.next().unwrap() {
            Err(ImportError::FieldCount {
                expected, found, ..
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            },
            other => panic!("expected field count failure, got {:?}", other),
        }
    }

    #[test]
    fn test_quoted_delimiter_stays_in_field() {
        let file = source("CAT01|\"One | Two\"|ACTIVE\n");
        let mut reader = DelimitedReader::<CategoryRecord>::open(file.path()).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.name.as_deref(), Some("One | Two"));
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let result = DelimitedReader::<CategoryRecord>::open("/definitely/not/here.csv");
        assert!(matches!(result, Err(ImportError::Open { .. })));
    }

    #[test]
    fn test_reopening_restarts_the_file() {
        let file = source("CAT01|One|ACTIVE\n");
        for _ in 0..2 {
            let mut reader = DelimitedReader::<CategoryRecord>::open(file.path()).unwrap();
            assert_eq!(reader.next().unwrap().unwrap().code, "CAT01");
        }
    }
}
