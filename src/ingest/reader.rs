//! CSV loading with encoding fallback.
//!
//! Public statistics portals publish the same data as plain UTF-8,
//! UTF-8 with a byte-order mark, or CP949. Some exports also carry
//! stray NUL bytes. Everything is decoded to UTF-8 text before the
//! CSV reader sees it.

use crate::error::{AnalysisError, Result};
use csv::{ReaderBuilder, Trim};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Encoding a file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Utf8Bom,
    /// CP949 / EUC-KR, possibly with replacement characters.
    LegacyKorean,
}

/// Decode raw bytes into text.
pub fn decode(bytes: &[u8]) -> (String, SourceEncoding) {
    let (body, bom) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (rest, true),
        None => (bytes, false),
    };

    let cleaned: Vec<u8>;
    let body = if body.contains(&0) {
        cleaned = body.iter().copied().filter(|b| *b != 0).collect();
        debug!("Stripped {} NUL bytes", body.len() - cleaned.len());
        cleaned.as_slice()
    } else {
        body
    };

    if let Ok(text) = std::str::from_utf8(body) {
        let encoding = if bom {
            SourceEncoding::Utf8Bom
        } else {
            SourceEncoding::Utf8
        };
        return (text.to_string(), encoding);
    }

    let (text, _, had_errors) = encoding_rs::EUC_KR.decode(body);
    if had_errors {
        warn!("Input is neither UTF-8 nor clean CP949; undecodable bytes were replaced");
    }
    (text.into_owned(), SourceEncoding::LegacyKorean)
}

/// Every record of a CSV file, header rows included.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub path: PathBuf,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    /// Read and decode a CSV file without interpreting any row as a header.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (text, encoding) = decode(&bytes);
        let table = Self::parse(path, &text)?;

        info!(
            "Loaded {} ({:?}, {} records)",
            path.display(),
            encoding,
            table.records.len()
        );
        Ok(table)
    }

    /// Parse already-decoded CSV text.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|source| AnalysisError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            records.push(record.iter().map(String::from).collect());
        }

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    /// Split into a header (the record at `header_row`) and the data rows after it.
    pub fn with_header_at(self, header_row: usize) -> Result<Frame> {
        if header_row >= self.records.len() {
            return Err(AnalysisError::Schema(format!(
                "{} has {} rows; header expected at row {}",
                self.path.display(),
                self.records.len(),
                header_row
            )));
        }

        let mut records = self.records;
        let rows = records.split_off(header_row + 1);
        let header = records.pop().unwrap_or_default();

        Ok(Frame {
            path: self.path,
            header,
            rows,
        })
    }
}

/// A table with a resolved header row.
#[derive(Debug, Clone)]
pub struct Frame {
    pub path: PathBuf,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Frame {
    /// Load a file whose first record is the header.
    pub fn load(path: &Path) -> Result<Self> {
        RawTable::load(path)?.with_header_at(0)
    }

    /// Position of a named column.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Cell at `(row, column)`; short rows read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn source(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_decode_plain_utf8() {
        let (text, enc) = decode("a,b\n1,2\n".as_bytes());
        assert_eq!(text, "a,b\n1,2\n");
        assert_eq!(enc, SourceEncoding::Utf8);
    }

    #[test]
    fn test_decode_strips_bom_and_nul() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"SUM\0,x\n");
        let (text, enc) = decode(&bytes);
        assert_eq!(text, "SUM,x\n");
        assert_eq!(enc, SourceEncoding::Utf8Bom);
    }

    #[test]
    fn test_decode_cp949_fallback() {
        let (encoded, _, _) = encoding_rs::EUC_KR.encode("종로구,계\n");
        let (text, enc) = decode(&encoded);
        assert_eq!(text, "종로구,계\n");
        assert_eq!(enc, SourceEncoding::LegacyKorean);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RawTable::load(Path::new("/nonexistent/waste.csv")).unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn test_frame_header_at_offset() {
        let text = "title\nunit: 가구\n기간,자치구별(2),2024\n2024,종로구,100\n2024,중구,80\n";
        let raw = RawTable::parse(Path::new("h.csv"), text).unwrap();
        let frame = raw.with_header_at(2).unwrap();

        assert_eq!(frame.header, vec!["기간", "자치구별(2)", "2024"]);
        assert_eq!(frame.rows.len(), 2);
        assert_eq!(frame.column("자치구별(2)").unwrap(), 1);
        assert_eq!(frame.cell(1, 2), "80");
        assert_eq!(frame.cell(5, 0), "");
    }

    #[test]
    fn test_frame_header_out_of_range() {
        let raw = RawTable::parse(Path::new("h.csv"), "a,b\n").unwrap();
        assert!(matches!(raw.with_header_at(3), Err(AnalysisError::Schema(_))));
    }

    #[test]
    fn test_frame_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Year and month,SUM").unwrap();
        writeln!(file, "Jan-19,\"1,000\"").unwrap();

        let frame = Frame::load(file.path()).unwrap();
        assert_eq!(frame.cell(0, 1), "1,000");
        assert!(matches!(
            frame.column("Food Waste"),
            Err(AnalysisError::MissingColumn { .. })
        ));
    }
}
