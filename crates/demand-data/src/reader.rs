//! CSV source discovery and loading.
//!
//! Raw billing exports are read into [`RawTable`]s: the header row plus every
//! cell as text. Typing and schema alignment happen later in the normalizer.

use std::path::{Path, PathBuf};

use demand_core::error::{DemandError, Result};
use tracing::{debug, info, warn};

/// One source file as untyped text cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// File the table was read from; empty for in-memory tables.
    pub source: PathBuf,
    pub headers: Vec<String>,
    /// Each row has exactly `headers.len()` cells. Empty text is a missing value.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            source: PathBuf::new(),
            headers,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `data_path`, sorted by path.
pub fn find_csv_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read every CSV source under `data_path`.
///
/// A file that cannot be read is a hard error for the whole load; callers
/// that want to exclude bad files must do so before calling.
pub fn load_sources(data_path: &Path) -> Result<Vec<RawTable>> {
    if !data_path.exists() {
        return Err(DemandError::DataPathNotFound(data_path.to_path_buf()));
    }

    let files = find_csv_files(data_path);
    if files.is_empty() {
        return Err(DemandError::NoDataFiles(data_path.to_path_buf()));
    }

    info!("Loading raw data from {} spreadsheets", files.len());
    let tables = files
        .iter()
        .map(|path| read_source(path))
        .collect::<Result<Vec<_>>>()?;

    let rows: usize = tables.iter().map(RawTable::len).sum();
    debug!("Read {} rows from {} files", rows, tables.len());
    Ok(tables)
}

/// Read one CSV file.
///
/// Cells are trimmed and decoded as UTF-8 when valid, otherwise as
/// ISO-8859-1. Short rows are padded with empty cells and long rows are cut
/// to the header width.
pub fn read_source(path: &Path) -> Result<RawTable> {
    let source_err = |source: csv::Error| DemandError::SourceRead {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(source_err)?;

    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(source_err)?
        .iter()
        .map(decode_cell)
        .collect();
    let width = headers.len();

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let record = result.map_err(source_err)?;
        let mut row: Vec<String> = record.iter().take(width).map(decode_cell).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    debug!("File {}: {} rows, {} columns", path.display(), rows.len(), width);

    Ok(RawTable {
        source: path.to_path_buf(),
        headers,
        rows,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1 maps each byte straight onto the matching code point.
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    // ── find_csv_files ────────────────────────────────────────────────────────

    #[test]
    fn test_find_csv_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("quarterly");
        std::fs::create_dir_all(&sub).unwrap();
        write_csv(dir.path(), "b.csv", &["A"]);
        write_csv(&sub, "a.csv", &["A"]);
        write_csv(dir.path(), "notes.txt", &["ignored"]);

        let files = find_csv_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0] < files[1]);
        assert!(files.iter().all(|p| p.extension().unwrap() == "csv"));
    }

    #[test]
    fn test_find_csv_files_nonexistent_path() {
        let files = find_csv_files(Path::new("/tmp/does-not-exist-demand-test-xyz"));
        assert!(files.is_empty());
    }

    // ── read_source ───────────────────────────────────────────────────────────

    #[test]
    fn test_read_source_basic() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "q1.csv",
            &[
                "CONTRACT_ACCOUNT,EFFECTIVE_DATE,END_DATE,CONSUMPTION",
                "A1, 2023-01-01 ,2023-01-10,100",
            ],
        );

        let table = read_source(&path).unwrap();
        assert_eq!(table.headers.len(), 4);
        assert_eq!(table.rows, vec![vec!["A1", "2023-01-01", "2023-01-10", "100"]]);
        assert_eq!(table.source, path);
    }

    #[test]
    fn test_read_source_pads_and_truncates_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(dir.path(), "ragged.csv", &["A,B,C", "1", "1,2,3,4"]);

        let table = read_source(&path).unwrap();
        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_read_source_latin1_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.csv");
        // "Résidentiel" encoded as ISO-8859-1.
        let mut bytes = b"RES_TYPE\nR".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"sidentiel\n");
        std::fs::write(&path, bytes).unwrap();

        let table = read_source(&path).unwrap();
        assert_eq!(table.rows[0][0], "Résidentiel");
    }

    #[test]
    fn test_read_source_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = read_source(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, DemandError::SourceRead { .. }));
    }

    // ── load_sources ──────────────────────────────────────────────────────────

    #[test]
    fn test_load_sources_reads_all_files() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "a.csv", &["X", "1", "2"]);
        write_csv(dir.path(), "b.csv", &["X", "3"]);

        let tables = load_sources(dir.path()).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].len() + tables[1].len(), 3);
    }

    #[test]
    fn test_load_sources_missing_dir() {
        let err = load_sources(Path::new("/tmp/does-not-exist-demand-test-xyz")).unwrap_err();
        assert!(matches!(err, DemandError::DataPathNotFound(_)));
    }

    #[test]
    fn test_load_sources_empty_dir() {
        let dir = TempDir::new().unwrap();
        let err = load_sources(dir.path()).unwrap_err();
        assert!(matches!(err, DemandError::NoDataFiles(_)));
    }
}
