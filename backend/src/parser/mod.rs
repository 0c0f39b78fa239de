//! CSV reader and writer with encoding and delimiter auto-detection.
//!
//! Turns raw CSV bytes into a [`Table`] of typed cells (empty and NA-like
//! values become nulls, numbers become numeric cells) and serializes tables
//! back to CSV text for export.

use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{Cell, Table};

/// Values read as missing, compared after trimming.
const NULL_MARKERS: [&str; 12] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "<NA>", "#N/A", "-",
];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub table: Table,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Classify one raw field.
pub fn parse_cell(raw: &str) -> Cell {
    let value = raw.trim();
    if NULL_MARKERS.contains(&value) {
        return Cell::Null;
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Text(value.to_string()),
    }
}

fn delimiter_byte(delimiter: char) -> CsvResult<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(CsvError::InvalidDelimiter(delimiter))
}

/// Parse CSV text with an explicit delimiter.
///
/// Empty lines are skipped, short rows are padded with nulls and extra
/// fields are ignored.
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<Table> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(parse_cell).collect());
    }

    Ok(Table::from_rows(headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        headers: table.column_names(),
        table,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

// =============================================================================
// Writing
// =============================================================================

/// Serialize a table as CSV text; nulls are written as empty fields.
pub fn write_csv(table: &Table, delimiter: char) -> CsvResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .from_writer(Vec::new());

    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|e| CsvError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

impl Table {
    /// Comma-separated export of the table.
    pub fn to_csv_string(&self) -> CsvResult<String> {
        write_csv(self, ',')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    #[test]
    fn test_simple_csv() {
        let table = parse_str("name;age\nAlice;30\nBob;25", ';').unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["name", "age"]);
        assert_eq!(table.columns[0].cells[0], Cell::Text("Alice".into()));
        assert_eq!(table.columns[1].cells[1], Cell::Number(25.0));
    }

    #[test]
    fn test_quoted_values() {
        let csv = r#"name,value
"Alice","Hello, World""#;
        let table = parse_str(csv, ',').unwrap();
        assert_eq!(table.columns[1].cells[0], Cell::Text("Hello, World".into()));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_str("a;b\n1;2\n\n3;4\n", ';').unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_missing_values_are_null() {
        let table = parse_str("a;b;c\n1;;NA\n2", ';').unwrap();
        assert_eq!(table.columns[1].cells[0], Cell::Null);
        assert_eq!(table.columns[2].cells[0], Cell::Null);
        // short row padded
        assert_eq!(table.columns[2].cells[1], Cell::Null);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let table = parse_str("a;b\n1;2;3;4", ';').unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.columns[1].cells[0], Cell::Number(2.0));
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", ';'), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_str("a", '€'), Err(CsvError::InvalidDelimiter('€'))));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto(b"name;age\nAlice;30\nBob;25").unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.table.row_count(), 2);
        assert_eq!(result.headers, vec!["name", "age"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell(" 3.5 "), Cell::Number(3.5));
        assert_eq!(parse_cell("-"), Cell::Null);
        assert_eq!(parse_cell("inf"), Cell::Text("inf".into()));
        assert_eq!(parse_cell("x1"), Cell::Text("x1".into()));
    }

    #[test]
    fn test_write_round_trip() {
        let table = Table::new(vec![
            Column::numeric("a", &[Some(1.0), None, Some(0.1)]),
            Column::text("b", &[Some("x,y"), Some("z"), None]),
        ]);
        let csv = table.to_csv_string().unwrap();
        assert_eq!(csv.lines().nth(1), Some("1,\"x,y\""));
        assert_eq!(csv.lines().nth(2), Some(",z"));

        let parsed = parse_str(&csv, ',').unwrap();
        assert_eq!(parsed, table);
    }
}
