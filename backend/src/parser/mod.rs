//! CSV reader with encoding and delimiter auto-detection.
//!
//! Turns uploaded bytes into a header plus one JSON object per data row.
//! Missing cells are stored as `null`; everything else stays a string.
//! No deal-specific logic here.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// Cell values read as missing, in addition to blank cells.
pub const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "#N/A", "<NA>",
];

/// Whether a raw cell holds no value.
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_TOKENS.contains(&trimmed)
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// One JSON object per data row, keyed by header
    pub records: Vec<Value>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers, unique
    pub headers: Vec<String>,
}

impl ParseResult {
    /// Raw value of `column` in data row `index` (0-based), `None` when missing.
    pub fn cell(&self, index: usize, column: &str) -> Option<&str> {
        self.records
            .get(index)
            .and_then(|row| row.get(column))
            .and_then(|v| v.as_str())
    }

    /// Whether the header contains `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }
}

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 is always reported as UTF-8; chardet is only consulted for
/// anything else.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
///
/// Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => decoded,
    }
}

/// Delimiters tried by [`detect_delimiter`], in tie-break order.
pub const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Data rows sampled per candidate when detecting the delimiter.
const DELIMITER_SAMPLE_ROWS: usize = 20;

/// Detect the delimiter by tokenising the first rows with each candidate.
///
/// A candidate scores by how many sampled data rows have exactly as many
/// fields as its header, then by header width. It needs at least two header
/// fields to qualify. Quoted separators are not counted. Comma wins ties and
/// is used when no candidate qualifies.
pub fn detect_delimiter(content: &str) -> char {
    let mut best_sep = ',';
    let mut best_score = None;

    for sep in DELIMITER_CANDIDATES {
        let score = delimiter_score(content, sep);
        if score > best_score {
            best_score = score;
            best_sep = sep;
        }
    }

    best_sep
}

/// `(consistent data rows, header width)` for one candidate delimiter.
fn delimiter_score(content: &str, sep: char) -> Option<(usize, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sep as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = reader
        .records()
        .take(DELIMITER_SAMPLE_ROWS + 1)
        .filter_map(Result::ok);

    let width = rows.next()?.len();
    if width < 2 {
        return None;
    }
    let consistent = rows.filter(|r| r.len() == width).count();

    Some((consistent, width))
}

/// Check that every quoted field is closed.
///
/// The `csv` reader runs an unterminated quoted field to end of input
/// without reporting an error. A quote only opens a field when it is the
/// field's first character. `""` inside a quoted field is an escaped quote.
pub fn check_quotes(content: &str, delimiter: char) -> CsvResult<()> {
    let mut line: u64 = 1;
    let mut opened_at: Option<u64> = None;
    let mut at_field_start = true;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if opened_at.is_some() {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                }
                '"' => opened_at = None,
                '\n' => line += 1,
                _ => {}
            }
            continue;
        }

        match c {
            '"' if at_field_start => {
                opened_at = Some(line);
                at_field_start = false;
            }
            '\n' => {
                line += 1;
                at_field_start = true;
            }
            '\r' => at_field_start = true,
            c if c == delimiter => at_field_start = true,
            _ => at_field_start = false,
        }
    }

    match opened_at {
        Some(line) => Err(CsvError::Malformed {
            line,
            message: "quoted field is never closed".to_string(),
        }),
        None => Ok(()),
    }
}

/// Parse CSV text with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use fundcount::parser::parse_str;
///
/// let csv = "Deal,Investors\nD1,\"A, B\"";
/// let result = parse_str(csv, ',', "utf-8".into()).unwrap();
///
/// assert_eq!(result.headers, vec!["Deal", "Investors"]);
/// assert_eq!(result.records[0]["Investors"], "A, B");
/// ```
pub fn parse_str(content: &str, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    if !delimiter.is_ascii() {
        return Err(CsvError::InvalidDelimiter(delimiter));
    }
    if content.trim().is_empty() {
        return Err(CsvError::EmptyInput);
    }
    check_quotes(content, delimiter)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let raw_headers = reader.headers().map_err(malformed)?.clone();
    if raw_headers.iter().all(|h| h.trim().is_empty()) {
        return Err(CsvError::NoColumns);
    }
    let headers = unique_headers(raw_headers.iter());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(malformed)?;

        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(CsvError::Malformed {
                line,
                message: format!("expected {} fields, found {}", headers.len(), record.len()),
            });
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = match record.get(i) {
                Some(raw) if !is_missing(raw) => Value::String(raw.to_string()),
                _ => Value::Null,
            };
            obj.insert(header.clone(), value);
        }
        records.push(Value::Object(obj));
    }

    if records.is_empty() {
        return Err(CsvError::EmptyInput);
    }

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse CSV bytes, detecting encoding and (unless given) delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyInput);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    parse_str(&content, delimiter, encoding)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    parse_bytes(bytes, None)
}

/// Parse a CSV file, detecting encoding and (unless given) delimiter.
pub fn parse_csv_file<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, delimiter)
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    parse_csv_file(path, None)
}

/// Trim header names, name blank ones `Unnamed: N` and suffix repeats `.1`, `.2`, ...
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for (i, name) in raw.enumerate() {
        let base = match name.trim() {
            "" => format!("Unnamed: {}", i),
            trimmed => trimmed.to_string(),
        };

        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }

        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

fn malformed(err: csv::Error) -> CsvError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    CsvError::Malformed {
        line,
        message: err.to_string(),
    }
}
