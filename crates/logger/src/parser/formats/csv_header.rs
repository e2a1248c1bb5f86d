use csv::{ReaderBuilder, StringRecord, Trim};

use super::{is_code, is_numeric};
use crate::parser::traits::*;

/// Header names that mark the timestamp column; excluded from the pairs.
const TIMESTAMP_COLUMNS: [&str; 2] = ["time", "timestamp"];

/// Detects plain CSV: comma separated single-token cells, introduced by a
/// header whose first cell is `Time`/`timestamp` or whose cells are all codes.
pub struct CsvDetector;

impl FormatDetector for CsvDetector {
    fn detect(&self, line: &str) -> DetectionResult {
        let trimmed = line.trim();
        if !trimmed.contains(',') || trimmed.starts_with('{') || trimmed.starts_with('[') {
            return DetectionResult::no_match();
        }

        let cells = match split_cells(trimmed) {
            Some(cells) if cells.len() >= 2 => cells,
            _ => return DetectionResult::no_match(),
        };

        // "S 3.2" cells belong to the tagged family
        if cells.iter().any(|c| is_tagged_cell(c)) {
            return DetectionResult::no_match();
        }

        if is_header(&cells) {
            return DetectionResult::new(WireFormat::CsvHeader, 0.85);
        }

        if cells.iter().any(|c| is_numeric(c)) {
            return DetectionResult::new(WireFormat::CsvHeader, 0.5);
        }

        DetectionResult::no_match()
    }

    fn format(&self) -> WireFormat {
        WireFormat::CsvHeader
    }
}

/// Stateful CSV tokenizer: the most recent header names the columns of
/// every following data line.
#[derive(Debug, Default)]
pub struct CsvTokenizer {
    header: Option<Vec<String>>,
    timestamp_column: Option<usize>,
}

impl CsvTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Once a header is held, a header-shaped line replaces it only when it
    /// leads with a timestamp column or changes the column count; anything
    /// else is data in the current layout.
    fn is_new_header(&self, cells: &[String]) -> bool {
        if !is_header(cells) {
            return false;
        }
        match &self.header {
            None => true,
            Some(current) => is_timestamp_column(&cells[0]) || cells.len() != current.len(),
        }
    }
}

impl Tokenize for CsvTokenizer {
    fn tokenize(&mut self, line: &str) -> Result<LineTokens, ParseError> {
        let cells = split_cells(line.trim()).ok_or(ParseError::NoPairs)?;

        if self.is_new_header(&cells) {
            self.timestamp_column = cells.iter().position(|c| is_timestamp_column(c));
            let width = cells.len();
            self.header = Some(cells);
            return Ok(LineTokens::Header(width));
        }

        let header = self.header.as_ref().ok_or(ParseError::MissingHeader)?;
        if cells.len() != header.len() {
            return Err(ParseError::ColumnMismatch {
                expected: header.len(),
                found: cells.len(),
            });
        }

        let pairs: Vec<TokenPair> = header
            .iter()
            .zip(cells)
            .enumerate()
            .filter(|(i, (_, cell))| Some(*i) != self.timestamp_column && !cell.is_empty())
            .map(|(_, (code, cell))| TokenPair::new(code.clone(), cell))
            .collect();

        if pairs.is_empty() {
            return Err(ParseError::NoPairs);
        }
        Ok(LineTokens::Pairs(pairs))
    }

    fn format(&self) -> WireFormat {
        WireFormat::CsvHeader
    }
}

/// Split one line into trimmed cells, honouring CSV quoting.
fn split_cells(line: &str) -> Option<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Some(record.iter().map(str::to_string).collect()),
        _ => None,
    }
}

fn is_timestamp_column(cell: &str) -> bool {
    TIMESTAMP_COLUMNS.iter().any(|name| cell.eq_ignore_ascii_case(name))
}

fn is_header(cells: &[String]) -> bool {
    if cells.len() < 2 || cells.iter().any(|c| is_numeric(c)) {
        return false;
    }
    let mut seen = std::collections::HashSet::new();
    if !cells.iter().all(|c| seen.insert(c.as_str())) {
        return false;
    }
    is_timestamp_column(&cells[0]) || cells.iter().all(|c| is_code(c))
}

fn is_tagged_cell(cell: &str) -> bool {
    let mut parts = cell.splitn(2, char::is_whitespace);
    match (parts.next(), parts.next()) {
        (Some(code), Some(value)) => is_code(code) && is_numeric(value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(tokens: LineTokens) -> Vec<(String, String)> {
        match tokens {
            LineTokens::Pairs(p) => p.into_iter().map(|p| (p.code, p.raw)).collect(),
            other => panic!("expected pairs, got {:?}", other),
        }
    }

    // ── Detection ───────────────────────────────────────────────

    #[test]
    fn test_detects_header_line() {
        for line in ["timestamp,S,T,H", "Time,S,D", "S,T,H,D"] {
            let result = CsvDetector.detect(line);
            assert_eq!(result.format, WireFormat::CsvHeader, "{}", line);
            assert!(result.confidence >= 0.85);
        }
    }

    #[test]
    fn test_detects_data_line_with_lower_confidence() {
        let result = CsvDetector.detect("2026-01-01T00:00:00.000000Z,3.2,21.5,,55.0");
        assert_eq!(result.format, WireFormat::CsvHeader);
        assert!(result.confidence < 0.85);
    }

    #[test]
    fn test_leaves_tagged_and_json_alone() {
        for line in ["S 3.2, T 21.5", "{\"S\":1,\"T\":2}", "[12:00:00] ,S 1.0, T 2.0", "no commas here"] {
            assert!(!CsvDetector.detect(line).is_match(), "{}", line);
        }
    }

    // ── Tokenizing ──────────────────────────────────────────────

    #[test]
    fn test_header_then_data() {
        let mut tok = CsvTokenizer::new();
        assert_eq!(tok.tokenize("timestamp,S,T,H").unwrap(), LineTokens::Header(4));

        let got = pairs(tok.tokenize("2026-01-01T00:00:00Z,3.2,21.5,55.0").unwrap());
        assert_eq!(got, vec![
            ("S".to_string(), "3.2".to_string()),
            ("T".to_string(), "21.5".to_string()),
            ("H".to_string(), "55.0".to_string()),
        ]);
    }

    #[test]
    fn test_blank_cells_are_absent() {
        let mut tok = CsvTokenizer::new();
        tok.tokenize("Time,S,T,D").unwrap();
        let got = pairs(tok.tokenize("12:00:00,3.4,,180").unwrap());
        let codes: Vec<&str> = got.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(codes, vec!["S", "D"]);
    }

    #[test]
    fn test_header_without_timestamp_column() {
        let mut tok = CsvTokenizer::new();
        tok.tokenize("S,T").unwrap();
        let got = pairs(tok.tokenize("1.0,2.0").unwrap());
        assert_eq!(got.len(), 2);
        assert_eq!(tok.header().unwrap(), &["S".to_string(), "T".to_string()]);
    }

    #[test]
    fn test_data_before_header_is_rejected() {
        let mut tok = CsvTokenizer::new();
        assert_eq!(tok.tokenize("1.0,2.0"), Err(ParseError::MissingHeader));
    }

    #[test]
    fn test_column_mismatch() {
        let mut tok = CsvTokenizer::new();
        tok.tokenize("timestamp,S,T").unwrap();
        assert_eq!(
            tok.tokenize("t,1.0"),
            Err(ParseError::ColumnMismatch { expected: 3, found: 2 })
        );
    }

    #[test]
    fn test_new_header_replaces_old() {
        let mut tok = CsvTokenizer::new();
        tok.tokenize("timestamp,S").unwrap();
        tok.tokenize("timestamp,S,T").unwrap();
        let got = pairs(tok.tokenize("t,1.0,2.0").unwrap());
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_repeated_words_are_not_a_header() {
        let mut tok = CsvTokenizer::new();
        tok.tokenize("timestamp,S,T").unwrap();
        let got = pairs(tok.tokenize("t,ERR,ERR").unwrap());
        assert_eq!(got[0], ("S".to_string(), "ERR".to_string()));
        assert_eq!(tok.header().unwrap().len(), 3);
    }

    #[test]
    fn test_word_only_data_row_keeps_header() {
        let mut tok = CsvTokenizer::new();
        tok.tokenize("Time,S,T").unwrap();
        tok.tokenize("12:00:00,1.0,20.0").unwrap();

        let got = pairs(tok.tokenize("t,ERR,NA").unwrap());
        assert_eq!(got, vec![
            ("S".to_string(), "ERR".to_string()),
            ("T".to_string(), "NA".to_string()),
        ]);
        assert_eq!(tok.header().unwrap(), &["Time".to_string(), "S".to_string(), "T".to_string()]);

        let got = pairs(tok.tokenize("12:00:01,1.1,20.1").unwrap());
        assert_eq!(got[0], ("S".to_string(), "1.1".to_string()));
    }

    #[test]
    fn test_header_with_different_width_replaces_old() {
        let mut tok = CsvTokenizer::new();
        tok.tokenize("S,T").unwrap();
        assert_eq!(tok.tokenize("S,T,H").unwrap(), LineTokens::Header(3));
        assert_eq!(tok.header().unwrap().len(), 3);
    }

    #[test]
    fn test_quoted_cells() {
        let mut tok = CsvTokenizer::new();
        tok.tokenize("timestamp,S,T").unwrap();
        let got = pairs(tok.tokenize("\"2026-01-01 00:00:00\",\"3.2\",21.5").unwrap());
        assert_eq!(got[0], ("S".to_string(), "3.2".to_string()));
    }
}
