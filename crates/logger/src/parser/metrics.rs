use serde::Serialize;

use super::{ParseError, WireFormat};

/// Lines tokenized per wire format family
#[derive(Debug, Default, Clone)]
pub struct FormatMetrics {
    pub comma_tagged: u64,
    pub csv_header: u64,
    pub structured_doc: u64,
}

/// Skipped lines by reason
#[derive(Debug, Default, Clone)]
pub struct SkipMetrics {
    pub too_large: u64,
    pub unrecognized: u64,
    pub missing_header: u64,
    pub column_mismatch: u64,
    pub invalid_document: u64,
    pub no_pairs: u64,
}

impl SkipMetrics {
    fn total(&self) -> u64 {
        self.too_large
            + self.unrecognized
            + self.missing_header
            + self.column_mismatch
            + self.invalid_document
            + self.no_pairs
    }
}

/// Tokenizer counters for one session.
///
/// Owned by the pipeline and updated once per line, so plain counters
/// suffice.
#[derive(Debug, Default)]
pub struct ParsingMetrics {
    pub lines: u64,
    pub blank: u64,
    pub headers: u64,
    pub formats: FormatMetrics,
    pub skipped: SkipMetrics,
}

impl ParsingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a data-bearing line
    pub fn record_parse(&mut self, format: WireFormat) {
        self.lines += 1;
        match format {
            WireFormat::CommaTagged => self.formats.comma_tagged += 1,
            WireFormat::CsvHeader => self.formats.csv_header += 1,
            WireFormat::StructuredDoc => self.formats.structured_doc += 1,
            WireFormat::Unknown => {}
        }
    }

    pub fn record_header(&mut self) {
        self.lines += 1;
        self.headers += 1;
    }

    /// Record a skipped line. Blank lines are counted apart from skips.
    pub fn record_skip(&mut self, error: &ParseError) {
        self.lines += 1;
        match error {
            ParseError::Empty => self.blank += 1,
            ParseError::LineTooLarge(..) => self.skipped.too_large += 1,
            ParseError::UnrecognizedFormat => self.skipped.unrecognized += 1,
            ParseError::MissingHeader => self.skipped.missing_header += 1,
            ParseError::ColumnMismatch { .. } => self.skipped.column_mismatch += 1,
            ParseError::InvalidDocument(_) => self.skipped.invalid_document += 1,
            ParseError::NoPairs => self.skipped.no_pairs += 1,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_lines: self.lines,
            blank_lines: self.blank,
            header_lines: self.headers,
            comma_tagged_lines: self.formats.comma_tagged,
            csv_lines: self.formats.csv_header,
            structured_doc_lines: self.formats.structured_doc,
            skipped_lines: self.skipped.total(),
            lines_too_large: self.skipped.too_large,
            unrecognized_lines: self.skipped.unrecognized,
            missing_header_lines: self.skipped.missing_header,
            column_mismatch_lines: self.skipped.column_mismatch,
            invalid_documents: self.skipped.invalid_document,
            lines_without_pairs: self.skipped.no_pairs,
        }
    }
}

/// A read-only snapshot of tokenizer metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_lines: u64,
    pub blank_lines: u64,
    pub header_lines: u64,

    // Format counts
    pub comma_tagged_lines: u64,
    pub csv_lines: u64,
    pub structured_doc_lines: u64,

    // Skips
    pub skipped_lines: u64,
    pub lines_too_large: u64,
    pub unrecognized_lines: u64,
    pub missing_header_lines: u64,
    pub column_mismatch_lines: u64,
    pub invalid_documents: u64,
    pub lines_without_pairs: u64,
}
