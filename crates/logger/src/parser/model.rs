use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire format families emitted by the anemometer or by capture tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `S 3.2, T 21.5` (also the space-only `S 3.2 T 21.5` variant)
    CommaTagged,
    /// Plain CSV introduced by a header line
    CsvHeader,
    /// One JSON object per line
    StructuredDoc,
    /// Nothing matched
    Unknown,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::CommaTagged => "comma_tagged",
            WireFormat::CsvHeader => "csv_header",
            WireFormat::StructuredDoc => "structured_doc",
            WireFormat::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub format: WireFormat,
    /// Confidence level (0.0 - 1.0)
    pub confidence: f32,
}

impl DetectionResult {
    pub fn new(format: WireFormat, confidence: f32) -> Self {
        Self {
            format,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn no_match() -> Self {
        Self {
            format: WireFormat::Unknown,
            confidence: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.format != WireFormat::Unknown && self.confidence > 0.0
    }

    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= super::HIGH_CONFIDENCE_THRESHOLD
    }
}

/// One `(code, raw-token)` pair in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub code: String,
    pub raw: String,
}

impl TokenPair {
    pub fn new(code: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            raw: raw.into(),
        }
    }
}

/// What a successfully tokenized line carried.
#[derive(Debug, Clone, PartialEq)]
pub enum LineTokens {
    /// Data-bearing line
    Pairs(Vec<TokenPair>),
    /// A CSV header was consumed; holds the number of columns
    Header(usize),
}

/// Output of [`crate::parser::LineTokenizer::tokenize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tokenized {
    pub format: WireFormat,
    pub tokens: LineTokens,
}

/// Why a line was skipped. Never fatal to the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Empty line")]
    Empty,

    #[error("Line too large: {0} bytes (max: {1} bytes)")]
    LineTooLarge(usize, usize),

    #[error("Unrecognized line format")]
    UnrecognizedFormat,

    #[error("CSV data line before any header")]
    MissingHeader,

    #[error("CSV column count mismatch: expected {expected}, found {found}")]
    ColumnMismatch { expected: usize, found: usize },

    #[error("Invalid structured document: {0}")]
    InvalidDocument(String),

    #[error("No code/value pairs found")]
    NoPairs,
}
