/// Per-family detectors and tokenizers

pub mod tagged;
pub mod csv_header;
pub mod document;

pub use tagged::{TaggedDetector, TaggedTokenizer};
pub use csv_header::{CsvDetector, CsvTokenizer};
pub use document::{DocumentDetector, DocumentTokenizer};

use crate::parser::traits::*;

/// Tokenizer for each wire format family, dispatched through [`Tokenize`].
#[derive(Debug)]
pub enum FormatTokenizer {
    CommaTagged(TaggedTokenizer),
    CsvHeader(CsvTokenizer),
    StructuredDoc(DocumentTokenizer),
}

impl FormatTokenizer {
    /// Fresh tokenizer for `format`; `None` for [`WireFormat::Unknown`].
    pub fn for_format(format: WireFormat) -> Option<Self> {
        match format {
            WireFormat::CommaTagged => Some(Self::CommaTagged(TaggedTokenizer)),
            WireFormat::CsvHeader => Some(Self::CsvHeader(CsvTokenizer::new())),
            WireFormat::StructuredDoc => Some(Self::StructuredDoc(DocumentTokenizer)),
            WireFormat::Unknown => None,
        }
    }
}

impl Tokenize for FormatTokenizer {
    fn tokenize(&mut self, line: &str) -> Result<LineTokens, ParseError> {
        match self {
            Self::CommaTagged(t) => t.tokenize(line),
            Self::CsvHeader(t) => t.tokenize(line),
            Self::StructuredDoc(t) => t.tokenize(line),
        }
    }

    fn format(&self) -> WireFormat {
        match self {
            Self::CommaTagged(t) => t.format(),
            Self::CsvHeader(t) => t.format(),
            Self::StructuredDoc(t) => t.format(),
        }
    }
}

/// Parameter codes look like identifiers: `S`, `S2`, `PI`, `wind_dir`.
pub(crate) fn is_code(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn is_numeric(token: &str) -> bool {
    token
        .trim()
        .parse::<f64>()
        .map(|v| v.is_finite())
        .unwrap_or(false)
}
