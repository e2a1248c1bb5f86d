use serde_json::{Map, Value};

use crate::parser::traits::*;

/// Members that carry capture time rather than a measurement.
const TIMESTAMP_KEYS: [&str; 2] = ["time", "timestamp"];

/// Detects one JSON object per line by its braces; the full parse is
/// left to the tokenizer so malformed documents are reported as such.
pub struct DocumentDetector;

impl FormatDetector for DocumentDetector {
    fn detect(&self, line: &str) -> DetectionResult {
        let trimmed = line.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            let confidence = if trimmed.contains(':') { 0.95 } else { 0.7 };
            return DetectionResult::new(WireFormat::StructuredDoc, confidence);
        }
        DetectionResult::no_match()
    }

    fn format(&self) -> WireFormat {
        WireFormat::StructuredDoc
    }
}

#[derive(Debug)]
pub struct DocumentTokenizer;

impl Tokenize for DocumentTokenizer {
    fn tokenize(&mut self, line: &str) -> Result<LineTokens, ParseError> {
        let object: Map<String, Value> = serde_json::from_str(line.trim())
            .map_err(|e| ParseError::InvalidDocument(e.to_string()))?;

        let mut pairs = Vec::new();
        for (key, value) in object {
            let code = key.trim();
            if code.is_empty() || TIMESTAMP_KEYS.iter().any(|k| code.eq_ignore_ascii_case(k)) {
                continue;
            }
            let raw = match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                // nested and non-scalar members are not measurements
                _ => continue,
            };
            pairs.push(TokenPair::new(code, raw));
        }

        if pairs.is_empty() {
            return Err(ParseError::NoPairs);
        }
        Ok(LineTokens::Pairs(pairs))
    }

    fn format(&self) -> WireFormat {
        WireFormat::StructuredDoc
    }
}
