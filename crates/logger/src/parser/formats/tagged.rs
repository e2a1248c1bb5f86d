use super::{is_code, is_numeric};
use crate::parser::traits::*;

/// Detects the tagged family: `S 3.2, T 21.5, H 55.0`, the space-only
/// `S 3.2 T 21.5` variant, and captured lines with a `[timestamp] ,` prefix.
pub struct TaggedDetector;

impl FormatDetector for TaggedDetector {
    fn detect(&self, line: &str) -> DetectionResult {
        let (body, had_prefix) = strip_timestamp_prefix(line);
        let (pairs, segments) = split_pairs(body);

        if pairs.is_empty() || segments == 0 {
            return DetectionResult::no_match();
        }

        // Device chatter ("Mode overriding ...") has codes but no numbers
        if !pairs.iter().any(|p| is_numeric(&p.raw)) {
            return DetectionResult::no_match();
        }

        let ratio = pairs.len() as f32 / segments as f32;
        if ratio < 0.5 {
            return DetectionResult::no_match();
        }

        let mut confidence = 0.5 + 0.4 * ratio;
        if had_prefix {
            confidence += 0.05;
        }
        DetectionResult::new(WireFormat::CommaTagged, confidence)
    }

    fn format(&self) -> WireFormat {
        WireFormat::CommaTagged
    }
}

#[derive(Debug)]
pub struct TaggedTokenizer;

impl Tokenize for TaggedTokenizer {
    fn tokenize(&mut self, line: &str) -> Result<LineTokens, ParseError> {
        let (body, _) = strip_timestamp_prefix(line);
        let (pairs, _) = split_pairs(body);
        if pairs.is_empty() {
            return Err(ParseError::NoPairs);
        }
        Ok(LineTokens::Pairs(pairs))
    }

    fn format(&self) -> WireFormat {
        WireFormat::CommaTagged
    }
}

/// Strip a leading `[...]` capture timestamp and the comma after it.
fn strip_timestamp_prefix(line: &str) -> (&str, bool) {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let body = rest[end + 1..].trim_start();
            let body = body.strip_prefix(',').unwrap_or(body);
            return (body.trim(), true);
        }
    }
    (trimmed, false)
}

/// Returns the well-formed pairs and the number of segments inspected.
fn split_pairs(body: &str) -> (Vec<TokenPair>, usize) {
    let mut pairs = Vec::new();
    let mut segments = 0;

    if body.contains(',') {
        for segment in body.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            segments += 1;

            let mut parts = segment.splitn(2, char::is_whitespace);
            let code = parts.next().unwrap_or("");
            let value = parts.next().map(str::trim).unwrap_or("");
            if is_code(code) && !value.is_empty() {
                pairs.push(TokenPair::new(code, value));
            }
        }
    } else {
        let tokens: Vec<&str> = body.split_whitespace().collect();
        for chunk in tokens.chunks(2) {
            segments += 1;
            if let [code, value] = chunk {
                if is_code(code) {
                    pairs.push(TokenPair::new(*code, *value));
                }
            }
        }
    }

    (pairs, segments)
}
