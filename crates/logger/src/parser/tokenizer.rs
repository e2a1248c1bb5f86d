//! Line tokenizer: sniff the wire format of each line, then hand it to
//! that family's tokenizer.
//!
//! Detection runs on every line. The device keeps one format per session,
//! but a CSV stream starts with a header and captured files may mix
//! boot chatter with data, so nothing is locked in up front.

use std::collections::HashMap;

use tracing::{info, warn};

use super::detector::FormatDetectorOrchestrator;
use super::formats::FormatTokenizer;
use super::traits::*;
use super::MAX_LINE_SIZE;

pub struct LineTokenizer {
    detectors: FormatDetectorOrchestrator,
    tokenizers: HashMap<WireFormat, FormatTokenizer>,
    session_format: Option<WireFormat>,
}

impl LineTokenizer {
    pub fn new() -> Self {
        Self {
            detectors: FormatDetectorOrchestrator::new(),
            tokenizers: HashMap::new(),
            session_format: None,
        }
    }

    /// Format of the most recent successfully tokenized line.
    pub fn session_format(&self) -> Option<WireFormat> {
        self.session_format
    }

    /// Split one line into code/value pairs.
    ///
    /// Never panics on malformed input; every failure is a [`ParseError`]
    /// the caller counts as a skipped line.
    pub fn tokenize(&mut self, line: &str) -> Result<Tokenized, ParseError> {
        if line.len() > MAX_LINE_SIZE {
            return Err(ParseError::LineTooLarge(line.len(), MAX_LINE_SIZE));
        }

        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let detection = self.detectors.detect(line);
        if !detection.is_match() {
            return Err(ParseError::UnrecognizedFormat);
        }

        let format = detection.format;
        let tokenizer = match self.tokenizers.entry(format) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let fresh = FormatTokenizer::for_format(format).ok_or(ParseError::UnrecognizedFormat)?;
                e.insert(fresh)
            }
        };

        let tokens = tokenizer.tokenize(line)?;
        self.note_format(format);
        Ok(Tokenized { format, tokens })
    }

    fn note_format(&mut self, format: WireFormat) {
        match self.session_format {
            None => info!("Detected wire format: {}", format),
            Some(previous) if previous != format => {
                warn!("Wire format changed mid-session: {} -> {}", previous, format)
            }
            _ => {}
        }
        self.session_format = Some(format);
    }
}

impl Default for LineTokenizer {
    fn default() -> Self {
        Self::new()
    }
}
