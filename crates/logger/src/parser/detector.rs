use super::traits::*;
use super::formats::*;

/// Format detector orchestrator
/// 1. Per-line detection from structural cues (braces, commas, tagged pairs)
/// 2. Majority vote across several lines when probing an unknown port
pub struct FormatDetectorOrchestrator {
    detectors: Vec<Box<dyn FormatDetector>>,
}

impl FormatDetectorOrchestrator {
    pub fn new() -> Self {
        let detectors: Vec<Box<dyn FormatDetector>> = vec![
            // Order matters! More specific detectors first
            Box::new(DocumentDetector),
            Box::new(TaggedDetector),
            Box::new(CsvDetector),
        ];

        Self { detectors }
    }

    pub fn detect(&self, line: &str) -> DetectionResult {
        let mut best_result = DetectionResult::no_match();

        for detector in &self.detectors {
            let result = detector.detect(line);

            if result.confidence > best_result.confidence {
                best_result = result;
                if best_result.confidence >= 0.99 {
                    break;
                }
            }
        }

        best_result
    }

    pub fn detect_multi(&self, lines: &[&str]) -> DetectionResult {
        if lines.is_empty() {
            return DetectionResult::no_match();
        }

        let results: Vec<DetectionResult> = lines
            .iter()
            .map(|line| self.detect(line))
            .collect();

        self.majority_vote(results)
    }

    fn majority_vote(&self, results: Vec<DetectionResult>) -> DetectionResult {
        use std::collections::HashMap;

        let total_results = results.len();

        let mut votes: HashMap<WireFormat, Vec<f32>> = HashMap::new();
        for result in results.into_iter().filter(DetectionResult::is_match) {
            votes.entry(result.format)
                .or_default()
                .push(result.confidence);
        }

        let mut best_format = WireFormat::Unknown;
        let mut best_score = 0.0f32;

        let mut formats: Vec<_> = votes.keys().cloned().collect();
        formats.sort();

        for format in formats {
            if let Some(confidences) = votes.get(&format) {
                let avg_confidence: f32 = confidences.iter().sum::<f32>() / confidences.len() as f32;
                let score = (confidences.len() as f32 / total_results as f32) * avg_confidence;

                if score > best_score {
                    best_score = score;
                    best_format = format;
                }
            }
        }

        match votes.get(&best_format) {
            Some(c) => DetectionResult::new(best_format, c.iter().sum::<f32>() / c.len() as f32),
            None => DetectionResult::no_match(),
        }
    }
}

impl Default for FormatDetectorOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}
