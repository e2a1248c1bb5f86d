/// Line tokenizer for anemometer telemetry
///
/// Turns one line of device output into ordered `(code, raw-token)` pairs
/// without knowing the wire format in advance.
///
/// # Architecture
///
/// - `traits.rs`: Detector and tokenizer traits
/// - `detector.rs`: Picks the format family of a line from structural cues
/// - `formats/`: Per-family detectors and tokenizers
/// - `tokenizer.rs`: Per-session dispatcher holding tokenizer state
/// - `metrics.rs`: Line and skip counters

pub mod traits;
pub mod detector;
pub mod formats;
pub mod metrics;
pub mod model;
pub mod tokenizer;

// Re-export commonly used types
pub use model::{DetectionResult, LineTokens, ParseError, TokenPair, Tokenized, WireFormat};
pub use tokenizer::LineTokenizer;
pub use metrics::{MetricsSnapshot, ParsingMetrics};

// Constants
pub const MAX_LINE_SIZE: usize = 65_536; // 64KB
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.90;
