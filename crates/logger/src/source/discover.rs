//! Serial port discovery for `port = "auto"`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{DeviceSource, LineSource, SourceError, SourceEvent};
use crate::parser::detector::FormatDetectorOrchestrator;

/// Device name prefixes under `/dev` that may carry an anemometer.
const PORT_PREFIXES: [&str; 3] = ["ttyUSB", "ttyACM", "ttyS"];

/// Tagged codes the anemometer emits on every line.
const TRISONICA_CUES: [&str; 6] = ["S ", "S2", "D ", "T ", "U ", "V "];

pub fn candidate_ports() -> Vec<PathBuf> {
    candidate_ports_in(Path::new("/dev"))
}

/// Serial device candidates under `root`: matching devices sorted, then
/// `serial/by-id` links sorted, minus links that resolve to a device
/// already listed.
pub fn candidate_ports_in(root: &Path) -> Vec<PathBuf> {
    let mut ports: Vec<PathBuf> = list_dir(root)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| PORT_PREFIXES.iter().any(|prefix| name.starts_with(prefix)))
        })
        .collect();
    ports.sort();

    let mut by_id = list_dir(&root.join("serial").join("by-id"));
    by_id.sort();
    ports.extend(by_id);

    let mut seen = HashSet::new();
    ports.retain(|path| seen.insert(std::fs::canonicalize(path).unwrap_or_else(|_| path.clone())));
    ports
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}

/// Whether probe output carries tagged anemometer parameters.
pub fn looks_like_trisonica<S: AsRef<str>>(lines: &[S]) -> bool {
    lines
        .iter()
        .any(|line| TRISONICA_CUES.iter().any(|cue| line.as_ref().contains(cue)))
}

/// Read up to `probe_lines` lines from `source`.
pub async fn probe(source: &mut dyn LineSource, probe_lines: usize) -> Result<Vec<String>, SourceError> {
    let mut lines = Vec::with_capacity(probe_lines);
    let mut timeouts = 0;
    while lines.len() < probe_lines && timeouts < probe_lines {
        match source.read_line().await? {
            SourceEvent::Line(line) => {
                let text = line.text();
                if !text.trim().is_empty() {
                    lines.push(text.into_owned());
                }
            }
            SourceEvent::Timeout => timeouts += 1,
            SourceEvent::Closed => break,
        }
    }
    Ok(lines)
}

/// Resolve the configured port, probing candidates when it is `auto`.
pub async fn resolve_port(
    port: &str,
    baud_rate: u32,
    read_timeout: Duration,
    probe_lines: usize,
) -> Result<PathBuf, SourceError> {
    if !port.eq_ignore_ascii_case("auto") {
        return Ok(PathBuf::from(port));
    }

    let candidates = candidate_ports();
    info!(count = candidates.len(), "Probing serial ports");
    let detectors = FormatDetectorOrchestrator::new();

    for path in candidates {
        let mut source = match DeviceSource::open(&path, baud_rate, read_timeout) {
            Ok(source) => source,
            Err(e) => {
                debug!(error = %e, "Skipping port");
                continue;
            }
        };

        let lines = probe(&mut source, probe_lines).await;
        source.close();
        match lines {
            Ok(lines) if looks_like_trisonica(&lines) => {
                let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
                let detected = detectors.detect_multi(&refs);
                info!(path = %path.display(), format = %detected.format, "Found anemometer");
                return Ok(path);
            }
            Ok(lines) => debug!(path = %path.display(), lines = lines.len(), "No anemometer output"),
            Err(e) => warn!(path = %path.display(), error = %e, "Probe failed"),
        }
    }

    Err(SourceError::NoPortFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FakeSource;

    #[test]
    fn test_cues() {
        assert!(looks_like_trisonica(&["S 01.23 D 180 T 21.5"]));
        assert!(looks_like_trisonica(&["garbage", "S2 11.89"]));
        assert!(!looks_like_trisonica(&["AT+OK", "hello"]));
        assert!(!looks_like_trisonica::<&str>(&[]));
    }

    #[test]
    fn test_candidates_filtered_and_sorted() {
        let root = tempfile::tempdir().unwrap();
        for name in ["ttyUSB1", "ttyUSB0", "ttyACM0", "ttyS0", "null", "tty0"] {
            std::fs::write(root.path().join(name), b"").unwrap();
        }
        let by_id = root.path().join("serial").join("by-id");
        std::fs::create_dir_all(&by_id).unwrap();
        std::os::unix::fs::symlink(root.path().join("ttyUSB0"), by_id.join("usb-FTDI-if00")).unwrap();
        std::fs::write(by_id.join("usb-Other-if00"), b"").unwrap();

        let names: Vec<String> = candidate_ports_in(root.path())
            .iter()
            .map(|p| p.strip_prefix(root.path()).unwrap().display().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "ttyACM0",
                "ttyS0",
                "ttyUSB0",
                "ttyUSB1",
                "serial/by-id/usb-Other-if00",
            ]
        );
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        assert!(candidate_ports_in(Path::new("/nonexistent/dev")).is_empty());
    }

    #[tokio::test]
    async fn test_probe_stops_at_limit() {
        let mut source = FakeSource::from_lines(["S 1.0", "", "S 2.0", "S 3.0"]);
        let lines = probe(&mut source, 2).await.unwrap();
        assert_eq!(lines, vec!["S 1.0", "S 2.0"]);
    }

    #[tokio::test]
    async fn test_probe_gives_up_on_silence() {
        let mut source = FakeSource::new().timeouts(5).then_hang();
        let lines = probe(&mut source, 3).await.unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_port_is_not_probed() {
        let path = resolve_port("/dev/ttyUSB7", 115200, Duration::from_millis(10), 10).await.unwrap();
        assert_eq!(path, PathBuf::from("/dev/ttyUSB7"));
    }
}
