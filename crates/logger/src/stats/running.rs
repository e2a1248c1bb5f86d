use serde::Serialize;

use crate::record::FieldReading;

/// Incremental aggregate for one parameter code.
///
/// Mean and variance use Welford's update so the stream never has to be
/// re-summed; `m2` is the running sum of squared deviations from the mean.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningStat {
    pub code: String,
    pub count_valid: u64,
    pub count_error: u64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    mean: f64,
    m2: f64,
    pub last: Option<f64>,
}

impl RunningStat {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            count_valid: 0,
            count_error: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            mean: 0.0,
            m2: 0.0,
            last: None,
        }
    }

    /// Fold one reading: valid values into the aggregate, anything else
    /// into the error count.
    pub fn update(&mut self, reading: &FieldReading) {
        match (reading.status.is_valid(), reading.value) {
            (true, Some(value)) => self.push(value),
            _ => self.count_error += 1,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.count_valid += 1;
        self.last = Some(value);
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count_valid as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn total(&self) -> u64 {
        self.count_valid + self.count_error
    }

    /// 0 when nothing has been seen.
    pub fn error_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.count_error as f64 / total as f64,
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count_valid > 0).then_some(self.mean)
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        (self.count_valid > 0).then(|| self.m2 / self.count_valid as f64)
    }

    pub fn stddev(&self) -> Option<f64> {
        self.variance().map(|v| v.max(0.0).sqrt())
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        let has_values = self.count_valid > 0;
        ParameterSnapshot {
            code: self.code.clone(),
            count_valid: self.count_valid,
            count_error: self.count_error,
            error_rate: self.error_rate(),
            min: has_values.then_some(self.min),
            max: has_values.then_some(self.max),
            mean: self.mean(),
            stddev: self.stddev(),
            last: self.last,
        }
    }
}

/// Point-in-time view of one [`RunningStat`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSnapshot {
    pub code: String,
    pub count_valid: u64,
    pub count_error: u64,
    pub error_rate: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub last: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        (mean, variance)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_matches_batch_computation() {
        let values = [10.0, 12.0, 8.0, 15.0, 11.0];
        let mut stat = RunningStat::new("S");
        for v in values {
            stat.push(v);
        }

        let (mean, variance) = batch(&values);
        assert!(close(stat.mean().unwrap(), mean));
        assert!(close(stat.variance().unwrap(), variance));
        assert_eq!(stat.min, 8.0);
        assert_eq!(stat.max, 15.0);
        assert!((stat.mean().unwrap() - 11.2).abs() < 1e-12);
    }

    #[test]
    fn test_stable_with_large_offset() {
        // Naive sum-of-squares loses everything here
        let values: Vec<f64> = (0..1000).map(|i| 1.0e9 + (i % 7) as f64 * 0.1).collect();
        let mut stat = RunningStat::new("P");
        for v in &values {
            stat.push(*v);
        }

        let (mean, variance) = batch(&values);
        assert!(close(stat.mean().unwrap(), mean));
        assert!((stat.variance().unwrap() - variance).abs() <= 1e-9 * variance.max(1.0));
    }

    #[test]
    fn test_single_value() {
        let mut stat = RunningStat::new("T");
        stat.push(21.5);
        assert_eq!(stat.mean(), Some(21.5));
        assert_eq!(stat.stddev(), Some(0.0));
        assert_eq!(stat.last, Some(21.5));
    }

    #[test]
    fn test_error_rate_bounds() {
        let mut stat = RunningStat::new("S");
        assert_eq!(stat.error_rate(), 0.0);
        assert_eq!(stat.mean(), None);

        stat.count_error += 1;
        assert_eq!(stat.error_rate(), 1.0);

        stat.push(1.0);
        assert_eq!(stat.error_rate(), 0.5);
    }

    #[test]
    fn test_snapshot_without_valid_values() {
        let mut stat = RunningStat::new("P");
        stat.count_error = 3;
        let snap = stat.snapshot();
        assert_eq!(snap.count_valid, 0);
        assert_eq!(snap.min, None);
        assert_eq!(snap.max, None);
        assert_eq!(snap.mean, None);
        assert_eq!(snap.stddev, None);
        assert_eq!(snap.error_rate, 1.0);
    }
}
