//! Parameter registry: known codes with unit, valid range and device
//! error sentinels.
//!
//! Read-only once built. Unknown codes are never rejected: they resolve
//! to a permissive spec with no range and no sentinels.

mod builtin;

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use builtin::{SENSOR_ERROR, SENSOR_OFFLINE};

/// Two readings closer than this are the same sentinel.
const SENTINEL_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub code: String,
    pub unit: String,
    pub description: String,
    /// Inclusive `(min, max)`
    pub valid_range: Option<(f64, f64)>,
    pub error_sentinels: Vec<f64>,
}

impl ParameterSpec {
    /// Spec for a code the registry has never heard of.
    pub fn permissive(code: &str) -> Self {
        Self {
            code: code.to_string(),
            unit: String::new(),
            description: String::new(),
            valid_range: None,
            error_sentinels: Vec::new(),
        }
    }

    pub fn is_sentinel(&self, value: f64) -> bool {
        self.error_sentinels
            .iter()
            .any(|s| (s - value).abs() <= SENTINEL_TOLERANCE)
    }

    pub fn in_range(&self, value: f64) -> bool {
        match self.valid_range {
            Some((min, max)) => value >= min && value <= max,
            None => true,
        }
    }
}

/// Per-code adjustments loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterOverride {
    pub unit: Option<String>,
    pub description: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sentinels: Option<Vec<f64>>,
}

impl ParameterOverride {
    pub fn validate(&self, code: &str) -> Result<(), String> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => {
                Err(format!("parameters.{}: min ({}) must not exceed max ({})", code, min, max))
            }
            (Some(_), None) | (None, Some(_)) => {
                Err(format!("parameters.{}: min and max must be given together", code))
            }
            _ => Ok(()),
        }
    }

    fn apply(&self, spec: &mut ParameterSpec) {
        if let Some(unit) = &self.unit {
            spec.unit = unit.clone();
        }
        if let Some(description) = &self.description {
            spec.description = description.clone();
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            spec.valid_range = Some((min, max));
        }
        if let Some(sentinels) = &self.sentinels {
            spec.error_sentinels = sentinels.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterRegistry {
    specs: HashMap<String, ParameterSpec>,
}

impl ParameterRegistry {
    /// Empty registry: every code is permissive.
    pub fn empty() -> Self {
        Self { specs: HashMap::new() }
    }

    /// Built-in Trisonica parameter table.
    pub fn trisonica() -> Self {
        let specs = builtin::trisonica_specs()
            .into_iter()
            .map(|spec| (spec.code.clone(), spec))
            .collect();
        Self { specs }
    }

    /// Apply configured overrides; codes not yet known are added.
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a ParameterOverride)>,
    {
        for (code, o) in overrides {
            let spec = self
                .specs
                .entry(code.clone())
                .or_insert_with(|| ParameterSpec::permissive(code));
            o.apply(spec);
        }
        self
    }

    pub fn lookup(&self, code: &str) -> Option<&ParameterSpec> {
        self.specs.get(code)
    }

    /// Like [`lookup`](Self::lookup), falling back to a permissive spec.
    pub fn resolve(&self, code: &str) -> Cow<'_, ParameterSpec> {
        match self.specs.get(code) {
            Some(spec) => Cow::Borrowed(spec),
            None => Cow::Owned(ParameterSpec::permissive(code)),
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::trisonica()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_codes() {
        let registry = ParameterRegistry::trisonica();
        let t = registry.lookup("T").unwrap();
        assert_eq!(t.unit, "°C");
        assert_eq!(t.valid_range, Some((-40.0, 60.0)));
        assert!(t.is_sentinel(SENSOR_ERROR));
        assert!(t.is_sentinel(SENSOR_OFFLINE));

        let td = registry.lookup("TD").unwrap();
        assert_eq!(td.valid_range, Some((0.0, 360.0)));
    }

    #[test]
    fn test_unknown_code_is_permissive() {
        let registry = ParameterRegistry::trisonica();
        assert!(registry.lookup("ZZ").is_none());

        let spec = registry.resolve("ZZ");
        assert_eq!(spec.code, "ZZ");
        assert!(spec.in_range(-1.0e12));
        assert!(!spec.is_sentinel(SENSOR_ERROR));
    }

    #[test]
    fn test_sentinel_tolerance() {
        let spec = ParameterRegistry::trisonica().resolve("S").into_owned();
        assert!(spec.is_sentinel("-99.50".parse().unwrap()));
        assert!(!spec.is_sentinel(-99.6));
    }

    #[test]
    fn test_range_is_inclusive() {
        let registry = ParameterRegistry::trisonica();
        let h = registry.lookup("H").unwrap();
        assert!(h.in_range(0.0));
        assert!(h.in_range(100.0));
        assert!(!h.in_range(100.01));
    }

    #[test]
    fn test_overrides_update_and_add() {
        let mut overrides = HashMap::new();
        overrides.insert("T".to_string(), ParameterOverride {
            min: Some(-60.0),
            max: Some(70.0),
            ..Default::default()
        });
        overrides.insert("CO2".to_string(), ParameterOverride {
            unit: Some("ppm".to_string()),
            sentinels: Some(vec![-1.0]),
            ..Default::default()
        });

        let registry = ParameterRegistry::trisonica().with_overrides(&overrides);

        let t = registry.lookup("T").unwrap();
        assert_eq!(t.valid_range, Some((-60.0, 70.0)));
        assert_eq!(t.unit, "°C", "untouched fields keep built-in values");

        let co2 = registry.lookup("CO2").unwrap();
        assert_eq!(co2.unit, "ppm");
        assert_eq!(co2.valid_range, None);
        assert!(co2.is_sentinel(-1.0));
    }

    #[test]
    fn test_override_validation() {
        let inverted = ParameterOverride { min: Some(5.0), max: Some(1.0), ..Default::default() };
        assert!(inverted.validate("X").unwrap_err().contains("must not exceed"));

        let half = ParameterOverride { min: Some(5.0), ..Default::default() };
        assert!(half.validate("X").unwrap_err().contains("together"));

        assert!(ParameterOverride::default().validate("X").is_ok());
    }
}
