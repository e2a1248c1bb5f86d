use super::ParameterSpec;

/// Reported by the anemometer when a sensor path fails.
pub const SENSOR_ERROR: f64 = -99.5;
/// Reported when a sensor is absent or offline (e.g. no pressure module).
pub const SENSOR_OFFLINE: f64 = -99.7;

const SENTINELS: [f64; 2] = [SENSOR_ERROR, SENSOR_OFFLINE];

/// (code, unit, description, min, max)
const TRISONICA: &[(&str, &str, &str, f64, f64)] = &[
    ("S", "m/s", "Wind Speed (3D)", 0.0, 50.0),
    ("S2", "m/s", "Wind Speed (2D)", 0.0, 50.0),
    ("S3", "m/s", "Wind Speed (3D alt)", 0.0, 50.0),
    ("D", "°", "Wind Direction", 0.0, 360.0),
    ("U", "m/s", "U-Vector (East-West)", -50.0, 50.0),
    ("V", "m/s", "V-Vector (North-South)", -50.0, 50.0),
    ("W", "m/s", "W-Vector (Vertical)", -50.0, 50.0),
    ("T", "°C", "Air Temperature", -40.0, 60.0),
    ("T1", "°C", "Temperature 1", -40.0, 60.0),
    ("T2", "°C", "Temperature 2", -40.0, 60.0),
    ("H", "%", "Relative Humidity", 0.0, 100.0),
    ("P", "hPa", "Atmospheric Pressure", 900.0, 1100.0),
    ("PI", "°", "Pitch Angle", -45.0, 45.0),
    ("RO", "°", "Roll Angle", -45.0, 45.0),
    ("MD", "°", "Magnetic Heading", 0.0, 360.0),
    ("TD", "°", "True Heading", 0.0, 360.0),
];

pub(super) fn trisonica_specs() -> Vec<ParameterSpec> {
    TRISONICA
        .iter()
        .map(|&(code, unit, description, min, max)| ParameterSpec {
            code: code.to_string(),
            unit: unit.to_string(),
            description: description.to_string(),
            valid_range: Some((min, max)),
            error_sentinels: SENTINELS.to_vec(),
        })
        .collect()
}
