//! Sample calibration: per-sensor offsets applied to raw readings.

use serde_json::{Map, Value};
use tracing::debug;

/// Calibration offsets for one sensor, in the units the API reports
/// them: percentage points for humidity, Celsius degrees for
/// temperature.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offsets {
    /// Humidity correction in percentage points.
    pub humidity: f64,
    /// Temperature correction in Celsius degrees.
    pub temperature: f64,
}

impl Offsets {
    /// Reads a sensor's `calibration` block, defaulting to zero when the
    /// block, a field, or the whole sensor entry is missing.
    pub fn from_sensor(sensor: Option<&Value>) -> Self {
        let calibration = sensor.and_then(|attrs| attrs.get("calibration"));
        let field = |name: &str| {
            calibration
                .and_then(|block| block.get(name))
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
        };
        Self {
            humidity: field("humidity"),
            temperature: field("temperature"),
        }
    }

    /// Humidity offset is already in percentage points and adds directly.
    pub fn calibrated_humidity(&self, raw: f64) -> f64 {
        round2(raw + self.humidity)
    }

    /// The offset arrives in Celsius while raw readings are Fahrenheit.
    /// An offset is a difference between two temperatures, so the affine
    /// term of the full conversion cancels and a bare 9/5 scale is exact.
    pub fn calibrated_temperature(&self, raw: f64) -> f64 {
        round2(raw + self.temperature * 9.0 / 5.0)
    }
}

/// Adds `calibrated_humidity`/`calibrated_temperature` to every sample
/// in a decoded `/samples` response, leaving the raw fields untouched.
///
/// Readings sit under the response's top-level `sensors` object, keyed
/// by sensor id; sibling bookkeeping keys are left alone. A sample
/// missing a raw reading is skipped for that field. Calibration is a
/// pure function of raw value and offset, so re-applying it to an
/// already-enriched response rewrites the same values.
pub fn apply_offsets(samples: &mut Value, sensors: &Map<String, Value>) {
    let Some(readings) = samples.get_mut("sensors").and_then(Value::as_object_mut) else {
        debug!("samples response has no sensor readings to calibrate");
        return;
    };

    for (sensor_id, series) in readings.iter_mut() {
        let offsets = Offsets::from_sensor(sensors.get(sensor_id));
        let Some(series) = series.as_array_mut() else {
            continue;
        };
        for sample in series {
            let Some(sample) = sample.as_object_mut() else {
                continue;
            };
            if let Some(raw) = sample.get("humidity").and_then(Value::as_f64) {
                sample.insert(
                    "calibrated_humidity".into(),
                    offsets.calibrated_humidity(raw).into(),
                );
            }
            if let Some(raw) = sample.get("temperature").and_then(Value::as_f64) {
                sample.insert(
                    "calibrated_temperature".into(),
                    offsets.calibrated_temperature(raw).into(),
                );
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sensor_metadata() -> Map<String, Value> {
        let Value::Object(map) = json!({
            "123.456": {
                "name": "Garage",
                "calibration": { "humidity": -1.5, "temperature": 0.5 }
            },
            "789.012": {
                "name": "Cellar"
            }
        }) else {
            unreachable!()
        };
        map
    }

    fn samples_response() -> Value {
        json!({
            "last_time": "2020-01-02T03:04:05.000Z",
            "sensors": {
                "123.456": [
                    { "observed": "2020-01-02T03:04:05.000Z", "humidity": 45.2, "temperature": 68.0 }
                ]
            }
        })
    }

    #[test]
    fn offsets_applied_and_rounded() {
        let mut samples = samples_response();
        apply_offsets(&mut samples, &sensor_metadata());

        let sample = &samples["sensors"]["123.456"][0];
        assert_eq!(sample["calibrated_humidity"], json!(43.7));
        // 0.5 C offset scales to 0.9 F
        assert_eq!(sample["calibrated_temperature"], json!(68.9));
    }

    #[test]
    fn raw_fields_preserved() {
        let mut samples = samples_response();
        apply_offsets(&mut samples, &sensor_metadata());

        let sample = &samples["sensors"]["123.456"][0];
        assert_eq!(sample["humidity"], json!(45.2));
        assert_eq!(sample["temperature"], json!(68.0));
        assert_eq!(samples["last_time"], json!("2020-01-02T03:04:05.000Z"));
    }

    #[test]
    fn missing_calibration_block_means_zero_offsets() {
        let mut samples = json!({
            "sensors": {
                "789.012": [ { "humidity": 50.25, "temperature": 70.5 } ]
            }
        });
        apply_offsets(&mut samples, &sensor_metadata());

        let sample = &samples["sensors"]["789.012"][0];
        assert_eq!(sample["calibrated_humidity"], json!(50.25));
        assert_eq!(sample["calibrated_temperature"], json!(70.5));
    }

    #[test]
    fn unknown_sensor_means_zero_offsets() {
        let mut samples = json!({
            "sensors": {
                "000.000": [ { "humidity": 50.0, "temperature": 70.0 } ]
            }
        });
        apply_offsets(&mut samples, &sensor_metadata());

        let sample = &samples["sensors"]["000.000"][0];
        assert_eq!(sample["calibrated_humidity"], json!(50.0));
        assert_eq!(sample["calibrated_temperature"], json!(70.0));
    }

    #[test]
    fn reapplying_offsets_is_idempotent() {
        let mut samples = samples_response();
        apply_offsets(&mut samples, &sensor_metadata());
        let once = samples.clone();
        apply_offsets(&mut samples, &sensor_metadata());
        assert_eq!(samples, once);
    }

    #[test]
    fn sample_missing_a_reading_is_skipped_for_that_field() {
        let mut samples = json!({
            "sensors": {
                "123.456": [ { "observed": "2020-01-02T03:04:05.000Z", "temperature": 68.0 } ]
            }
        });
        apply_offsets(&mut samples, &sensor_metadata());

        let sample = samples["sensors"]["123.456"][0].as_object().unwrap();
        assert!(!sample.contains_key("calibrated_humidity"));
        assert_eq!(sample["calibrated_temperature"], json!(68.9));
    }

    #[test]
    fn response_without_readings_is_left_alone() {
        let mut samples = json!({ "status": "no sensors" });
        apply_offsets(&mut samples, &sensor_metadata());
        assert_eq!(samples, json!({ "status": "no sensors" }));
    }

    #[test]
    fn rounding_is_to_two_decimal_places() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(1.237), 1.24);
        assert_eq!(round2(-1.237), -1.24);
    }
}
