use crate::Rgb;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /led`.
///
/// Decoding never fails on a field: anything missing or of the wrong shape
/// falls back to its default, and numeric color channels are saturated into
/// `0..=255`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct LedRequest {
    pub enabled: bool,
    pub color: Rgb,
}

impl Default for LedRequest {
    fn default() -> Self {
        Self {
            enabled: true,
            color: Rgb::default(),
        }
    }
}

impl LedRequest {
    pub fn off() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn color(color: Rgb) -> Self {
        Self {
            enabled: true,
            color,
        }
    }

    pub fn from_json(body: &Value) -> Self {
        let defaults = Self::default();

        let enabled = body
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.enabled);
        let color = body
            .get("color")
            .and_then(color_from_json)
            .unwrap_or(defaults.color);

        Self { enabled, color }
    }
}

fn color_from_json(value: &Value) -> Option<Rgb> {
    match value.as_array()?.as_slice() {
        [r, g, b] => Some(Rgb::saturating_from([r.as_f64()?, g.as_f64()?, b.as_f64()?])),
        _ => None,
    }
}

/// Body of `POST /night`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NightRequest {
    pub night: bool,
}

impl NightRequest {
    pub fn from_json(body: &Value) -> Self {
        let night = body.get("night").and_then(Value::as_bool).unwrap_or(false);
        Self { night }
    }
}

/// Reply to every successful command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}

/// Reply to `GET /led`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedStatus {
    pub enabled: bool,
    pub night: bool,
    /// Last color applied while enabled, if any.
    pub color: Option<Rgb>,
    /// Duty cycle percentage currently driven on red, green and blue.
    pub duty: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_led_body_means_white() {
        let request = LedRequest::from_json(&json!({}));
        assert_eq!(request, LedRequest::color(Rgb::WHITE));
    }

    #[test]
    fn led_body_fields_are_read() {
        let request = LedRequest::from_json(&json!({ "enabled": false, "color": [1, 2, 3] }));
        assert!(!request.enabled);
        assert_eq!(request.color, Rgb::new(1, 2, 3));
    }

    #[test]
    fn malformed_led_fields_fall_back() {
        let request = LedRequest::from_json(&json!({ "enabled": "yes", "color": [1, "2", 3] }));
        assert_eq!(request, LedRequest::default());

        let request = LedRequest::from_json(&json!({ "color": [1, 2] }));
        assert_eq!(request.color, Rgb::WHITE);

        let request = LedRequest::from_json(&json!([1, 2, 3]));
        assert_eq!(request, LedRequest::default());
    }

    #[test]
    fn out_of_range_channels_are_clamped() {
        let request = LedRequest::from_json(&json!({ "color": [300, -20, 127.8] }));
        assert_eq!(request.color, Rgb::new(255, 0, 127));
    }

    #[test]
    fn night_defaults_to_off() {
        assert_eq!(NightRequest::from_json(&json!({})), NightRequest { night: false });
        assert_eq!(NightRequest::from_json(&json!({ "night": 1 })), NightRequest { night: false });
        assert_eq!(NightRequest::from_json(&json!({ "night": true })), NightRequest { night: true });
    }

    #[test]
    fn ack_wire_format() {
        assert_eq!(serde_json::to_string(&Ack::OK).unwrap(), r#"{"ok":true}"#);
    }

    #[test]
    fn status_wire_format() {
        let status = LedStatus {
            enabled: true,
            night: false,
            color: None,
            duty: [100.0, 100.0, 100.0],
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({ "enabled": true, "night": false, "color": null, "duty": [100.0, 100.0, 100.0] })
        );
    }
}
