//! Device payload validation
//!
//! Turns an untrusted JSON body into a [`DevicePatch`] plus an ordered list
//! of human-readable errors. Pure computation, no I/O.
//!
//! ## Modes
//!
//! - `Create` / `Replace`: the patch is seeded with every optional default,
//!   so an omitted optional field resets on full replacement.
//!   `name`, `type` and `endpoint` are required.
//! - `Partial`: only supplied fields enter the patch; at least one
//!   recognized field must be present.
//!
//! Errors accumulate. The only short-circuit is a non-object body.

use serde_json::{Map, Value};
use url::Url;

use super::types::{AuthMode, DevicePatch, DeviceType, POLL_INTERVAL_RANGE, TIMEOUT_RANGE};
use crate::error::{Error, Result};

/// Client-writable fields, in report order
pub const ALLOWED_FIELDS: [&str; 11] = [
    "name",
    "type",
    "enabled",
    "endpoint",
    "auth_mode",
    "auth_username",
    "auth_password",
    "poll_interval_s",
    "timeout_ms",
    "tags",
    "notes",
];

const REQUIRED_FIELDS: [&str; 3] = ["name", "type", "endpoint"];

pub const NOT_AN_OBJECT: &str = "body must be a JSON object";

/// Validation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// POST
    Create,
    /// PUT (full replacement)
    Replace,
    /// PATCH (partial update)
    Partial,
}

impl Mode {
    /// Create and replace start from the full default set and demand the identity fields
    fn is_full(&self) -> bool {
        matches!(self, Mode::Create | Mode::Replace)
    }
}

/// Outcome of one validation pass
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub cleaned: DevicePatch,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The cleaned patch, or every collected error as [`Error::Validation`]
    pub fn into_patch(self) -> Result<DevicePatch> {
        if self.errors.is_empty() {
            Ok(self.cleaned)
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

/// Validate and normalize a device payload
pub fn validate_device_payload(payload: &Value, mode: Mode) -> ValidationResult {
    let Some(data) = payload.as_object() else {
        return ValidationResult {
            cleaned: DevicePatch::default(),
            errors: vec![NOT_AN_OBJECT.to_string()],
        };
    };

    let mut errors = Vec::new();

    let mut unknown: Vec<&str> = data
        .keys()
        .map(String::as_str)
        .filter(|key| !ALLOWED_FIELDS.contains(key))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        errors.push(format!("unknown fields: {}", quoted_list(&unknown)));
    }

    if mode == Mode::Partial && !data.keys().any(|key| ALLOWED_FIELDS.contains(&key.as_str())) {
        errors.push("patch body must include at least one updatable field".to_string());
    }

    let mut cleaned = if mode.is_full() {
        DevicePatch::with_defaults()
    } else {
        DevicePatch::default()
    };

    if mode.is_full() {
        for field in REQUIRED_FIELDS {
            if !data.contains_key(field) {
                errors.push(format!("missing required field: {field}"));
            }
        }
    }

    if let Some(value) = data.get("name") {
        match non_empty_trimmed(value) {
            Some(name) => cleaned.name = Some(name),
            None => errors.push("name must be a non-empty string".to_string()),
        }
    }

    if let Some(value) = data.get("type") {
        match value.as_str().and_then(DeviceType::from_name) {
            Some(device_type) => cleaned.device_type = Some(device_type),
            None => errors.push(format!(
                "type must be one of {}",
                quoted_list(&sorted_names(DeviceType::ALL.iter().map(DeviceType::as_str)))
            )),
        }
    }

    if let Some(value) = data.get("enabled") {
        // Strict: 0/1 and "true" are not booleans.
        match value.as_bool() {
            Some(enabled) => cleaned.enabled = Some(enabled),
            None => errors.push("enabled must be boolean".to_string()),
        }
    }

    if let Some(value) = data.get("endpoint") {
        match non_empty_trimmed(value) {
            Some(endpoint) => cleaned.endpoint = Some(endpoint),
            None => errors.push("endpoint must be a non-empty string".to_string()),
        }
    }

    if let Some(value) = data.get("auth_mode") {
        if value.is_null() {
            cleaned.auth_mode = Some(None);
        } else {
            match value.as_str().and_then(AuthMode::from_name) {
                Some(auth_mode) => cleaned.auth_mode = Some(Some(auth_mode)),
                None => errors.push(format!(
                    "auth_mode must be one of {} or null",
                    quoted_list(&sorted_names(AuthMode::ALL.iter().map(AuthMode::as_str)))
                )),
            }
        }
    }

    if let Some(value) = data.get("auth_username") {
        match nullable_string(value) {
            Some(username) => cleaned.auth_username = Some(username),
            None => errors.push("auth_username must be string or null".to_string()),
        }
    }

    if let Some(value) = data.get("auth_password") {
        match nullable_string(value) {
            Some(password) => cleaned.auth_password = Some(password),
            None => errors.push("auth_password must be string or null".to_string()),
        }
    }

    if let Some(value) = data.get("poll_interval_s") {
        match bounded_integer("poll_interval_s", value, POLL_INTERVAL_RANGE) {
            Ok(seconds) => cleaned.poll_interval_s = Some(seconds),
            Err(message) => errors.push(message),
        }
    }

    if let Some(value) = data.get("timeout_ms") {
        match bounded_integer("timeout_ms", value, TIMEOUT_RANGE) {
            Ok(millis) => cleaned.timeout_ms = Some(millis),
            Err(message) => errors.push(message),
        }
    }

    if let Some(value) = data.get("tags") {
        match string_list(value) {
            Some(tags) => cleaned.tags = Some(tags),
            None => errors.push("tags must be a list of strings".to_string()),
        }
    }

    if let Some(value) = data.get("notes") {
        match nullable_string(value) {
            Some(notes) => cleaned.notes = Some(notes),
            None => errors.push("notes must be a string or null".to_string()),
        }
    }

    if let Some(message) = cross_field_error(data, &cleaned, mode) {
        errors.push(message);
    }

    ValidationResult { cleaned, errors }
}

/// Endpoint scheme vs. type.
///
/// Uses the cleaned value when the field passed its own check, the raw
/// payload value otherwise. In partial mode both fields must be supplied for
/// the check to fire here; the service re-checks the merged record.
fn cross_field_error(data: &Map<String, Value>, cleaned: &DevicePatch, mode: Mode) -> Option<String> {
    let full = mode.is_full();
    if !(full || data.contains_key("type")) || !(full || data.contains_key("endpoint")) {
        return None;
    }

    let device_type = cleaned
        .device_type
        .map(|t| t.as_str())
        .or_else(|| data.get("type").and_then(Value::as_str))?;
    let endpoint = cleaned
        .endpoint
        .as_deref()
        .or_else(|| data.get("endpoint").and_then(Value::as_str))?;

    endpoint_scheme_error(device_type, endpoint)
}

/// Check that `endpoint` parses as a URL whose scheme suits `device_type`.
///
/// Unknown type names pass; they are reported by the type check.
pub fn endpoint_scheme_error(device_type: &str, endpoint: &str) -> Option<String> {
    let scheme = match Url::parse(endpoint) {
        Ok(url) => url.scheme().to_string(),
        // "host/path" has no scheme at all
        Err(url::ParseError::RelativeUrlWithoutBase) => String::new(),
        Err(_) => return Some("endpoint must be a valid URL".to_string()),
    };

    let device_type = DeviceType::from_name(device_type)?;
    let allowed = device_type.allowed_schemes();
    if allowed.contains(&scheme.as_str()) {
        None
    } else {
        Some(format!(
            "endpoint scheme must be {} for {}",
            allowed.join(" or "),
            device_type
        ))
    }
}

fn non_empty_trimmed(value: &Value) -> Option<String> {
    let trimmed = value.as_str()?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `Some(None)` for null, `Some(Some(_))` for a string, `None` otherwise
fn nullable_string(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}

/// Null normalizes to an empty list
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn bounded_integer(field: &str, value: &Value, (min, max): (i64, i64)) -> std::result::Result<i64, String> {
    let out_of_range = || format!("{field} must be between {min} and {max}");
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => match n.as_i64() {
            Some(v) if (min..=max).contains(&v) => Ok(v),
            _ => Err(out_of_range()),
        },
        _ => Err(format!("{field} must be an integer")),
    }
}

fn sorted_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut names: Vec<&str> = names.collect();
    names.sort_unstable();
    names
}

/// `['a', 'b']`
fn quoted_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
    format!("[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_payload() -> Value {
        json!({
            "name": "Cam 1",
            "type": "camera_ip_snapshot",
            "endpoint": "https://example.local/snap.jpg",
        })
    }

    #[test]
    fn test_non_object_short_circuits() {
        for payload in [json!([1, 2]), json!("x"), json!(null), json!(42)] {
            let result = validate_device_payload(&payload, Mode::Create);
            assert_eq!(result.errors, vec![NOT_AN_OBJECT]);
            assert!(result.cleaned.is_empty());
        }
    }

    #[test]
    fn test_create_seeds_defaults() {
        let result = validate_device_payload(&snapshot_payload(), Mode::Create);
        assert!(result.is_valid(), "{:?}", result.errors);

        let cleaned = result.cleaned;
        assert_eq!(cleaned.name.as_deref(), Some("Cam 1"));
        assert_eq!(cleaned.device_type, Some(DeviceType::CameraIpSnapshot));
        assert_eq!(cleaned.enabled, Some(true));
        assert_eq!(cleaned.auth_mode, Some(Some(AuthMode::None)));
        assert_eq!(cleaned.auth_username, Some(None));
        assert_eq!(cleaned.auth_password, Some(None));
        assert_eq!(cleaned.poll_interval_s, Some(60));
        assert_eq!(cleaned.timeout_ms, Some(5000));
        assert_eq!(cleaned.tags, Some(vec![]));
        assert_eq!(cleaned.notes, Some(None));
    }

    #[test]
    fn test_partial_does_not_seed_defaults() {
        let result = validate_device_payload(&json!({"enabled": false}), Mode::Partial);
        assert!(result.is_valid());
        assert_eq!(
            result.cleaned,
            DevicePatch {
                enabled: Some(false),
                ..DevicePatch::default()
            }
        );
    }

    #[test]
    fn test_missing_required_fields() {
        let result = validate_device_payload(&json!({}), Mode::Replace);
        assert_eq!(
            result.errors,
            vec![
                "missing required field: name",
                "missing required field: type",
                "missing required field: endpoint",
            ]
        );
    }

    #[test]
    fn test_unknown_fields_listed_sorted() {
        let mut payload = snapshot_payload();
        payload["zeta"] = json!(1);
        payload["id"] = json!("forged");
        let result = validate_device_payload(&payload, Mode::Create);

        assert_eq!(result.errors, vec!["unknown fields: ['id', 'zeta']"]);
        // Valid fields are still cleaned.
        assert_eq!(result.cleaned.name.as_deref(), Some("Cam 1"));
    }

    #[test]
    fn test_partial_requires_a_recognized_field() {
        let result = validate_device_payload(&json!({"created_at": "2020-01-01"}), Mode::Partial);
        assert_eq!(
            result.errors,
            vec![
                "unknown fields: ['created_at']",
                "patch body must include at least one updatable field",
            ]
        );

        let result = validate_device_payload(&json!({}), Mode::Partial);
        assert_eq!(
            result.errors,
            vec!["patch body must include at least one updatable field"]
        );
    }

    #[test]
    fn test_trims_name_and_endpoint() {
        let payload = json!({
            "name": "  Cam  ",
            "type": "camera_rtsp",
            "endpoint": "  rtsp://host/stream ",
        });
        let result = validate_device_payload(&payload, Mode::Create);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(result.cleaned.name.as_deref(), Some("Cam"));
        assert_eq!(result.cleaned.endpoint.as_deref(), Some("rtsp://host/stream"));
    }

    #[test]
    fn test_errors_accumulate_in_field_order() {
        let payload = json!({
            "name": "   ",
            "type": "camera_ip_snapshot",
            "enabled": 1,
            "endpoint": "https://example.local/",
            "auth_mode": "ntlm",
            "auth_username": 5,
            "auth_password": false,
            "poll_interval_s": 0,
            "timeout_ms": "fast",
            "tags": ["a", 1],
            "notes": {},
        });
        let result = validate_device_payload(&payload, Mode::Create);
        assert_eq!(
            result.errors,
            vec![
                "name must be a non-empty string",
                "enabled must be boolean",
                "auth_mode must be one of ['basic', 'bearer', 'digest', 'none'] or null",
                "auth_username must be string or null",
                "auth_password must be string or null",
                "poll_interval_s must be between 1 and 3600",
                "timeout_ms must be an integer",
                "tags must be a list of strings",
                "notes must be a string or null",
            ]
        );
    }

    #[test]
    fn test_failing_field_does_not_override_default() {
        let mut payload = snapshot_payload();
        payload["poll_interval_s"] = json!(99999);
        let result = validate_device_payload(&payload, Mode::Replace);
        assert_eq!(result.errors, vec!["poll_interval_s must be between 1 and 3600"]);
        assert_eq!(result.cleaned.poll_interval_s, Some(60));
    }

    #[test]
    fn test_integer_checks_reject_floats_and_bools() {
        for value in [json!(5.0), json!(true), json!("60")] {
            let result = validate_device_payload(&json!({"poll_interval_s": value}), Mode::Partial);
            assert_eq!(result.errors, vec!["poll_interval_s must be an integer"]);
        }
        let result = validate_device_payload(&json!({"timeout_ms": u64::MAX}), Mode::Partial);
        assert_eq!(result.errors, vec!["timeout_ms must be between 100 and 60000"]);
        let result = validate_device_payload(&json!({"timeout_ms": 100}), Mode::Partial);
        assert!(result.is_valid());
        let result = validate_device_payload(&json!({"timeout_ms": 60001}), Mode::Partial);
        assert_eq!(result.errors, vec!["timeout_ms must be between 100 and 60000"]);
    }

    #[test]
    fn test_nullable_fields() {
        let payload = json!({
            "auth_mode": null,
            "auth_username": null,
            "notes": null,
            "tags": null,
        });
        let result = validate_device_payload(&payload, Mode::Partial);
        assert!(result.is_valid());
        assert_eq!(result.cleaned.auth_mode, Some(None));
        assert_eq!(result.cleaned.auth_username, Some(None));
        assert_eq!(result.cleaned.notes, Some(None));
        assert_eq!(result.cleaned.tags, Some(vec![]));
    }

    #[test]
    fn test_invalid_type_lists_allowed_types() {
        let mut payload = snapshot_payload();
        payload["type"] = json!("camera_usb");
        let result = validate_device_payload(&payload, Mode::Create);
        assert_eq!(
            result.errors,
            vec!["type must be one of ['camera_ip_snapshot', 'camera_rtsp']"]
        );
    }

    #[test]
    fn test_snapshot_scheme_mismatch() {
        let mut payload = snapshot_payload();
        payload["endpoint"] = json!("ftp://example.local/snap.jpg");
        let result = validate_device_payload(&payload, Mode::Create);
        assert_eq!(
            result.errors,
            vec!["endpoint scheme must be http or https for camera_ip_snapshot"]
        );
    }

    #[test]
    fn test_rtsp_scheme_mismatch() {
        let payload = json!({
            "name": "Cam",
            "type": "camera_rtsp",
            "endpoint": "http://host/x",
        });
        let result = validate_device_payload(&payload, Mode::Replace);
        assert_eq!(result.errors, vec!["endpoint scheme must be rtsp for camera_rtsp"]);
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let mut payload = snapshot_payload();
        payload["endpoint"] = json!("HTTPS://example.local/snap.jpg");
        assert!(validate_device_payload(&payload, Mode::Create).is_valid());
    }

    #[test]
    fn test_scheme_less_endpoint_is_a_scheme_mismatch() {
        assert_eq!(
            endpoint_scheme_error("camera_rtsp", "host/stream").as_deref(),
            Some("endpoint scheme must be rtsp for camera_rtsp")
        );
        assert_eq!(endpoint_scheme_error("camera_usb", "ftp://x"), None);
    }

    #[test]
    fn test_unparseable_url_is_rejected() {
        for endpoint in ["http://", "http://host name/x"] {
            assert_eq!(
                endpoint_scheme_error("camera_ip_snapshot", endpoint).as_deref(),
                Some("endpoint must be a valid URL"),
                "{endpoint:?}"
            );
        }
    }

    #[test]
    fn test_partial_cross_field_needs_both_fields() {
        // Only the endpoint: the current type is unknown here.
        let result = validate_device_payload(&json!({"endpoint": "http://host/x"}), Mode::Partial);
        assert!(result.is_valid());

        let result = validate_device_payload(
            &json!({"type": "camera_rtsp", "endpoint": "http://host/x"}),
            Mode::Partial,
        );
        assert_eq!(result.errors, vec!["endpoint scheme must be rtsp for camera_rtsp"]);
    }

    #[test]
    fn test_into_patch() {
        let patch = validate_device_payload(&snapshot_payload(), Mode::Create)
            .into_patch()
            .unwrap();
        assert_eq!(patch.device_type, Some(DeviceType::CameraIpSnapshot));

        let err = validate_device_payload(&json!([]), Mode::Create)
            .into_patch()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref details) if details == &vec![NOT_AN_OBJECT.to_string()]));
    }
}
