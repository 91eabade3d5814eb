use serde::Serialize;
use serde_json::{json, Value};

/// `{status, data}` envelope returned by every catalog endpoint
#[derive(Debug, Serialize)]
pub struct ApiEnvelope {
    pub status: bool,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiEnvelope {
    pub fn ok(data: Value) -> Self {
        Self {
            status: true,
            data,
            error: None,
        }
    }

    /// Fail-soft reply for list endpoints
    pub fn empty_list(error: impl Into<String>) -> Self {
        Self {
            status: false,
            data: Value::Array(Vec::new()),
            error: Some(error.into()),
        }
    }

    /// Fail-soft reply for single-object endpoints
    pub fn empty_object(error: impl Into<String>) -> Self {
        Self {
            status: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Fail-soft reply for the ratings listing
pub fn empty_ratings(error: impl Into<String>) -> Value {
    json!({
        "status": false,
        "success": false,
        "ratings": [],
        "error": error.into(),
    })
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope_omits_error() {
        let value = serde_json::to_value(ApiEnvelope::ok(json!([1, 2]))).unwrap();
        assert_eq!(value, json!({"status": true, "data": [1, 2]}));
    }

    #[test]
    fn test_fail_soft_shapes() {
        let list = serde_json::to_value(ApiEnvelope::empty_list("down")).unwrap();
        assert_eq!(list, json!({"status": false, "data": [], "error": "down"}));

        let object = serde_json::to_value(ApiEnvelope::empty_object("down")).unwrap();
        assert_eq!(object["data"], Value::Null);

        let ratings = empty_ratings("down");
        assert_eq!(ratings["ratings"], json!([]));
        assert_eq!(ratings["success"], false);
    }
}
