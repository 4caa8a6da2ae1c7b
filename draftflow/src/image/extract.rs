//! Field extraction from heterogeneous image-backend responses.
//!
//! The backend has shipped several response shapes over time. Each lookup is
//! an ordered list of JSON pointers; the first one that yields a usable value
//! wins.

use serde_json::Value;

/// Where an image URL may live, in priority order.
pub const URL_POINTERS: [&str; 10] = [
    "/data/image_urls",
    "/Result/ImageUrls",
    "/image_urls",
    "/data/url",
    "/data/image_url",
    "/Result/Url",
    "/Result/ImageUrl",
    "/Data/Url",
    "/data/images/0/url",
    "/data/result/image_urls",
];

/// Where an inline base64 image may live.
pub const BASE64_POINTERS: [&str; 2] = ["/data/binary_data_base64/0", "/BinaryDataBase64/0"];

/// Where the task id may live.
pub const TASK_ID_POINTERS: [&str; 3] = ["/data/task_id", "/Data/TaskId", "/task_id"];

/// Where the task status may live.
pub const STATUS_POINTERS: [&str; 2] = ["/data/status", "/Status"];

/// Statuses after which polling stops.
pub const TERMINAL_STATUSES: [&str; 6] =
    ["done", "success", "succeeded", "finished", "not_found", "expired"];

/// What one poll response says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// An image is available.
    Ready(String),
    /// The task ended without an image.
    Terminal(String),
    /// Keep polling.
    Pending,
}

/// First non-empty string in a string or an array of strings.
fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string)),
        _ => None,
    }
}

/// Extracts an image URL, falling back to a base64 data URI.
#[must_use]
pub fn image_url(response: &Value) -> Option<String> {
    URL_POINTERS
        .iter()
        .find_map(|p| response.pointer(p).and_then(first_string))
        .or_else(|| {
            BASE64_POINTERS.iter().find_map(|p| {
                response
                    .pointer(p)?
                    .as_str()
                    .filter(|s| !s.is_empty())
                    .map(|b64| format!("data:image/jpeg;base64,{b64}"))
            })
        })
}

/// Extracts the task id as a string. Numeric ids are rendered in decimal.
#[must_use]
pub fn task_id(response: &Value) -> Option<String> {
    TASK_ID_POINTERS.iter().find_map(|p| match response.pointer(p)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Extracts the lower-cased task status.
#[must_use]
pub fn status(response: &Value) -> Option<String> {
    STATUS_POINTERS.iter().find_map(|p| {
        response
            .pointer(p)?
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    })
}

/// Classifies a poll response.
#[must_use]
pub fn poll_outcome(response: &Value) -> PollOutcome {
    if let Some(url) = image_url(response) {
        return PollOutcome::Ready(url);
    }
    match status(response) {
        Some(s) if TERMINAL_STATUSES.contains(&s.as_str()) => PollOutcome::Terminal(s),
        _ => PollOutcome::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_shapes() {
        assert_eq!(
            image_url(&json!({"data": {"image_urls": ["", "https://a/1.png"]}})).as_deref(),
            Some("https://a/1.png")
        );
        assert_eq!(
            image_url(&json!({"Result": {"ImageUrls": "https://a/2.png"}})).as_deref(),
            Some("https://a/2.png")
        );
        assert_eq!(
            image_url(&json!({"data": {"images": [{"url": "https://a/3.png"}]}})).as_deref(),
            Some("https://a/3.png")
        );
        assert_eq!(
            image_url(&json!({"data": {"result": {"image_urls": ["https://a/4.png"]}}})).as_deref(),
            Some("https://a/4.png")
        );
    }

    #[test]
    fn test_url_priority() {
        let response = json!({
            "data": {"url": "https://later", "image_urls": ["https://first"]},
        });
        assert_eq!(image_url(&response).as_deref(), Some("https://first"));
    }

    #[test]
    fn test_base64_fallback() {
        assert_eq!(
            image_url(&json!({"data": {"binary_data_base64": ["QUJD"]}})).as_deref(),
            Some("data:image/jpeg;base64,QUJD")
        );
        assert_eq!(
            image_url(&json!({"BinaryDataBase64": ["WFla"]})).as_deref(),
            Some("data:image/jpeg;base64,WFla")
        );
        assert!(image_url(&json!({"data": {"binary_data_base64": [""]}})).is_none());
    }

    #[test]
    fn test_task_id_shapes() {
        assert_eq!(task_id(&json!({"data": {"task_id": "t-1"}})).as_deref(), Some("t-1"));
        assert_eq!(task_id(&json!({"Data": {"TaskId": 42}})).as_deref(), Some("42"));
        assert_eq!(task_id(&json!({"task_id": "t-3"})).as_deref(), Some("t-3"));
        assert!(task_id(&json!({"data": {}})).is_none());
    }

    #[test]
    fn test_poll_outcome() {
        assert_eq!(
            poll_outcome(&json!({"data": {"status": "DONE"}})),
            PollOutcome::Terminal("done".to_string())
        );
        assert_eq!(
            poll_outcome(&json!({"Status": "Expired"})),
            PollOutcome::Terminal("expired".to_string())
        );
        assert_eq!(
            poll_outcome(&json!({"data": {"status": "in_queue"}})),
            PollOutcome::Pending
        );
        assert_eq!(
            poll_outcome(&json!({"data": {"status": "done", "image_urls": ["u"]}})),
            PollOutcome::Ready("u".to_string())
        );
    }
}
