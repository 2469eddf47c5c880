//! Field extraction from provider status payloads.
//!
//! Each function takes the `data` object of a status response. None of them
//! fail: a missing or malformed field yields `None` or an empty list, and
//! the caller decides what that means.

use serde_json::Value;

use crate::status::Vocabulary;

/// The raw status string (`state` for jobs, `status` for record-info).
pub fn raw_status(vocabulary: Vocabulary, data: &Value) -> Option<&str> {
    let field = match vocabulary {
        Vocabulary::Jobs => "state",
        Vocabulary::Record => "status",
    };
    data.get(field).and_then(Value::as_str)
}

/// The provider's failure message, if it sent a non-blank one.
pub fn failure_reason(vocabulary: Vocabulary, data: &Value) -> Option<String> {
    let field = match vocabulary {
        Vocabulary::Jobs => "failMsg",
        Vocabulary::Record => "errorMessage",
    };
    data.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Result URLs from a success payload, in provider order.
///
/// - Jobs: `resultJson` is a JSON-encoded string holding `{"resultUrls": [...]}`.
/// - Record: `response.resultUrls`, falling back to `result.images[].url`
///   when the first is absent or empty.
pub fn result_urls(vocabulary: Vocabulary, data: &Value) -> Vec<String> {
    match vocabulary {
        Vocabulary::Jobs => jobs_result_urls(data),
        Vocabulary::Record => {
            let primary = string_array(data.pointer("/response/resultUrls"));
            if !primary.is_empty() {
                return primary;
            }
            data.pointer("/result/images")
                .and_then(Value::as_array)
                .map(|images| {
                    images
                        .iter()
                        .filter_map(|img| img.get("url").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        }
    }
}

fn jobs_result_urls(data: &Value) -> Vec<String> {
    match data.get("resultJson") {
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(decoded) => string_array(decoded.get("resultUrls")),
            Err(e) => {
                tracing::debug!(error = %e, "resultJson is not valid JSON");
                Vec::new()
            }
        },
        // Some deployments already send the object un-encoded.
        Some(obj @ Value::Object(_)) => string_array(obj.get("resultUrls")),
        _ => Vec::new(),
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
