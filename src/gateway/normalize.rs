use serde_json::{Map, Value};

use super::envelope::{AgentFailure, AgentPayload};

/// How many nested wrappers are unwrapped before giving up.
const MAX_UNWRAP_DEPTH: usize = 4;

/// Classify a raw reply body and pull out the agent's result.
pub fn normalize_body(body: &[u8]) -> Result<Value, AgentFailure> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(AgentFailure::malformed("empty reply body"));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AgentFailure::malformed(format!("reply is not JSON: {}", e)))?;
    normalize_value(value)
}

/// Classify an already-parsed reply.
pub fn normalize_value(value: Value) -> Result<Value, AgentFailure> {
    normalize_at(value, 0)
}

fn normalize_at(value: Value, depth: usize) -> Result<Value, AgentFailure> {
    if depth > MAX_UNWRAP_DEPTH {
        return Err(AgentFailure::malformed("reply nested too deeply"));
    }

    let mut obj = match value {
        Value::Object(obj) => obj,
        Value::Array(_) => return Err(AgentFailure::malformed("reply is an array")),
        other => {
            return Err(AgentFailure::malformed(format!(
                "reply is a bare {}",
                json_type(&other)
            )))
        }
    };

    // {success: bool, response: ...}
    if let (Some(success), true) = (
        obj.get("success").and_then(Value::as_bool),
        obj.contains_key("response"),
    ) {
        let response = obj.remove("response").unwrap_or(Value::Null);
        if !success {
            return Err(rejection_from_wrapped(&obj, response));
        }
        return match response {
            Value::String(text) => parse_embedded(&text, depth),
            other => normalize_at(other, depth + 1),
        };
    }

    // {status: "...", result: ...}
    if let Some(status) = obj.get("status").and_then(Value::as_str) {
        if status == AgentPayload::STATUS {
            return obj
                .remove("result")
                .ok_or_else(|| AgentFailure::malformed("success reply without a result"));
        }
        let remote_status = status.to_string();
        let message = message_text(&obj);
        return Err(AgentFailure::RemoteRejected {
            remote_status,
            message,
            detail: Value::Object(obj),
        });
    }

    // {response: "<json text>"}
    if let Some(Value::String(text)) = obj.get("response") {
        return parse_embedded(text, depth);
    }

    Err(AgentFailure::malformed(
        "reply has no recognisable success or failure indicator",
    ))
}

fn parse_embedded(text: &str, depth: usize) -> Result<Value, AgentFailure> {
    let inner: Value = serde_json::from_str(strip_code_fence(text)).map_err(|_| {
        AgentFailure::malformed("agent replied with text instead of a JSON payload")
    })?;
    normalize_at(inner, depth + 1)
}

fn rejection_from_wrapped(outer: &Map<String, Value>, response: Value) -> AgentFailure {
    let (remote_status, message) = match &response {
        Value::Object(inner) => (
            inner
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("error")
                .to_string(),
            message_text(inner).or_else(|| message_text(outer)),
        ),
        Value::String(text) => ("error".to_string(), Some(text.clone())),
        _ => ("error".to_string(), message_text(outer)),
    };
    AgentFailure::RemoteRejected {
        remote_status,
        message,
        detail: response,
    }
}

fn message_text(obj: &Map<String, Value>) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| match obj.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
}

/// Remove a surrounding markdown code fence such as ```` ```json ... ``` ````.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected_message(result: Result<Value, AgentFailure>) -> Option<String> {
        match result {
            Err(AgentFailure::RemoteRejected { message, .. }) => message,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn plain_success_passes_result_through() {
        let result = json!({"zone_status": "ok", "b": 1, "a": [1.5, null]});
        let body = json!({"status": "success", "result": result.clone()});
        assert_eq!(normalize_value(body).unwrap(), result);
    }

    #[test]
    fn result_key_order_is_preserved() {
        let body = br#"{"status":"success","result":{"zeta":1,"alpha":2,"mid":3}}"#;
        let out = normalize_body(body).unwrap();
        assert_eq!(serde_json::to_string(&out).unwrap(), r#"{"zeta":1,"alpha":2,"mid":3}"#);
    }

    #[test]
    fn wrapped_success_is_unwrapped() {
        let body = json!({
            "success": true,
            "response": {"status": "success", "result": {"case_id": "MC-1"}}
        });
        assert_eq!(normalize_value(body).unwrap(), json!({"case_id": "MC-1"}));
    }

    #[test]
    fn wrapped_failure_is_rejected() {
        let body = json!({"success": false, "response": {"status": "error", "message": "agent offline"}});
        assert_eq!(rejected_message(normalize_value(body)).as_deref(), Some("agent offline"));
    }

    #[test]
    fn string_response_is_parsed_as_embedded_json() {
        let body = json!({
            "response": "```json\n{\"status\": \"success\", \"result\": {\"relevance_score\": 0.9}}\n```"
        });
        assert_eq!(normalize_value(body).unwrap(), json!({"relevance_score": 0.9}));
    }

    #[test]
    fn status_must_be_exactly_success() {
        for status in ["SUCCESS", "Success", " success"] {
            let body = json!({"status": status, "result": {"x": 1}});
            match normalize_value(body) {
                Err(AgentFailure::RemoteRejected { remote_status, .. }) => {
                    assert_eq!(remote_status, status)
                }
                other => panic!("{:?} accepted: {:?}", status, other),
            }
        }
    }

    #[test]
    fn wrapped_string_response_is_parsed() {
        let body = json!({
            "success": true,
            "response": "{\"status\": \"success\", \"result\": {\"zone_status\": \"red\"}}"
        });
        assert_eq!(normalize_value(body).unwrap(), json!({"zone_status": "red"}));
    }

    #[test]
    fn string_result_is_not_reinterpreted() {
        let body = json!({"status": "success", "result": "{\"x\":1}"});
        assert_eq!(normalize_value(body).unwrap(), json!("{\"x\":1}"));
    }

    #[test]
    fn prose_response_is_malformed() {
        let body = json!({"response": "I could not find any zones."});
        assert!(matches!(normalize_value(body), Err(AgentFailure::Malformed { .. })));
    }

    #[test]
    fn error_status_is_rejected_with_message() {
        let body = json!({"status": "error", "message": "rate limited"});
        assert_eq!(rejected_message(normalize_value(body)).as_deref(), Some("rate limited"));
    }

    #[test]
    fn missing_status_is_malformed() {
        assert!(matches!(
            normalize_value(json!({"result": {"zone_status": "ok"}})),
            Err(AgentFailure::Malformed { .. })
        ));
    }

    #[test]
    fn success_without_result_is_malformed() {
        assert!(matches!(
            normalize_value(json!({"status": "success"})),
            Err(AgentFailure::Malformed { .. })
        ));
    }

    #[test]
    fn non_json_and_empty_bodies_are_malformed() {
        assert!(matches!(normalize_body(b"<html>502</html>"), Err(AgentFailure::Malformed { .. })));
        assert!(matches!(normalize_body(b"  \n"), Err(AgentFailure::Malformed { .. })));
        assert!(matches!(normalize_body(b"[1,2]"), Err(AgentFailure::Malformed { .. })));
    }

    #[test]
    fn self_wrapping_reply_stops_at_depth_limit() {
        let mut body = json!({"status": "success", "result": {"done": true}});
        for _ in 0..MAX_UNWRAP_DEPTH + 2 {
            body = json!({"success": true, "response": body});
        }
        assert!(matches!(normalize_value(body), Err(AgentFailure::Malformed { .. })));
    }

    #[test]
    fn strips_fences_without_language_tag() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }
}
