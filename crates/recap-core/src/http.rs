use std::time::Duration;
use ureq::Agent;

const TIMEOUT_GLOBAL: Duration = Duration::from_secs(180);
const TIMEOUT_RESOLVE: Duration = Duration::from_secs(5);
const TIMEOUT_CONNECT: Duration = Duration::from_secs(5);
const TIMEOUT_SEND_REQUEST: Duration = Duration::from_secs(5);
const TIMEOUT_SEND_BODY: Duration = Duration::from_secs(15);
const TIMEOUT_RECV_RESPONSE: Duration = Duration::from_secs(120);
const TIMEOUT_RECV_BODY: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("recap/", env!("CARGO_PKG_VERSION"));

/// Shared agent with bounded timeouts. Non-2xx statuses are returned as
/// responses so callers can read the error body.
pub fn default_agent() -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(TIMEOUT_GLOBAL))
        .timeout_resolve(Some(TIMEOUT_RESOLVE))
        .timeout_connect(Some(TIMEOUT_CONNECT))
        .timeout_send_request(Some(TIMEOUT_SEND_REQUEST))
        .timeout_send_body(Some(TIMEOUT_SEND_BODY))
        .timeout_recv_response(Some(TIMEOUT_RECV_RESPONSE))
        .timeout_recv_body(Some(TIMEOUT_RECV_BODY))
        .http_status_as_error(false)
        .user_agent(USER_AGENT)
        .build();
    config.into()
}

/// Extract a human-readable message from an error response body.
///
/// Inference servers usually answer `{"error": "..."}`; anything else is
/// returned trimmed as-is.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| {
            value.get("error").map(|error| match error {
                serde_json::Value::String(message) => message.clone(),
                other => other.to_string(),
            })
        })
        .unwrap_or_else(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::error_message;

    #[test]
    fn error_message_prefers_error_field() {
        let body = r#"{"error": "index out of range in self"}"#;
        assert_eq!(error_message(body), "index out of range in self");
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("  bad gateway \n"), "bad gateway");
    }

    #[test]
    fn error_message_stringifies_structured_errors() {
        let body = r#"{"error": ["first", "second"]}"#;
        assert_eq!(error_message(body), r#"["first","second"]"#);
    }
}
