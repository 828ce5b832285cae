//! Integration tests for stream-json message parsing.

use serde_json::json;
use tim_agent_core::formatter::parse_message;

#[test]
fn parses_user_message() {
    let data = json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": "Hello, Claude!"
        }
    });

    assert!(parse_message(data).is_ok());
}

#[test]
fn rejects_unknown_message_type() {
    let data = json!({
        "type": "invalid_type",
        "data": "some data"
    });

    assert!(parse_message(data).is_err());
}
