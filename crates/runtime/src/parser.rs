//! Tolerant parsing of model output into agent actions.

use ncore::Action;
use serde_json::Value;

/// Parse raw model text into an [`Action`].
///
/// Tolerates prose around the JSON payload by scanning the window from
/// the first `{` to the last `}`. Anything that fails to parse becomes
/// [`Action::Error`] carrying the raw text, so the loop can feed the
/// failure back for self-correction instead of crashing the turn.
pub fn parse_action(text: &str) -> Action {
    let Some(payload) = extract_json(text) else {
        return Action::Error {
            detail: text.to_owned(),
        };
    };

    let Some(tool) = payload.get("tool").and_then(Value::as_str) else {
        return Action::Error {
            detail: text.to_owned(),
        };
    };

    if tool == "chat" {
        // Accept both `{"args": {"response": ...}}` and a top-level
        // `{"response": ...}` — models produce both shapes.
        let response = payload
            .get("args")
            .and_then(|args| args.get("response"))
            .or_else(|| payload.get("response"))
            .and_then(Value::as_str);
        return match response {
            Some(response) => Action::Chat {
                response: response.to_owned(),
            },
            None => Action::Error {
                detail: text.to_owned(),
            },
        };
    }

    // Unknown tool names pass through; the loop classifies them.
    Action::Tool {
        name: tool.to_owned(),
        args: payload.get("args").cloned().unwrap_or(Value::Null),
    }
}

fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::parse_action;
    use ncore::Action;
    use serde_json::json;

    #[test]
    fn plain_chat_action() {
        let action = parse_action(r#"{"tool": "chat", "args": {"response": "ok"}}"#);
        assert_eq!(
            action,
            Action::Chat {
                response: "ok".into()
            }
        );
    }

    #[test]
    fn chat_with_top_level_response() {
        let action = parse_action(r#"{"tool": "chat", "response": "hello"}"#);
        assert_eq!(
            action,
            Action::Chat {
                response: "hello".into()
            }
        );
    }

    #[test]
    fn tolerates_surrounding_prose() {
        let text = "Sure! Here is my action:\n```json\n{\"tool\": \"search\", \"args\": {\"keyword\": \"rust\"}}\n```\nDone.";
        let action = parse_action(text);
        assert_eq!(
            action,
            Action::Tool {
                name: "search".into(),
                args: json!({"keyword": "rust"}),
            }
        );
    }

    #[test]
    fn missing_json_is_an_error_action() {
        let action = parse_action("I could not decide on a tool.");
        assert!(matches!(action, Action::Error { detail } if detail.contains("could not decide")));
    }

    #[test]
    fn malformed_json_is_an_error_action() {
        let action = parse_action(r#"{"tool": "search", "args": {"#);
        assert!(matches!(action, Action::Error { .. }));
    }

    #[test]
    fn missing_tool_field_is_an_error_action() {
        let action = parse_action(r#"{"action": "search"}"#);
        assert!(matches!(action, Action::Error { .. }));
    }

    #[test]
    fn unknown_tool_passes_through() {
        let action = parse_action(r#"{"tool": "teleport", "args": {"to": "mars"}}"#);
        assert_eq!(
            action,
            Action::Tool {
                name: "teleport".into(),
                args: json!({"to": "mars"}),
            }
        );
    }

    #[test]
    fn chat_without_response_is_an_error_action() {
        let action = parse_action(r#"{"tool": "chat", "args": {}}"#);
        assert!(matches!(action, Action::Error { .. }));
    }
}
