//! Messages exchanged with a chat model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatMessage {
    /// The content of the message
    pub content: String,

    /// The name of the message (the tool name for function messages)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The role of the message
    pub role: Role,

    /// A function call requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            name: String::new(),
            content: content.into(),
            function_call: None,
        }
    }

    /// Create a new human message
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            name: String::new(),
            content: content.into(),
            function_call: None,
        }
    }

    /// Create a new AI message
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            name: String::new(),
            content: content.into(),
            function_call: None,
        }
    }

    /// Create a new function message carrying a tool's output
    pub fn function(content: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            name: name.into(),
            content: content.into(),
            function_call: None,
        }
    }
}

/// A function call emitted by the model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FunctionCall {
    /// The name of the function to call
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The arguments to pass to the function (JSON string)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
}

/// The role of a message.
///
/// The closed set covers everything the runtime produces; [`Role::Other`]
/// round-trips role strings written by external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// The system role
    System,
    /// The human role
    Human,
    /// The assistant role
    Ai,
    /// The tool-output role
    Function,
    /// Any other named role
    Other(String),
}

impl Role {
    /// The persisted string form of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::Human => "human",
            Role::Ai => "ai",
            Role::Function => "function",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => Role::System,
            "human" => Role::Human,
            "ai" => Role::Ai,
            "function" => Role::Function,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in ["system", "human", "ai", "function", "narrator"] {
            let parsed = Role::from(role.to_owned());
            assert_eq!(parsed.as_str(), role);
        }
        assert_eq!(Role::from("narrator".to_owned()), Role::Other("narrator".into()));
    }

    #[test]
    fn function_message_carries_name() {
        let msg = ChatMessage::function("42", "calculator");
        assert_eq!(msg.role, Role::Function);
        assert_eq!(msg.name, "calculator");
        assert_eq!(msg.content, "42");
    }

    #[test]
    fn role_serializes_as_string() {
        let json = serde_json::to_string(&Role::Ai).unwrap();
        assert_eq!(json, "\"ai\"");
        let back: Role = serde_json::from_str("\"human\"").unwrap();
        assert_eq!(back, Role::Human);
    }
}
