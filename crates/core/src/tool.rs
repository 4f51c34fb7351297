//! Tool surface invoked by the agent loops.

use anyhow::Result;
use futures_util::future::BoxFuture;
use schemars::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema describing a tool to the model.
///
/// Attached to function-calling requests via
/// [`GenerateOptions`](crate::GenerateOptions).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolSpec {
    /// The name of the tool
    pub name: String,

    /// The description of the tool
    pub description: String,

    /// The parameters of the tool
    pub parameters: Schema,
}

/// An external capability invocable with structured arguments.
pub trait Tool: Send + Sync {
    /// The registered name of the tool.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str {
        ""
    }

    /// Parameter schema attached to function-calling requests.
    fn parameters(&self) -> Schema {
        schemars::json_schema!({"type": "object"})
    }

    /// The schema handed to the model for this tool.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameters(),
        }
    }

    /// Execute with parsed arguments, returning the observation text.
    fn call<'a>(&'a self, args: Value) -> BoxFuture<'a, Result<String>>;
}
