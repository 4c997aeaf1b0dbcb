use std::pin::Pin;

use futures_util::Stream;
use serde::Serialize;
use serde_json::Value;

/// Engine-agnostic events produced while a turn runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Started,
    TextDelta {
        text: String,
    },
    ToolUse {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    ToolResult {
        tool_call_id: String,
        output: Value,
        is_error: bool,
    },
    /// The engine ended its turn asking the operator for more input.
    InputRequested {
        prompt: String,
    },
    Error {
        message: String,
    },
    /// The engine observed the cancellation token and stopped early.
    Cancelled,
    Finished,
}

pub type EngineStream = Pin<Box<dyn Stream<Item = EngineEvent> + Send>>;
