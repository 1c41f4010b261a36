//! Agent event types

use charla_ai::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted during agent execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Agent started processing
    AgentStart,

    /// Tool execution started
    ToolExecutionStart {
        tool_name: String,
        arguments: serde_json::Value,
    },

    /// Tool execution completed
    ToolExecutionEnd {
        tool_name: String,
        result: String,
        is_error: bool,
    },

    /// A reasoning turn completed
    TurnEnd { turn: u32, usage: Usage },

    /// Agent finished processing
    AgentEnd { total_turns: u32, total_usage: Usage },

    /// Error occurred
    Error { message: String },
}

impl AgentEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::AgentEnd { .. } | AgentEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(
            AgentEvent::AgentEnd {
                total_turns: 1,
                total_usage: Usage::default()
            }
            .is_terminal()
        );
        assert!(
            AgentEvent::Error {
                message: "boom".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_non_terminal_events() {
        assert!(!AgentEvent::AgentStart.is_terminal());
        assert!(
            !AgentEvent::TurnEnd {
                turn: 1,
                usage: Usage::default()
            }
            .is_terminal()
        );
    }
}
