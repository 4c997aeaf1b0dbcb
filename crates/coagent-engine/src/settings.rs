use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The engine families an agent can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Claude,
    Codex,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Claude => "claude",
            EngineKind::Codex => "codex",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(EngineKind::Claude),
            "codex" => Ok(EngineKind::Codex),
            other => Err(EngineError::InvalidInput(format!(
                "unknown engine kind '{other}'"
            ))),
        }
    }
}

/// Per-agent settings forwarded to the engine with every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub working_dir: PathBuf,
    pub model: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            model: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Claude".parse::<EngineKind>().unwrap(), EngineKind::Claude);
        assert_eq!(" codex ".parse::<EngineKind>().unwrap(), EngineKind::Codex);
        assert!("gemini".parse::<EngineKind>().is_err());
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&EngineKind::Codex).unwrap();
        assert_eq!(json, "\"codex\"");
    }
}
