pub mod engine;
pub mod error;
pub mod scripted;
pub mod settings;
pub mod stream;

pub use engine::{AgentEngine, EngineSet, TurnRequest};
pub use error::EngineError;
pub use scripted::ScriptedEngine;
pub use settings::{EngineKind, EngineSettings};
pub use stream::{EngineEvent, EngineStream};
