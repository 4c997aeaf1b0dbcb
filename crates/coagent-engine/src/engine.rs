use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::settings::{EngineKind, EngineSettings};
use crate::stream::EngineStream;

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub agent_id: String,
    pub turn_id: String,
    pub prompt: String,
    pub settings: EngineSettings,
}

/// External engine that executes a single turn.
///
/// Cancellation is cooperative: implementations should watch `cancel` and end
/// the stream (ideally with [`crate::EngineEvent::Cancelled`]) once it fires.
/// Callers pass a fresh token for every turn.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    async fn run_turn(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> Result<EngineStream, EngineError>;
}

/// Engines available to the runtime, keyed by the kind they serve.
#[derive(Clone, Default)]
pub struct EngineSet {
    engines: HashMap<EngineKind, Arc<dyn AgentEngine>>,
}

impl EngineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, engine: Arc<dyn AgentEngine>) -> Self {
        self.register(engine);
        self
    }

    pub fn register(&mut self, engine: Arc<dyn AgentEngine>) {
        self.engines.insert(engine.kind(), engine);
    }

    pub fn get(&self, kind: EngineKind) -> Option<Arc<dyn AgentEngine>> {
        self.engines.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<EngineKind> {
        self.engines.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedEngine;

    #[test]
    fn engine_set_resolves_by_kind() {
        let set = EngineSet::new().with(Arc::new(ScriptedEngine::echo(EngineKind::Codex)));
        assert!(set.get(EngineKind::Codex).is_some());
        assert!(set.get(EngineKind::Claude).is_none());
        assert_eq!(set.kinds(), vec![EngineKind::Codex]);
    }

    #[test]
    fn registering_same_kind_replaces_engine() {
        let mut set = EngineSet::new();
        set.register(Arc::new(ScriptedEngine::echo(EngineKind::Claude)));
        set.register(Arc::new(ScriptedEngine::echo(EngineKind::Claude)));
        assert_eq!(set.kinds().len(), 1);
    }
}
