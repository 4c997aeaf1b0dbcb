//! Deterministic engine used by tests and the demo server.
//!
//! Every turn replies `echo: <prompt>`. Delays, failures, tool calls and input
//! requests can be scripted, and the engine records the prompts it received and
//! the peak number of turns it had running at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::engine::{AgentEngine, TurnRequest};
use crate::error::EngineError;
use crate::settings::EngineKind;
use crate::stream::{EngineEvent, EngineStream};

#[derive(Debug, Clone)]
struct Script {
    delay: Duration,
    honor_cancel: bool,
    fail_marker: Option<String>,
    input_marker: Option<String>,
    tool_name: Option<String>,
}

#[derive(Debug, Default)]
struct Recorder {
    prompts: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

struct ActiveTurn {
    recorder: Arc<Recorder>,
}

impl ActiveTurn {
    fn enter(recorder: Arc<Recorder>) -> Self {
        let now = recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
        recorder.peak.fetch_max(now, Ordering::SeqCst);
        Self { recorder }
    }
}

impl Drop for ActiveTurn {
    fn drop(&mut self) {
        self.recorder.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    kind: EngineKind,
    script: Script,
    recorder: Arc<Recorder>,
}

impl ScriptedEngine {
    pub fn echo(kind: EngineKind) -> Self {
        Self {
            kind,
            script: Script {
                delay: Duration::ZERO,
                honor_cancel: true,
                fail_marker: None,
                input_marker: None,
                tool_name: None,
            },
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// Each turn takes `delay` before producing its reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script.delay = delay;
        self
    }

    /// Prompts containing `marker` end with an engine error.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.script.fail_marker = Some(marker.into());
        self
    }

    /// Prompts containing `marker` finish by asking for operator input.
    pub fn asking_on(mut self, marker: impl Into<String>) -> Self {
        self.script.input_marker = Some(marker.into());
        self
    }

    /// Every turn reports one call of `tool_name` before replying.
    pub fn with_tool_call(mut self, tool_name: impl Into<String>) -> Self {
        self.script.tool_name = Some(tool_name.into());
        self
    }

    /// Keep running through the delay even after cancellation.
    pub fn ignoring_cancel(mut self) -> Self {
        self.script.honor_cancel = false;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.recorder.prompts.lock().clone()
    }

    pub fn active_turns(&self) -> usize {
        self.recorder.active.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.recorder.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentEngine for ScriptedEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    async fn run_turn(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> Result<EngineStream, EngineError> {
        if request.prompt.trim().is_empty() {
            return Err(EngineError::InvalidInput("prompt is empty".to_string()));
        }
        self.recorder.prompts.lock().push(request.prompt.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let script = self.script.clone();
        let recorder = self.recorder.clone();
        tokio::spawn(async move {
            let tx = tx;
            let _active = ActiveTurn::enter(recorder);
            script.play(&request, &cancel, &tx).await;
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

impl Script {
    async fn play(
        &self,
        request: &TurnRequest,
        cancel: &CancellationToken,
        tx: &mpsc::UnboundedSender<EngineEvent>,
    ) {
        let _ = tx.send(EngineEvent::Started);

        if self.honor_cancel {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(turn_id = %request.turn_id, "scripted turn cancelled");
                    let _ = tx.send(EngineEvent::Cancelled);
                    return;
                }
                _ = tokio::time::sleep(self.delay) => {}
            }
        } else {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(tool_name) = &self.tool_name {
            let tool_call_id = format!("{}-tool", request.turn_id);
            let _ = tx.send(EngineEvent::ToolUse {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.clone(),
                input: json!({ "prompt": request.prompt }),
            });
            let _ = tx.send(EngineEvent::ToolResult {
                tool_call_id,
                output: json!({ "ok": true }),
                is_error: false,
            });
        }

        if contains_marker(&self.fail_marker, &request.prompt) {
            let _ = tx.send(EngineEvent::Error {
                message: format!("scripted failure for prompt '{}'", request.prompt),
            });
            return;
        }

        let _ = tx.send(EngineEvent::TextDelta {
            text: format!("echo: {}", request.prompt),
        });
        if contains_marker(&self.input_marker, &request.prompt) {
            let _ = tx.send(EngineEvent::InputRequested {
                prompt: "waiting for operator input".to_string(),
            });
        }
        let _ = tx.send(EngineEvent::Finished);
    }
}

fn contains_marker(marker: &Option<String>, prompt: &str) -> bool {
    marker
        .as_deref()
        .is_some_and(|marker| prompt.contains(marker))
}
