use std::sync::Arc;

use coagent_engine::{AgentEngine, EngineEvent, TurnRequest};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::{LogMessage, MessageRole};
use crate::error::CoreError;
use crate::runtime::protocol::{AgentCommand, TurnReport};

/// Run one turn on the engine in the background and report its outcome to
/// the agent actor.
pub(crate) fn spawn_turn(
    engine: Arc<dyn AgentEngine>,
    request: TurnRequest,
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<AgentCommand>,
) {
    tokio::spawn(async move {
        let report = run_turn(engine, request, cancel, &commands).await;
        let _ = commands.send(AgentCommand::Turn(report));
    });
}

#[derive(Default)]
struct TurnProgress {
    text: String,
    awaiting_input: bool,
    error: Option<String>,
    finished: bool,
    cancelled: bool,
}

async fn run_turn(
    engine: Arc<dyn AgentEngine>,
    request: TurnRequest,
    cancel: CancellationToken,
    commands: &mpsc::UnboundedSender<AgentCommand>,
) -> TurnReport {
    let turn_id = request.turn_id.clone();
    tracing::debug!(agent_id = %request.agent_id, %turn_id, "turn started");

    let mut stream = match engine.run_turn(request, cancel.clone()).await {
        Ok(stream) => stream,
        Err(_) if cancel.is_cancelled() => return TurnReport::Cancelled { turn_id },
        Err(error) => {
            return TurnReport::Failed {
                turn_id,
                error: CoreError::from(error).to_string(),
            }
        }
    };

    let mut progress = TurnProgress::default();
    while let Some(event) = stream.next().await {
        match event {
            EngineEvent::Started => {}
            EngineEvent::TextDelta { text } => progress.text.push_str(&text),
            EngineEvent::ToolUse {
                tool_name, input, ..
            } => report_progress(
                commands,
                &turn_id,
                MessageRole::Tool,
                format!("{tool_name} {input}"),
            ),
            EngineEvent::ToolResult {
                output, is_error, ..
            } => {
                let label = if is_error { "tool error" } else { "tool result" };
                report_progress(
                    commands,
                    &turn_id,
                    MessageRole::Tool,
                    format!("{label}: {output}"),
                );
            }
            EngineEvent::InputRequested { prompt } => {
                progress.awaiting_input = true;
                if !prompt.is_empty() {
                    report_progress(commands, &turn_id, MessageRole::System, prompt);
                }
            }
            EngineEvent::Error { message } => progress.error = Some(message),
            EngineEvent::Cancelled => progress.cancelled = true,
            EngineEvent::Finished => progress.finished = true,
        }
    }

    classify(turn_id, progress, cancel.is_cancelled())
}

fn classify(turn_id: String, progress: TurnProgress, token_cancelled: bool) -> TurnReport {
    if progress.finished && progress.error.is_none() {
        return TurnReport::Completed {
            turn_id,
            text: progress.text,
            awaiting_input: progress.awaiting_input,
        };
    }
    if progress.cancelled || token_cancelled {
        return TurnReport::Cancelled { turn_id };
    }
    match progress.error {
        Some(error) => TurnReport::Failed { turn_id, error },
        // Streams that end quietly count as complete.
        None => TurnReport::Completed {
            turn_id,
            text: progress.text,
            awaiting_input: progress.awaiting_input,
        },
    }
}

fn report_progress(
    commands: &mpsc::UnboundedSender<AgentCommand>,
    turn_id: &str,
    role: MessageRole,
    content: String,
) {
    let _ = commands.send(AgentCommand::Turn(TurnReport::Progress {
        turn_id: turn_id.to_string(),
        entry: LogMessage::new(role, content),
    }));
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use coagent_engine::{EngineKind, EngineSettings, ScriptedEngine};
    use tokio::time::timeout;

    use super::*;

    fn request(prompt: &str) -> TurnRequest {
        TurnRequest {
            agent_id: "agent-1".to_string(),
            turn_id: "turn-1".to_string(),
            prompt: prompt.to_string(),
            settings: EngineSettings::default(),
        }
    }

    async fn next_report(rx: &mut mpsc::UnboundedReceiver<AgentCommand>) -> TurnReport {
        loop {
            let command = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("report in time")
                .expect("channel open");
            if let AgentCommand::Turn(report) = command {
                if !matches!(report, TurnReport::Progress { .. }) {
                    return report;
                }
            }
        }
    }

    #[tokio::test]
    async fn completed_turn_reports_accumulated_text() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::new(ScriptedEngine::echo(EngineKind::Claude));

        spawn_turn(engine, request("hi"), CancellationToken::new(), tx);

        assert_eq!(
            next_report(&mut rx).await,
            TurnReport::Completed {
                turn_id: "turn-1".to_string(),
                text: "echo: hi".to_string(),
                awaiting_input: false,
            }
        );
    }

    #[tokio::test]
    async fn engine_error_reports_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::new(ScriptedEngine::echo(EngineKind::Claude).failing_on("boom"));

        spawn_turn(engine, request("boom"), CancellationToken::new(), tx);

        assert!(matches!(
            next_report(&mut rx).await,
            TurnReport::Failed { ref error, .. } if error.contains("boom")
        ));
    }

    #[tokio::test]
    async fn rejected_turn_reports_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::new(ScriptedEngine::echo(EngineKind::Claude));

        spawn_turn(engine, request(" "), CancellationToken::new(), tx);

        assert_eq!(
            next_report(&mut rx).await,
            TurnReport::Failed {
                turn_id: "turn-1".to_string(),
                error: "engine error: invalid input: prompt is empty".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn cancelled_token_reports_cancellation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::new(
            ScriptedEngine::echo(EngineKind::Codex).with_delay(Duration::from_secs(30)),
        );
        let cancel = CancellationToken::new();

        spawn_turn(engine, request("slow"), cancel.clone(), tx);
        cancel.cancel();

        assert_eq!(
            next_report(&mut rx).await,
            TurnReport::Cancelled {
                turn_id: "turn-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn tool_events_are_reported_as_progress() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::new(ScriptedEngine::echo(EngineKind::Codex).with_tool_call("read_file"));

        spawn_turn(engine, request("look"), CancellationToken::new(), tx);

        let command = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("in time")
            .expect("open");
        assert!(matches!(
            command,
            AgentCommand::Turn(TurnReport::Progress { ref entry, .. })
                if entry.role == MessageRole::Tool && entry.content.starts_with("read_file")
        ));
    }

    #[test]
    fn finish_wins_over_late_cancellation() {
        let progress = TurnProgress {
            text: "done".to_string(),
            finished: true,
            ..TurnProgress::default()
        };
        assert!(matches!(
            classify("turn-1".to_string(), progress, true),
            TurnReport::Completed { .. }
        ));
    }

    #[test]
    fn error_after_cancellation_is_not_a_failure() {
        let progress = TurnProgress {
            error: Some("aborted".to_string()),
            ..TurnProgress::default()
        };
        assert!(matches!(
            classify("turn-1".to_string(), progress, true),
            TurnReport::Cancelled { .. }
        ));
    }
}
