//! Per-agent state: status rules, steer policy, queue and interrupt handling.

pub mod interrupt;
pub mod lifecycle;
pub mod queue;
pub mod steer;
pub mod types;

pub use interrupt::{InterruptCoordinator, InterruptOutcome};
pub use lifecycle::{next_status, Transition};
pub use queue::{MessageQueue, Priority, QueuedMessage};
pub use steer::{decide, SteerAction};
pub use types::{AgentConfig, AgentInfo, AgentStatus, LogMessage, MessageRole, SteerMode};
