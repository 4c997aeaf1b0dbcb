//! One actor task per agent, plus the turn executor and queue drain loop it
//! spawns.

mod actor;
mod drain;
mod executor;
pub mod handle;
pub(crate) mod protocol;
pub mod types;

pub use handle::{spawn_agent_runtime, AgentHandle};
pub use types::{DrainOutcome, QueueState, SteerOutcome};
