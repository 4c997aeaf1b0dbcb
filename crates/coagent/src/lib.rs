//! Agent lifecycle runtime: per-agent actors with a steering policy, a
//! priority message queue and a drain loop, served over WebSocket.

pub mod agent;
pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod registry;
pub mod runtime;
pub mod server;

pub use crate::bus::Bus;
pub use crate::config::RuntimeConfig;
pub use crate::error::{CoreError, CoreResult};
pub use crate::event::AgentEvent;
pub use crate::registry::AgentRegistry;
pub use crate::server::Server;
