use tokio_util::sync::CancellationToken;

use super::types::AgentStatus;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// The running turn's token was cancelled by this request.
    Requested,
    /// An interrupt was already outstanding; nothing was signalled.
    AlreadyRequested,
}

/// Owns the cancellation token handed to each turn and the
/// `interrupt_requested` flag.
///
/// The flag is raised only while a turn runs and is cleared by [`settle`]
/// when that turn terminates.
///
/// [`settle`]: InterruptCoordinator::settle
#[derive(Debug, Default)]
pub struct InterruptCoordinator {
    token: CancellationToken,
    requested: bool,
}

impl InterruptCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the next turn. Never pre-cancelled by an earlier interrupt.
    pub fn turn_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    pub fn request(&mut self, status: AgentStatus) -> CoreResult<InterruptOutcome> {
        if !status.is_running() {
            return Err(CoreError::NotRunning);
        }
        if self.requested {
            return Ok(InterruptOutcome::AlreadyRequested);
        }
        self.requested = true;
        self.rotate().cancel();
        Ok(InterruptOutcome::Requested)
    }

    /// Called on the transition that ends a turn. Returns whether an
    /// interrupt had been outstanding.
    pub fn settle(&mut self) -> bool {
        std::mem::take(&mut self.requested)
    }

    /// Cancel whatever holds the current token without raising the flag.
    pub fn cancel_current(&mut self) {
        self.rotate().cancel();
    }

    fn rotate(&mut self) -> CancellationToken {
        std::mem::replace(&mut self.token, CancellationToken::new())
    }
}
