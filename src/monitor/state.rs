use std::fmt;
use tracing::debug;

/// Lifecycle of a monitoring session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MonitoringState {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

impl MonitoringState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Stopping => "stopping",
        }
    }

    /// Whether a session currently holds (or is acquiring) a producer and connection.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Starting | Self::Active)
    }

    /// `Active` is only reachable from `Starting`; every running state can
    /// reach `Idle`, through `Stopping` or by an aborted start.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Starting)
                | (Self::Starting, Self::Active)
                | (Self::Starting, Self::Idle)
                | (Self::Starting, Self::Stopping)
                | (Self::Active, Self::Stopping)
                | (Self::Stopping, Self::Idle)
        )
    }
}

impl fmt::Display for MonitoringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid monitoring state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: MonitoringState,
    pub to: MonitoringState,
}

/// Current state plus the transition table.
#[derive(Debug, Default)]
pub struct StateMachine {
    current: MonitoringState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> MonitoringState {
        self.current
    }

    pub fn transition(&mut self, next: MonitoringState) -> Result<(), InvalidTransition> {
        if !self.current.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.current,
                to: next,
            });
        }
        debug!("Monitoring state: {} -> {}", self.current, next);
        self.current = next;
        Ok(())
    }
}
